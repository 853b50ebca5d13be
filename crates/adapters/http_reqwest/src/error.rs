//! HTTP adapter error types.

use yolink_bridge_domain::error::TransportError;

/// Errors specific to the reqwest adapter.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The reqwest client could not be built.
    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),

    /// Sending the request failed before any response arrived.
    #[error("HTTP request failed")]
    Request(#[source] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),

    /// The response body could not be read.
    #[error("failed to read HTTP response body")]
    Body(#[source] reqwest::Error),
}

impl HttpError {
    /// Convert into a [`TransportError`] for propagation across the port
    /// boundary.
    #[must_use]
    pub fn into_transport(self) -> TransportError {
        match self {
            Self::Request(err) | Self::Body(err) if err.is_timeout() => TransportError::Timeout,
            Self::Status(status) => TransportError::Status(status.as_u16()),
            other => TransportError::Unreachable(Box::new(other)),
        }
    }
}

impl From<HttpError> for TransportError {
    fn from(err: HttpError) -> Self {
        err.into_transport()
    }
}
