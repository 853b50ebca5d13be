//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into these at the
//! port boundaries. The taxonomy separates four failure classes:
//!
//! | Class | Type | Handling |
//! |-------|------|----------|
//! | no HTTP response | [`ApiError::Transport`] | fatal, escalated to the host |
//! | classified server code | [`ApiError::Server`] | retried, then reported |
//! | malformed success | [`ApiError::Protocol`] | reported, never retried |
//! | pub/sub fault | [`ConnectionFault`] | folded into connectivity state |

use crate::code::ErrorCode;

/// Boxed error used as the typed source of transport-level failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a control-API call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response was obtained from the HTTP layer.
    #[error("no response from endpoint {endpoint}")]
    Transport {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    /// The server kept answering with a non-success code until the retry
    /// budget ran out.
    #[error("endpoint {endpoint} failed after {attempts} attempt(s): {code}")]
    Server {
        endpoint: String,
        code: ErrorCode,
        attempts: u32,
    },

    /// The server reported success but the response is unusable.
    #[error("unexpected response from endpoint {endpoint}")]
    Protocol {
        endpoint: String,
        #[source]
        source: ProtocolError,
    },
}

impl ApiError {
    /// Whether the call chain must abort; the host decides whether to halt.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// The server code behind a [`Server`](Self::Server) failure.
    #[must_use]
    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            Self::Server { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Why the HTTP layer produced no usable response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent or the connection dropped.
    #[error("server unreachable")]
    Unreachable(#[source] BoxError),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success HTTP status.
    #[error("HTTP status {0}")]
    Status(u16),
}

/// Why a success-coded response was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The body is not a JSON object.
    #[error("response body is not a JSON object")]
    Decode(#[source] serde_json::Error),

    /// `desc` was present but not the `Success` literal.
    #[error("unexpected status description {0:?}")]
    UnexpectedDescription(String),

    /// The body decoded to an empty object.
    #[error("response carries no data")]
    EmptyPayload,

    /// A field the caller depends on is absent or has the wrong shape.
    #[error("response is missing field {0:?}")]
    MissingField(&'static str),
}

/// A fault on the publish/subscribe transport.
///
/// Faults never escape as panics or fatal errors: the connection manager
/// folds every one of them into its connectivity state.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionFault {
    /// An operation that needs an open session was attempted without one.
    #[error("transport is not connected")]
    NotConnected,

    /// Reading from the socket failed.
    #[error("transport read fault")]
    Read(#[source] BoxError),

    /// Writing to the socket failed.
    #[error("transport write fault")]
    Write(#[source] BoxError),

    /// Any other network-level failure (connect, timeout, closed channel).
    #[error("transport fault")]
    Transport(#[source] BoxError),

    /// The broker answered, but not the way the protocol requires.
    #[error("protocol fault")]
    Protocol(#[source] BoxError),
}

impl ConnectionFault {
    /// Whether this fault came from the network rather than the protocol.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Read(_) | Self::Write(_) | Self::Transport(_))
    }
}
