//! HTTP transport port: one JSON request in, one raw body out.

use std::sync::Arc;

use serde_json::Value;
use yolink_bridge_domain::error::TransportError;
use yolink_bridge_domain::token::AccessToken;

/// Sends a single JSON request to the control API.
///
/// Implementations attach `Authorization: Bearer <token>` when `bearer` is
/// `Some`, and send `Content-Type`/`Accept: application/json`. They never
/// retry and never interpret the body: classification is the caller's job.
pub trait HttpTransport {
    /// POST `body` to `url` and return the response body.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no usable response was obtained
    /// (connection failure, timeout, or non-success HTTP status).
    fn post_json(
        &self,
        url: &str,
        bearer: Option<&AccessToken>,
        body: &Value,
    ) -> Result<String, TransportError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    fn post_json(
        &self,
        url: &str,
        bearer: Option<&AccessToken>,
        body: &Value,
    ) -> Result<String, TransportError> {
        (**self).post_json(url, bearer, body)
    }
}

impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    fn post_json(
        &self,
        url: &str,
        bearer: Option<&AccessToken>,
        body: &Value,
    ) -> Result<String, TransportError> {
        (**self).post_json(url, bearer, body)
    }
}
