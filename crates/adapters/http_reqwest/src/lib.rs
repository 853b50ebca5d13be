//! # yolink-bridge-adapter-http-reqwest
//!
//! HTTP adapter: implements the `HttpTransport` port over
//! `reqwest::blocking`.
//!
//! The transport sends exactly one request per call and never looks inside
//! the body; retry and classification live in the app layer. Any failure to
//! obtain a 2xx response surfaces as a `TransportError`.
//!
//! ## Dependency rule
//! Same as other adapters: depends on `yolink-bridge-app` and
//! `yolink-bridge-domain`.

mod config;
mod error;

pub use config::{DEFAULT_BASE_URL, HttpConfig};
pub use error::HttpError;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderValue};
use serde_json::Value;

use yolink_bridge_app::ports::HttpTransport;
use yolink_bridge_domain::error::TransportError;
use yolink_bridge_domain::token::AccessToken;

const APPLICATION_JSON: &str = "application/json";

/// Blocking HTTP transport backed by a shared reqwest client.
///
/// Cloning is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport from `config`.
    ///
    /// Must not be called from inside an async runtime: the blocking client
    /// owns one of its own.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Build`] if the TLS backend cannot be initialised.
    pub fn new(config: &HttpConfig) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(HttpError::Build)?;
        Ok(Self { client })
    }

    fn send(
        &self,
        url: &str,
        bearer: Option<&AccessToken>,
        body: &Value,
    ) -> Result<String, HttpError> {
        let mut request = self
            .client
            .post(url)
            .header(ACCEPT, HeaderValue::from_static(APPLICATION_JSON))
            .json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token.as_str());
        }

        let response = request.send().map_err(HttpError::Request)?;
        let status = response.status();
        tracing::debug!(url, %status, "received HTTP response");
        if !status.is_success() {
            return Err(HttpError::Status(status));
        }
        response.text().map_err(HttpError::Body)
    }
}

impl HttpTransport for ReqwestTransport {
    fn post_json(
        &self,
        url: &str,
        bearer: Option<&AccessToken>,
        body: &Value,
    ) -> Result<String, TransportError> {
        tracing::debug!(url, authenticated = bearer.is_some(), "sending HTTP request");
        self.send(url, bearer, body).map_err(|err| {
            tracing::error!(url, error = %err, "unable to access endpoint");
            err.into_transport()
        })
    }
}
