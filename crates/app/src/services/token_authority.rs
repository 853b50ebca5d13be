//! Token authority: owns the bearer credential and refreshes it on demand.

use std::sync::{Mutex, PoisonError};

use yolink_bridge_domain::envelope::TOKEN_ENDPOINT;
use yolink_bridge_domain::error::ApiError;
use yolink_bridge_domain::token::{AccessToken, ClientCredentials};

use crate::ports::HttpTransport;
use crate::retry::RetryPolicy;
use crate::services::request_client::Dispatcher;

/// Caches one [`AccessToken`] and exchanges client credentials for a new
/// one when asked to.
///
/// Refreshes are serialized: the cache lock is held across the exchange, so
/// concurrent callers never race into duplicate exchanges for a missing
/// token. A caller that waited on the lock sees the token its predecessor
/// fetched.
pub struct TokenAuthority<T> {
    dispatcher: Dispatcher<T>,
    credentials: ClientCredentials,
    cached: Mutex<Option<AccessToken>>,
}

impl<T: HttpTransport> TokenAuthority<T> {
    /// Create an authority exchanging `credentials` against the API rooted
    /// at `base_url`.
    pub fn new(
        transport: T,
        base_url: impl Into<String>,
        credentials: ClientCredentials,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(transport, base_url.into(), policy),
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// Return the cached token, or exchange for a new one when `force` is
    /// set or nothing is cached.
    ///
    /// A failed exchange leaves the previously cached token in place.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] of the exchange request, or
    /// [`ApiError::Protocol`] when the response carries no `access_token`.
    pub fn get_token(&self, force: bool) -> Result<AccessToken, ApiError> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(token) = cached.as_ref().filter(|_| !force) {
            return Ok(token.clone());
        }

        let token = self.exchange()?;
        tracing::debug!(forced = force, "access token refreshed");
        *cached = Some(token.clone());
        Ok(token)
    }

    /// The currently cached token, without triggering an exchange.
    pub fn cached(&self) -> Option<AccessToken> {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn exchange(&self) -> Result<AccessToken, ApiError> {
        let body = serde_json::to_value(self.credentials.exchange_request())
            .unwrap_or(serde_json::Value::Null);
        let envelope = self
            .dispatcher
            .send(TOKEN_ENDPOINT, &body, || Ok(None), || Ok(()))?;
        envelope
            .access_token()
            .map_err(|source| ApiError::Protocol {
                endpoint: TOKEN_ENDPOINT.to_string(),
                source,
            })
    }
}
