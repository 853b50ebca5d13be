//! Resilient request client: authenticated control-API calls with error
//! classification and bounded retry.
//!
//! Every call runs the same loop:
//!
//! 1. attach the current bearer token (except on the token endpoint),
//! 2. send; no response at all aborts the call as fatal,
//! 3. decode and classify `code`,
//! 4. on a failure with budget left: force a token refresh, wait, retry,
//! 5. on a failure without budget: report [`ApiError::Server`],
//! 6. on success: require `desc == "Success"` and a non-empty body, without
//!    retrying if either check fails.
//!
//! Every non-success code is retried the same way, including codes that
//! look permanent (`020201`, `010101`): an expired token can masquerade as
//! several of them.

use serde_json::Value;
use yolink_bridge_domain::envelope::{
    API_ENDPOINT, RequestEnvelope, ResponseEnvelope, TOKEN_ENDPOINT,
};
use yolink_bridge_domain::error::ApiError;
use yolink_bridge_domain::token::{AccessToken, ClientCredentials};

use crate::ports::HttpTransport;
use crate::retry::{RetryPolicy, RetryState};
use crate::services::token_authority::TokenAuthority;

/// Sends requests through the retry state machine.
///
/// Shared by [`ResilientRequestClient`] and [`TokenAuthority`]; the token
/// handling is supplied by the caller as two hooks.
pub(crate) struct Dispatcher<T> {
    transport: T,
    base_url: String,
    policy: RetryPolicy,
}

impl<T: HttpTransport> Dispatcher<T> {
    pub(crate) fn new(transport: T, base_url: String, policy: RetryPolicy) -> Self {
        Self {
            transport,
            base_url,
            policy,
        }
    }

    pub(crate) fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Run one call to completion.
    ///
    /// `authorize` yields the bearer to attach before each send.
    /// `before_retry` runs once before every retried send.
    pub(crate) fn send<A, R>(
        &self,
        endpoint: &str,
        body: &Value,
        mut authorize: A,
        mut before_retry: R,
    ) -> Result<ResponseEnvelope, ApiError>
    where
        A: FnMut() -> Result<Option<AccessToken>, ApiError>,
        R: FnMut() -> Result<(), ApiError>,
    {
        let url = self.url(endpoint);
        let mut state = self.policy.start();

        loop {
            state = match state {
                RetryState::Attempting { .. } => {
                    let attempt = self.policy.attempts_made(&state);
                    let bearer = authorize()?;
                    tracing::debug!(endpoint, attempt, "sending request");

                    let raw = self
                        .transport
                        .post_json(&url, bearer.as_ref(), body)
                        .map_err(|source| {
                            tracing::error!(endpoint, attempt, error = %source, "no response from server");
                            ApiError::Transport {
                                endpoint: endpoint.to_string(),
                                source,
                            }
                        })?;

                    let envelope = ResponseEnvelope::decode(&raw)
                        .map_err(|source| protocol_error(endpoint, source))?;
                    let code = envelope.error_code();

                    if code.is_success() {
                        envelope
                            .validate()
                            .map_err(|source| protocol_error(endpoint, source))?;
                        return Ok(envelope);
                    }

                    tracing::warn!(endpoint, attempt, %code, "request failed");
                    state.on_failure(code)
                }
                RetryState::Retry { remaining, ref code } => {
                    tracing::info!(endpoint, remaining, %code, "retrying request");
                    before_retry()?;
                    if !self.policy.delay.is_zero() {
                        std::thread::sleep(self.policy.delay);
                    }
                    state.resume()
                }
                RetryState::Exhausted { code } => {
                    let attempts = self.policy.max_attempts();
                    tracing::error!(endpoint, attempts, %code, "unable to retrieve data");
                    return Err(ApiError::Server {
                        endpoint: endpoint.to_string(),
                        code,
                        attempts,
                    });
                }
            };
        }
    }
}

fn protocol_error(
    endpoint: &str,
    source: yolink_bridge_domain::error::ProtocolError,
) -> ApiError {
    tracing::error!(endpoint, error = %source, "request unsuccessful");
    ApiError::Protocol {
        endpoint: endpoint.to_string(),
        source,
    }
}

/// Executes authenticated calls against the control API.
pub struct ResilientRequestClient<T> {
    dispatcher: Dispatcher<T>,
    tokens: TokenAuthority<T>,
}

impl<T: HttpTransport + Clone> ResilientRequestClient<T> {
    /// Create a client for the API rooted at `base_url`
    /// (e.g. `https://api.yosmart.com/open/yolink`).
    pub fn new(
        transport: T,
        base_url: impl Into<String>,
        credentials: ClientCredentials,
        policy: RetryPolicy,
    ) -> Self {
        let base_url = base_url.into();
        let tokens = TokenAuthority::new(transport.clone(), base_url.clone(), credentials, policy);
        Self {
            dispatcher: Dispatcher::new(transport, base_url, policy),
            tokens,
        }
    }
}

impl<T: HttpTransport> ResilientRequestClient<T> {
    /// The token authority this client authenticates with.
    pub fn tokens(&self) -> &TokenAuthority<T> {
        &self.tokens
    }

    /// Send `payload` to `endpoint` with retry and classification.
    ///
    /// On the token endpoint no bearer is attached and retries do not
    /// force a refresh. Elsewhere each retry forces exactly one refresh
    /// before the retried send; a refresh that fails with a non-fatal error
    /// is logged and the retry goes ahead with the previous token.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Transport`] when no response was obtained (fatal),
    /// - [`ApiError::Server`] once the retry budget is exhausted,
    /// - [`ApiError::Protocol`] when a success-coded response is unusable.
    #[tracing::instrument(skip(self, payload))]
    pub fn execute(&self, endpoint: &str, payload: &Value) -> Result<ResponseEnvelope, ApiError> {
        if endpoint.trim_start_matches('/') == TOKEN_ENDPOINT {
            return self.dispatcher.send(endpoint, payload, || Ok(None), || Ok(()));
        }

        self.dispatcher.send(
            endpoint,
            payload,
            || self.tokens.get_token(false).map(Some),
            || match self.tokens.get_token(true) {
                Ok(_) => Ok(()),
                Err(err) if err.is_fatal() => Err(err),
                Err(err) => {
                    tracing::warn!(error = %err, "token refresh failed, retrying with previous token");
                    Ok(())
                }
            },
        )
    }

    /// Send a method call to the general API endpoint.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn call(&self, request: &RequestEnvelope) -> Result<ResponseEnvelope, ApiError> {
        tracing::debug!(method = request.method(), "calling API method");
        self.execute(API_ENDPOINT, &request.to_json())
    }
}
