//! Request and response envelopes of the control API.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::code::ErrorCode;
use crate::error::ProtocolError;
use crate::time::{self, UnixSeconds};
use crate::token::AccessToken;

/// Endpoint that exchanges client credentials for an [`AccessToken`].
pub const TOKEN_ENDPOINT: &str = "token";

/// Endpoint that serves every method-based API call.
pub const API_ENDPOINT: &str = "v2/api";

/// The only `desc` value accepted on a successful response.
pub const SUCCESS_DESCRIPTION: &str = "Success";

/// A method call against the control API.
///
/// The timestamp is stamped at construction, so an envelope always carries
/// one. Optional parts are attached with the builder-style setters before
/// the envelope is sent; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Map<String, Value>>,
    time: UnixSeconds,
}

impl RequestEnvelope {
    /// Create an envelope for `method`, stamped with the current time.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self::at(method, time::unix_now())
    }

    /// Create an envelope for `method` with an explicit timestamp.
    #[must_use]
    pub fn at(method: impl Into<String>, time: UnixSeconds) -> Self {
        Self {
            method: method.into(),
            target_device: None,
            token: None,
            params: None,
            time,
        }
    }

    /// Address the call to a single device.
    #[must_use]
    pub fn target_device(mut self, device_id: impl Into<String>) -> Self {
        self.target_device = Some(device_id.into());
        self
    }

    /// Attach the per-device token the cloud requires for device methods.
    #[must_use]
    pub fn device_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Attach method parameters.
    #[must_use]
    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn time(&self) -> UnixSeconds {
        self.time
    }

    /// Serialize into the JSON body sent over the wire.
    #[must_use]
    pub fn to_json(&self) -> Value {
        // A struct of strings, maps and integers always serializes.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// The decoded body of any control-API response.
///
/// `code`, `desc` and `data` are the documented fields; anything else the
/// server adds (the token endpoint answers with `access_token`, …) lands in
/// `extra`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default, deserialize_with = "lenient_code")]
    pub code: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResponseEnvelope {
    /// Decode a raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Decode`] when the body is not a JSON object.
    pub fn decode(body: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(body).map_err(ProtocolError::Decode)
    }

    /// Classify the `code` field.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::from_response(self.code.as_deref())
    }

    /// Whether the body decoded to an empty object.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.desc.is_none() && self.data.is_none() && self.extra.is_empty()
    }

    /// Structural checks applied once the code reports success.
    ///
    /// A present `desc` must be exactly [`SUCCESS_DESCRIPTION`]; an absent
    /// one is accepted because the token endpoint never sends it. The body
    /// must not be empty.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnexpectedDescription`] or
    /// [`ProtocolError::EmptyPayload`].
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if let Some(desc) = self.desc.as_deref().filter(|d| *d != SUCCESS_DESCRIPTION) {
            return Err(ProtocolError::UnexpectedDescription(desc.to_string()));
        }
        if self.is_empty() {
            return Err(ProtocolError::EmptyPayload);
        }
        Ok(())
    }

    /// The `data` payload, required.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MissingField`] when `data` is absent.
    pub fn require_data(&self) -> Result<&Value, ProtocolError> {
        self.data.as_ref().ok_or(ProtocolError::MissingField("data"))
    }

    /// Extract the bearer token of a token-exchange response.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MissingField`] when `access_token` is absent
    /// or not a string.
    pub fn access_token(&self) -> Result<AccessToken, ProtocolError> {
        self.extra
            .get("access_token")
            .and_then(Value::as_str)
            .map(AccessToken::new)
            .ok_or(ProtocolError::MissingField("access_token"))
    }
}

/// Accept any JSON scalar as `code`. Anything that is not one of the known
/// strings classifies as an unknown failure.
fn lenient_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(code) => Some(code),
        other => Some(other.to_string()),
    })
}
