//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `yolink-bridge.toml` in the working directory. Every field
//! except the API credentials has a default, so the file is optional when
//! the credentials come from the environment. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;
use yolink_bridge_adapter_http_reqwest::HttpConfig;
use yolink_bridge_adapter_mqtt::MqttConfig;
use yolink_bridge_app::retry::RetryPolicy;
use yolink_bridge_domain::token::ClientCredentials;

use crate::bridge::ReconnectPolicy;

const CONFIG_FILE: &str = "yolink-bridge.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Control-API account and retry settings.
    pub api: ApiConfig,
    /// HTTP transport settings.
    pub http: HttpConfig,
    /// Broker session settings.
    pub mqtt: MqttConfig,
    /// Bridge loop settings.
    pub bridge: BridgeConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Control-API account configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// UAC client id.
    pub client_id: String,
    /// UAC client secret.
    pub client_secret: String,
    /// Retries after the first attempt of a failed call.
    pub retries: u32,
    /// Wait before each retry, in seconds.
    pub retry_delay_secs: u64,
}

/// Bridge loop configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Label attached to the broker connection's log events.
    pub label: String,
    /// Pause between two polls of a live connection, in milliseconds.
    pub poll_interval_ms: u64,
    /// First reconnect delay, in seconds.
    pub reconnect_initial_secs: u64,
    /// Upper bound on the reconnect delay, in seconds.
    pub reconnect_max_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `yolink-bridge.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(CONFIG_FILE)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("YOLINK_CLIENT_ID") {
            self.api.client_id = val;
        }
        if let Some(val) = var("YOLINK_CLIENT_SECRET") {
            self.api.client_secret = val;
        }
        if let Some(retries) = var("YOLINK_RETRIES").and_then(|val| val.parse().ok()) {
            self.api.retries = retries;
        }
        if let Some(val) = var("YOLINK_BASE_URL") {
            self.http.base_url = val;
        }
        if let Some(val) = var("YOLINK_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Some(port) = var("YOLINK_MQTT_PORT").and_then(|val| val.parse().ok()) {
            self.mqtt.broker_port = port;
        }
        if let Some(val) = var("YOLINK_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api.client_id.is_empty() || self.api.client_secret.is_empty() {
            return Err(ConfigError::Validation(
                "api.client_id and api.client_secret are required".to_string(),
            ));
        }
        if self.http.base_url.is_empty() {
            return Err(ConfigError::Validation(
                "http.base_url must not be empty".to_string(),
            ));
        }
        if self.mqtt.client_id.is_empty() {
            return Err(ConfigError::Validation(
                "mqtt.client_id must not be empty".to_string(),
            ));
        }
        if self.mqtt.broker_port == 0 {
            return Err(ConfigError::Validation(
                "mqtt.broker_port must be non-zero".to_string(),
            ));
        }
        if self.bridge.reconnect_initial_secs > self.bridge.reconnect_max_secs {
            return Err(ConfigError::Validation(
                "bridge.reconnect_initial_secs exceeds bridge.reconnect_max_secs".to_string(),
            ));
        }
        Ok(())
    }
}

impl ApiConfig {
    #[must_use]
    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials::new(self.client_id.clone(), self.client_secret.clone())
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, Duration::from_secs(self.retry_delay_secs))
    }
}

impl BridgeConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            Duration::from_secs(self.reconnect_initial_secs),
            Duration::from_secs(self.reconnect_max_secs),
        )
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            retries: policy.retries,
            retry_delay_secs: policy.delay.as_secs(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            label: "yolink".to_string(),
            poll_interval_ms: 100,
            reconnect_initial_secs: 1,
            reconnect_max_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,rumqttc=warn,reqwest=warn".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
