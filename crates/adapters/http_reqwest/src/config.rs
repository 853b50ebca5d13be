//! HTTP transport configuration.

use std::time::Duration;

use serde::Deserialize;

/// Default root of the YoLink control API.
pub const DEFAULT_BASE_URL: &str = "https://api.yosmart.com/open/yolink";

/// Configuration for the reqwest-based HTTP transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Root URL every endpoint is appended to.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,
}

impl HttpConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            user_agent: concat!("yolink-bridge/", env!("CARGO_PKG_VERSION")).to_string(),
            accept_invalid_certs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.base_url, "https://api.yosmart.com/open/yolink");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.user_agent.starts_with("yolink-bridge/"));
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            base_url = "https://api.example.com/open/yolink"
            timeout_secs = 5
            user_agent = "test-agent"
            accept_invalid_certs = true
        "#;
        let config: HttpConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.base_url, "https://api.example.com/open/yolink");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.user_agent, "test-agent");
        assert!(config.accept_invalid_certs);
    }

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let config: HttpConfig = toml::from_str("timeout_secs = 3").unwrap();
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }
}
