//! MQTT broker configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the broker session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// How long to wait for the broker to acknowledge a connect or a
    /// subscribe, in seconds.
    pub ack_timeout_secs: u16,
    /// How long one pump waits for network activity, in milliseconds.
    pub poll_timeout_ms: u64,
    /// Capacity of the outgoing request channel.
    pub channel_capacity: usize,
    /// Upper bound on events processed by a single pump.
    pub max_events_per_poll: usize,
}

impl MqttConfig {
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(u64::from(self.keep_alive_secs))
    }

    #[must_use]
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.ack_timeout_secs))
    }

    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "api.yosmart.com".to_string(),
            broker_port: 8003,
            client_id: "yolink-bridge".to_string(),
            keep_alive_secs: 30,
            ack_timeout_secs: 10,
            poll_timeout_ms: 100,
            channel_capacity: 16,
            max_events_per_poll: 64,
        }
    }
}
