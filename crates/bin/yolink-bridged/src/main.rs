//! # yolink-bridged: YoLink bridge daemon
//!
//! Composition root that wires the adapters together and runs the bridge.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Construct the HTTP and MQTT transports (adapters)
//! - Construct the application services, injecting transports via port traits
//! - Run the reconnecting bridge loop until a fatal error
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod bridge;
mod config;

use tracing_subscriber::EnvFilter;
use yolink_bridge_adapter_http_reqwest::ReqwestTransport;
use yolink_bridge_adapter_mqtt::RumqttcTransport;
use yolink_bridge_app::services::home_service::HomeService;
use yolink_bridge_app::services::pubsub_connection::PubSubConnection;
use yolink_bridge_app::services::request_client::ResilientRequestClient;

use crate::bridge::Bridge;
use crate::config::Config;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // HTTP
    let http = ReqwestTransport::new(&config.http)?;
    let client = ResilientRequestClient::new(
        http,
        config.http.base_url.clone(),
        config.api.credentials(),
        config.api.retry_policy(),
    );

    // Broker
    let connection = PubSubConnection::new(
        config.bridge.label.clone(),
        RumqttcTransport::new(config.mqtt.clone()),
    );

    tracing::info!(
        base_url = %config.http.base_url,
        broker = %config.mqtt.broker_host,
        "yolink-bridged starting"
    );

    let mut bridge = Bridge::new(
        HomeService::new(client),
        connection,
        config.bridge.reconnect_policy(),
        config.bridge.poll_interval(),
    );
    if let Err(err) = bridge.run() {
        tracing::error!(error = %err, "bridge halted");
        return Err(err.into());
    }
    Ok(())
}
