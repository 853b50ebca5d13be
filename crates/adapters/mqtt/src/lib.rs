//! # yolink-bridge-adapter-mqtt
//!
//! MQTT adapter: implements the `PubSubTransport` port over the blocking
//! `rumqttc` client.
//!
//! The rumqttc event loop reconnects by itself when polled after a failure.
//! This adapter drops the whole session on the first error instead, so a
//! broken session stays down until the connection manager asks for a new
//! one.
//!
//! ## Dependency rule
//! Same as other adapters: depends on `yolink-bridge-app` and
//! `yolink-bridge-domain`.

mod config;
mod error;

pub use config::MqttConfig;
pub use error::MqttError;

use std::time::{Duration, Instant};

use rumqttc::{
    Client, ConnectReturnCode, Connection, Event, MqttOptions, Packet, QoS, RecvTimeoutError,
    SubscribeReasonCode,
};

use yolink_bridge_app::ports::PubSubTransport;
use yolink_bridge_domain::connection::{DeliveryClass, Message};
use yolink_bridge_domain::error::ConnectionFault;

struct Session {
    client: Client,
    connection: Connection,
    connected: bool,
}

/// Broker session backed by `rumqttc::Client`.
pub struct RumqttcTransport {
    config: MqttConfig,
    credentials: Option<(String, String)>,
    session: Option<Session>,
    /// Publishes that arrived while waiting for an acknowledgement.
    pending: Vec<Message>,
}

impl RumqttcTransport {
    #[must_use]
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            credentials: None,
            session: None,
            pending: Vec::new(),
        }
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.broker_host.clone(),
            self.config.broker_port,
        );
        options.set_keep_alive(self.config.keep_alive());
        options.set_clean_session(false);
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username.clone(), password.clone());
        }
        options
    }

    /// Wait up to `timeout` for the next event of the current session.
    ///
    /// Any connection error tears the session down.
    fn next_event(&mut self, timeout: Duration) -> Result<Option<Event>, MqttError> {
        let session = self.session.as_mut().ok_or(MqttError::NotConnected)?;
        match session.connection.recv_timeout(timeout) {
            Ok(Ok(event)) => Ok(Some(event)),
            Ok(Err(err)) => {
                self.session = None;
                Err(MqttError::Connection(err))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                self.session = None;
                Err(MqttError::ChannelClosed)
            }
        }
    }

    /// Handle events until `done` accepts one, or the ack timeout expires.
    fn await_ack<F>(&mut self, mut done: F) -> Result<(), MqttError>
    where
        F: FnMut(&Packet) -> Option<Result<(), MqttError>>,
    {
        let deadline = Instant::now() + self.config.ack_timeout();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(MqttError::Timeout);
            }
            let Some(Event::Incoming(packet)) = self.next_event(remaining)? else {
                continue;
            };
            if let Some(outcome) = done(&packet) {
                return outcome;
            }
            self.absorb(packet);
        }
    }

    /// Record the side effects of an incoming packet.
    fn absorb(&mut self, packet: Packet) {
        match packet {
            Packet::Publish(publish) => {
                tracing::trace!(topic = %publish.topic, "message received");
                self.pending
                    .push(Message::new(publish.topic, publish.payload.to_vec()));
            }
            Packet::Disconnect => {
                tracing::warn!("broker closed the session");
                if let Some(session) = self.session.as_mut() {
                    session.connected = false;
                }
            }
            _ => {}
        }
    }

    fn open(&mut self) -> Result<(), MqttError> {
        self.session = None;
        self.pending.clear();
        // A persistent session is keyed by the client id.
        if self.config.client_id.is_empty() {
            return Err(MqttError::InvalidClientId);
        }

        let (client, connection) = Client::new(self.options(), self.config.channel_capacity);
        self.session = Some(Session {
            client,
            connection,
            connected: false,
        });

        self.await_ack(|packet| match packet {
            Packet::ConnAck(ack) if ack.code == ConnectReturnCode::Success => Some(Ok(())),
            Packet::ConnAck(ack) => Some(Err(MqttError::Refused(ack.code))),
            _ => None,
        })
        .inspect_err(|_| self.session = None)?;

        if let Some(session) = self.session.as_mut() {
            session.connected = true;
        }
        tracing::info!(
            host = %self.config.broker_host,
            port = self.config.broker_port,
            "connected to broker"
        );
        Ok(())
    }

    fn subscribe_to(&mut self, topic: &str, qos: QoS) -> Result<(), MqttError> {
        let session = self.session.as_mut().ok_or(MqttError::NotConnected)?;
        session
            .client
            .subscribe(topic, qos)
            .map_err(MqttError::Client)?;

        self.await_ack(|packet| match packet {
            Packet::SubAck(ack)
                if ack
                    .return_codes
                    .iter()
                    .any(|code| matches!(code, SubscribeReasonCode::Failure)) =>
            {
                Some(Err(MqttError::SubscribeRejected(topic.to_string())))
            }
            Packet::SubAck(_) => Some(Ok(())),
            _ => None,
        })
    }

    fn pump_events(&mut self) -> Result<Vec<Message>, MqttError> {
        if self.session.is_none() {
            return Err(MqttError::NotConnected);
        }
        let timeout = self.config.poll_timeout();
        for _ in 0..self.config.max_events_per_poll {
            match self.next_event(timeout)? {
                Some(Event::Incoming(packet)) => self.absorb(packet),
                Some(Event::Outgoing(_)) => {}
                None => break,
            }
        }
        Ok(std::mem::take(&mut self.pending))
    }
}

fn qos(class: DeliveryClass) -> QoS {
    match class {
        DeliveryClass::AtMostOnce => QoS::AtMostOnce,
        DeliveryClass::AtLeastOnce => QoS::AtLeastOnce,
        DeliveryClass::ExactlyOnce => QoS::ExactlyOnce,
    }
}

impl PubSubTransport for RumqttcTransport {
    fn set_credentials(&mut self, username: &str, password: &str) {
        self.credentials = Some((username.to_string(), password.to_string()));
    }

    fn connect(&mut self) -> Result<(), ConnectionFault> {
        self.open().map_err(MqttError::into_fault)
    }

    fn subscribe(&mut self, topic: &str, class: DeliveryClass) -> Result<(), ConnectionFault> {
        self.subscribe_to(topic, qos(class))
            .map_err(MqttError::into_fault)
    }

    fn pump(&mut self) -> Result<Vec<Message>, ConnectionFault> {
        self.pump_events().map_err(MqttError::into_fault)
    }

    fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.connected)
    }
}
