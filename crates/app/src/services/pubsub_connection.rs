//! Pub/sub connection: connect once, poll once, report connectivity.
//!
//! This is mechanism only. Deciding *when* to reconnect, and how often to
//! poll, is left to the host loop.

use std::collections::VecDeque;

use yolink_bridge_domain::connection::{ConnectionState, DeliveryClass, Message};

use crate::ports::PubSubTransport;

/// Messages kept between two drains; the oldest are dropped beyond this.
pub const INBOX_CAPACITY: usize = 1024;

/// Tracks the connectivity of one broker session.
///
/// `state` only moves through [`connect`](Self::connect) and
/// [`poll_once`](Self::poll_once), and is never `Connected` unless every
/// requested topic was subscribed.
pub struct PubSubConnection<P> {
    label: String,
    transport: P,
    state: ConnectionState,
    subscriptions: Vec<String>,
    inbox: VecDeque<Message>,
}

impl<P: PubSubTransport> PubSubConnection<P> {
    /// Wrap `transport`. `label` identifies this connection in logs
    /// (e.g. `"yolink"` or `"local"`).
    pub fn new(label: impl Into<String>, transport: P) -> Self {
        Self {
            label: label.into(),
            transport,
            state: ConnectionState::Disconnected,
            subscriptions: Vec::new(),
            inbox: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Topics subscribed on the current session, in subscription order.
    #[must_use]
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    /// Credentials presented on the next [`connect`](Self::connect).
    pub fn set_credentials(&mut self, username: &str, password: &str) {
        self.transport.set_credentials(username, password);
    }

    /// Open the transport and subscribe to `topics` in order, at most once.
    ///
    /// Returns `true` immediately, without touching the transport, when
    /// already connected. Any failure is logged and leaves the handle
    /// disconnected; no subscription is attempted if opening fails.
    pub fn connect<S: AsRef<str>>(&mut self, topics: &[S]) -> bool {
        if self.is_connected() {
            return true;
        }

        self.state = ConnectionState::Connecting;
        self.subscriptions.clear();
        tracing::debug!(label = %self.label, "connecting");

        if let Err(err) = self.transport.connect() {
            tracing::error!(label = %self.label, error = %err, "client connect failure");
            self.state = ConnectionState::Disconnected;
            return false;
        }

        for topic in topics {
            let topic = topic.as_ref();
            if let Err(err) = self.transport.subscribe(topic, DeliveryClass::AtMostOnce) {
                tracing::error!(label = %self.label, topic, error = %err, "client subscribe failure");
                self.mark_disconnected();
                return false;
            }
            tracing::info!(label = %self.label, topic, "subscribed");
            self.subscriptions.push(topic.to_string());
        }

        self.state = ConnectionState::Connected;
        true
    }

    /// Run one read/write/keep-alive cycle and return the resulting
    /// connectivity.
    ///
    /// Calling this while not connected is a no-op that returns `false`
    /// without touching the transport. Any fault during the cycle marks the
    /// handle disconnected, as does the transport reporting itself down
    /// afterwards, even if the cycle succeeded.
    pub fn poll_once(&mut self) -> bool {
        if !self.is_connected() {
            tracing::debug!(label = %self.label, state = %self.state, "poll skipped");
            return false;
        }

        match self.transport.pump() {
            Ok(messages) => self.enqueue(messages),
            Err(err) => {
                if err.is_io() {
                    tracing::warn!(label = %self.label, error = %err, "client transport failure");
                } else {
                    tracing::error!(label = %self.label, error = %err, "client protocol failure");
                }
                self.mark_disconnected();
            }
        }

        let transport_connected = self.transport.is_connected();
        tracing::debug!(
            label = %self.label,
            transport_connected,
            state = %self.state,
            "poll cycle finished"
        );
        if !transport_connected {
            self.mark_disconnected();
        }

        self.is_connected()
    }

    /// Take every message received since the last drain, oldest first.
    ///
    /// The host is expected to drain after every poll. At most
    /// [`INBOX_CAPACITY`] messages are held; older ones are dropped.
    pub fn drain_messages(&mut self) -> Vec<Message> {
        self.inbox.drain(..).collect()
    }

    fn enqueue(&mut self, messages: Vec<Message>) {
        self.inbox.extend(messages);
        let overflow = self.inbox.len().saturating_sub(INBOX_CAPACITY);
        if overflow > 0 {
            tracing::warn!(label = %self.label, dropped = overflow, "inbox full, dropping oldest messages");
            self.inbox.drain(..overflow);
        }
    }

    fn mark_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.subscriptions.clear();
    }
}

#[cfg(test)]
mod tests {
    use yolink_bridge_domain::error::ConnectionFault;

    use super::*;
    use crate::test_support::{BrokerCall, FakeBroker};

    fn io_fault() -> Box<dyn std::error::Error + Send + Sync> {
        Box::new(std::io::Error::other("socket closed"))
    }

    fn connected() -> PubSubConnection<FakeBroker> {
        let mut conn = PubSubConnection::new("yolink", FakeBroker::default());
        assert!(conn.connect(&["topic/a"]));
        conn
    }

    #[test]
    fn should_start_disconnected() {
        let conn = PubSubConnection::new("yolink", FakeBroker::default());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(conn.subscriptions().is_empty());
    }

    #[test]
    fn should_subscribe_topics_in_order_at_most_once() {
        let mut conn = PubSubConnection::new("yolink", FakeBroker::default());

        assert!(conn.connect(&["topic/a", "topic/b"]));

        assert_eq!(conn.state(), ConnectionState::Connected);
        assert_eq!(conn.subscriptions(), ["topic/a", "topic/b"]);
        assert_eq!(
            conn.transport.calls,
            vec![
                BrokerCall::Connect,
                BrokerCall::Subscribe("topic/a".to_string(), DeliveryClass::AtMostOnce),
                BrokerCall::Subscribe("topic/b".to_string(), DeliveryClass::AtMostOnce),
            ]
        );
    }

    #[test]
    fn should_not_subscribe_when_connect_fails() {
        let broker = FakeBroker {
            fail_connect: true,
            ..FakeBroker::default()
        };
        let mut conn = PubSubConnection::new("yolink", broker);

        assert!(!conn.connect(&["topic/a", "topic/b"]));

        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.transport.calls, vec![BrokerCall::Connect]);
    }

    #[test]
    fn should_stay_disconnected_when_a_subscription_fails() {
        let broker = FakeBroker {
            fail_subscribe_on: Some("topic/b".to_string()),
            ..FakeBroker::default()
        };
        let mut conn = PubSubConnection::new("yolink", broker);

        assert!(!conn.connect(&["topic/a", "topic/b", "topic/c"]));

        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(conn.subscriptions().is_empty());
        assert!(!conn
            .transport
            .calls
            .contains(&BrokerCall::Subscribe("topic/c".to_string(), DeliveryClass::AtMostOnce)));
    }

    #[test]
    fn should_not_touch_transport_when_already_connected() {
        let mut conn = connected();
        let before = conn.transport.transport_calls();

        assert!(conn.connect(&["topic/other"]));

        assert_eq!(conn.transport.transport_calls(), before);
        assert_eq!(conn.subscriptions(), ["topic/a"]);
    }

    #[test]
    fn should_ignore_poll_while_disconnected() {
        let mut conn = PubSubConnection::new("yolink", FakeBroker::default());

        assert!(!conn.poll_once());

        assert_eq!(conn.transport.transport_calls(), 0);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn should_stay_connected_after_clean_poll() {
        let mut conn = connected();

        assert!(conn.poll_once());
        assert!(conn.poll_once());

        assert_eq!(conn.state(), ConnectionState::Connected);
    }

    #[test]
    fn should_queue_received_messages() {
        let mut conn = connected();
        conn.transport.pump_results.push_back(Ok(vec![
            Message::new("topic/a", b"1".to_vec()),
            Message::new("topic/a", b"2".to_vec()),
        ]));
        conn.transport
            .pump_results
            .push_back(Ok(vec![Message::new("topic/a", b"3".to_vec())]));

        conn.poll_once();
        conn.poll_once();
        let payloads: Vec<_> = conn
            .drain_messages()
            .into_iter()
            .map(|m| m.payload)
            .collect();

        assert_eq!(payloads, vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);
        assert!(conn.drain_messages().is_empty());
    }

    #[test]
    fn should_drop_oldest_messages_beyond_capacity() {
        let mut conn = connected();
        let batch: Vec<_> = (0..=INBOX_CAPACITY)
            .map(|i| Message::new("topic/a", i.to_string()))
            .collect();
        conn.transport.pump_results.push_back(Ok(batch));

        assert!(conn.poll_once());
        let messages = conn.drain_messages();

        assert_eq!(messages.len(), INBOX_CAPACITY);
        assert_eq!(messages[0].payload, b"1".to_vec());
        assert_eq!(
            messages.last().unwrap().payload,
            INBOX_CAPACITY.to_string().into_bytes()
        );
    }

    #[test]
    fn should_disconnect_on_write_fault() {
        let mut conn = connected();
        conn.transport
            .pump_results
            .push_back(Err(ConnectionFault::Write(io_fault())));

        assert!(!conn.poll_once());

        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(conn.subscriptions().is_empty());
    }

    #[test]
    fn should_disconnect_on_protocol_fault() {
        let mut conn = connected();
        conn.transport
            .pump_results
            .push_back(Err(ConnectionFault::Protocol("unexpected packet".into())));

        assert!(!conn.poll_once());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn should_trust_transport_when_it_reports_disconnected() {
        let mut conn = connected();
        conn.transport.transport_connected = false;

        assert!(!conn.poll_once());

        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn should_reconnect_after_disconnect() {
        let mut conn = connected();
        conn.transport
            .pump_results
            .push_back(Err(ConnectionFault::Read(io_fault())));
        assert!(!conn.poll_once());

        assert!(conn.connect(&["topic/a"]));

        assert_eq!(conn.state(), ConnectionState::Connected);
        let connects = conn
            .transport
            .calls
            .iter()
            .filter(|c| **c == BrokerCall::Connect)
            .count();
        assert_eq!(connects, 2);
    }

    #[test]
    fn should_forward_credentials_to_transport() {
        let mut conn = PubSubConnection::new("yolink", FakeBroker::default());

        conn.set_credentials("token-1", "");

        assert_eq!(
            conn.transport.calls,
            vec![BrokerCall::Credentials("token-1".to_string(), String::new())]
        );
    }
}
