//! Publish/subscribe connection state and message types.

use std::fmt;

use serde::de::DeserializeOwned;

/// Connectivity of a publish/subscribe handle.
///
/// Transitions are `Disconnected → Connecting → Connected`, and back to
/// `Disconnected` on any detected failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
        }
    }
}

/// Delivery guarantee requested when subscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryClass {
    /// Delivered zero or one times.
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl Message {
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Decode the payload as JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if the payload does not
    /// match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert!(!ConnectionState::default().is_connected());
    }

    #[test]
    fn should_only_report_connected_state_as_connected() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
    }

    #[test]
    fn should_display_lowercase_state() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }

    #[test]
    fn should_default_to_at_most_once_delivery() {
        assert_eq!(DeliveryClass::default(), DeliveryClass::AtMostOnce);
    }

    #[test]
    fn should_decode_json_payload() {
        let msg = Message::new("yl-home/h/d/report", br#"{"event":"Dimmer.Report"}"#.to_vec());
        let value: serde_json::Value = msg.json().unwrap();
        assert_eq!(value["event"], "Dimmer.Report");
    }

    #[test]
    fn should_fail_on_invalid_json_payload() {
        let msg = Message::new("t", b"not json".to_vec());
        assert!(msg.json::<serde_json::Value>().is_err());
    }
}
