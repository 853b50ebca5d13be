//! MQTT adapter error types.

use std::io::ErrorKind;

use rumqttc::{ConnectReturnCode, ConnectionError};
use yolink_bridge_domain::error::ConnectionFault;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// No session has been opened yet, or the last one failed.
    #[error("MQTT client not connected")]
    NotConnected,

    /// The request could not be queued for the event loop.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),

    /// The event loop failed while talking to the broker.
    #[error("MQTT connection error")]
    Connection(#[source] ConnectionError),

    /// The broker answered the connect with a refusal.
    #[error("MQTT connection refused: {0:?}")]
    Refused(ConnectReturnCode),

    /// The broker rejected a subscription.
    #[error("MQTT subscription to {0:?} rejected")]
    SubscribeRejected(String),

    /// A persistent session needs a non-empty client id.
    #[error("MQTT client id must not be empty")]
    InvalidClientId,

    /// The broker did not acknowledge in time.
    #[error("MQTT acknowledgement timed out")]
    Timeout,

    /// The event loop is gone.
    #[error("MQTT event channel closed")]
    ChannelClosed,
}

enum Channel {
    Read,
    Write,
    Network,
    Protocol,
}

impl MqttError {
    fn channel(&self) -> Option<Channel> {
        let channel = match self {
            Self::NotConnected => return None,
            Self::Client(_) => Channel::Write,
            Self::Connection(ConnectionError::Io(err)) => match err.kind() {
                ErrorKind::UnexpectedEof
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted => Channel::Read,
                ErrorKind::BrokenPipe | ErrorKind::WriteZero => Channel::Write,
                _ => Channel::Network,
            },
            Self::Connection(ConnectionError::FlushTimeout) => Channel::Write,
            Self::Connection(
                ConnectionError::MqttState(_) | ConnectionError::ConnectionRefused(_),
            )
            | Self::Refused(_)
            | Self::SubscribeRejected(_)
            | Self::InvalidClientId => Channel::Protocol,
            Self::Connection(_) | Self::Timeout | Self::ChannelClosed => Channel::Network,
        };
        Some(channel)
    }

    /// Convert into a [`ConnectionFault`] for propagation across the port
    /// boundary.
    pub fn into_fault(self) -> ConnectionFault {
        match self.channel() {
            None => ConnectionFault::NotConnected,
            Some(Channel::Read) => ConnectionFault::Read(Box::new(self)),
            Some(Channel::Write) => ConnectionFault::Write(Box::new(self)),
            Some(Channel::Network) => ConnectionFault::Transport(Box::new(self)),
            Some(Channel::Protocol) => ConnectionFault::Protocol(Box::new(self)),
        }
    }
}

impl From<MqttError> for ConnectionFault {
    fn from(err: MqttError) -> Self {
        err.into_fault()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn io_error(kind: ErrorKind) -> MqttError {
        MqttError::Connection(ConnectionError::Io(io::Error::from(kind)))
    }

    #[test]
    fn should_display_not_connected_error() {
        let err = MqttError::NotConnected;
        assert_eq!(err.to_string(), "MQTT client not connected");
    }

    #[test]
    fn should_convert_not_connected() {
        let fault: ConnectionFault = MqttError::NotConnected.into();
        assert!(matches!(fault, ConnectionFault::NotConnected));
    }

    #[test]
    fn should_classify_reset_as_read_fault() {
        assert!(matches!(
            io_error(ErrorKind::ConnectionReset).into_fault(),
            ConnectionFault::Read(_)
        ));
        assert!(matches!(
            io_error(ErrorKind::UnexpectedEof).into_fault(),
            ConnectionFault::Read(_)
        ));
    }

    #[test]
    fn should_classify_broken_pipe_as_write_fault() {
        assert!(matches!(
            io_error(ErrorKind::BrokenPipe).into_fault(),
            ConnectionFault::Write(_)
        ));
        assert!(matches!(
            MqttError::Connection(ConnectionError::FlushTimeout).into_fault(),
            ConnectionFault::Write(_)
        ));
    }

    #[test]
    fn should_classify_refusal_as_protocol_fault() {
        let fault = MqttError::Refused(ConnectReturnCode::BadUserNamePassword).into_fault();
        assert!(matches!(fault, ConnectionFault::Protocol(_)));
        assert!(!fault.is_io());
    }

    #[test]
    fn should_classify_timeouts_as_transport_fault() {
        assert!(matches!(
            MqttError::Timeout.into_fault(),
            ConnectionFault::Transport(_)
        ));
        assert!(matches!(
            MqttError::Connection(ConnectionError::NetworkTimeout).into_fault(),
            ConnectionFault::Transport(_)
        ));
        assert!(matches!(
            io_error(ErrorKind::ConnectionRefused).into_fault(),
            ConnectionFault::Transport(_)
        ));
    }

    #[test]
    fn should_display_rejected_subscription() {
        let err = MqttError::SubscribeRejected("yl-home/h/+/report".to_string());
        assert_eq!(
            err.to_string(),
            "MQTT subscription to \"yl-home/h/+/report\" rejected"
        );
    }
}
