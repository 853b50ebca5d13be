//! Publish/subscribe transport port: a blocking broker session.

use yolink_bridge_domain::connection::{DeliveryClass, Message};
use yolink_bridge_domain::error::ConnectionFault;

/// A broker session that only advances when pumped.
///
/// Implementations must not reconnect on their own: after a fault the
/// session stays down until [`connect`](Self::connect) is called again.
pub trait PubSubTransport {
    /// Credentials presented on the next [`connect`](Self::connect).
    fn set_credentials(&mut self, username: &str, password: &str);

    /// Open a fresh session, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionFault`] if the broker cannot be reached or
    /// refuses the session.
    fn connect(&mut self) -> Result<(), ConnectionFault>;

    /// Subscribe to `topic` and wait for the broker to acknowledge it.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionFault`] if there is no session or the broker
    /// rejects the subscription.
    fn subscribe(&mut self, topic: &str, class: DeliveryClass) -> Result<(), ConnectionFault>;

    /// Run one cycle of read, write and keep-alive processing, returning
    /// the messages received during it.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionFault`] on any read, write or protocol failure.
    fn pump(&mut self) -> Result<Vec<Message>, ConnectionFault>;

    /// The transport's own view of its connectivity.
    fn is_connected(&self) -> bool;
}
