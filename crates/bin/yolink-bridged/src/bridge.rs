//! Bridge loop: keeps the broker session alive and surfaces device reports.
//!
//! The connection manager only reports connectivity. Deciding when to
//! reconnect, how long to wait, and when to refresh the token before doing
//! so happens here.

use std::time::Duration;

use yolink_bridge_app::ports::{HttpTransport, PubSubTransport};
use yolink_bridge_app::services::home_service::HomeService;
use yolink_bridge_app::services::pubsub_connection::PubSubConnection;
use yolink_bridge_domain::device::{DeviceReport, report_topic};
use yolink_bridge_domain::error::ApiError;

/// Exponential backoff between reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    initial: Duration,
    max: Duration,
}

impl ReconnectPolicy {
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    /// Delay before reconnect attempt number `attempt` (zero-based):
    /// `initial`, doubled on every attempt, never above `max`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.max)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}

/// What the loop should do after a [`Bridge::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The session is live; `received` reports were handled.
    Polled { received: usize },
    /// The session is down; wait this long before the next step.
    Backoff(Duration),
}

pub struct Bridge<T, P> {
    home: HomeService<T>,
    connection: PubSubConnection<P>,
    reconnect: ReconnectPolicy,
    poll_interval: Duration,
    failures: u32,
    refresh: bool,
}

impl<T: HttpTransport, P: PubSubTransport> Bridge<T, P> {
    pub fn new(
        home: HomeService<T>,
        connection: PubSubConnection<P>,
        reconnect: ReconnectPolicy,
        poll_interval: Duration,
    ) -> Self {
        Self {
            home,
            connection,
            reconnect,
            poll_interval,
            failures: 0,
            refresh: false,
        }
    }

    #[cfg(test)]
    pub fn connection(&self) -> &PubSubConnection<P> {
        &self.connection
    }

    /// Run one iteration: poll a live session, or try to open one.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`ApiError`]; every other failure is turned into a
    /// [`Step::Backoff`].
    pub fn step(&mut self) -> Result<Step, ApiError> {
        if self.connection.is_connected() {
            let alive = self.connection.poll_once();
            let received = self.dispatch();
            if alive {
                return Ok(Step::Polled { received });
            }
            tracing::warn!(received, "broker session lost");
            self.refresh = true;
            return Ok(self.backoff());
        }

        match self.open() {
            Ok(true) => {
                self.failures = 0;
                Ok(Step::Polled { received: 0 })
            }
            Ok(false) => {
                self.refresh = true;
                Ok(self.backoff())
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "unable to prepare broker session");
                Ok(self.backoff())
            }
        }
    }

    /// Step forever, sleeping between iterations.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`ApiError`].
    pub fn run(&mut self) -> Result<(), ApiError> {
        loop {
            match self.step()? {
                Step::Polled { received } => {
                    tracing::debug!(received, "poll cycle handled");
                    std::thread::sleep(self.poll_interval);
                }
                Step::Backoff(delay) => {
                    tracing::info!(delay_ms = delay.as_millis(), "waiting before reconnect");
                    std::thread::sleep(delay);
                }
            }
        }
    }

    fn open(&mut self) -> Result<bool, ApiError> {
        let home_id = self.home.home_id()?;
        let token = self.home.client().tokens().get_token(self.refresh)?;
        self.refresh = false;
        self.connection.set_credentials(token.as_str(), "");
        Ok(self.connection.connect(&[report_topic(&home_id)]))
    }

    fn backoff(&mut self) -> Step {
        let delay = self.reconnect.delay(self.failures);
        self.failures = self.failures.saturating_add(1);
        Step::Backoff(delay)
    }

    fn dispatch(&mut self) -> usize {
        let messages = self.connection.drain_messages();
        for message in &messages {
            match message.json::<DeviceReport>() {
                Ok(report) => tracing::info!(
                    device_id = %report.device_id,
                    event = %report.event,
                    data = %report.data,
                    "device report"
                ),
                Err(err) => tracing::warn!(
                    topic = %message.topic,
                    error = %err,
                    "ignoring undecodable report"
                ),
            }
        }
        messages.len()
    }
}
