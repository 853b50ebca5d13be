//! Time and timestamp helpers.

use chrono::Utc;

/// Seconds since the Unix epoch, as carried in the `time` field of every
/// request envelope.
pub type UnixSeconds = i64;

/// Return the current time in seconds since the Unix epoch.
#[must_use]
pub fn unix_now() -> UnixSeconds {
    Utc::now().timestamp()
}
