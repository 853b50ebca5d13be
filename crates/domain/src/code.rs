//! Server-reported error codes and their classification.
//!
//! Every response from the control API may carry a six-digit `code`. The
//! table is closed: an absent code or `000000` is the only success marker,
//! every listed code is a failure, and anything unlisted maps to
//! [`ErrorCode::Unknown`], also a failure.

use std::fmt;

/// The all-zero code the server uses to report success.
pub const SUCCESS_CODE: &str = "000000";

/// A classified server error code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// `000000`, or no code at all.
    Success,
    /// `000101`
    HubUnreachable,
    /// `000102`
    HubUnresponsive,
    /// `000103`
    InvalidToken,
    /// `000201`
    DeviceUnreachable,
    /// `000202`
    DeviceUnresponsive,
    /// `000203`
    DeviceNotConnected,
    /// `010000`
    ConnectionUnavailable,
    /// `010101`
    HeaderError,
    /// `010201`
    MissingTime,
    /// `020102`
    DeviceMaskError,
    /// `020201`
    DeviceNotFound,
    /// `030101`
    NoDataFound,
    /// Any code outside the table, kept verbatim.
    Unknown(String),
}

impl ErrorCode {
    /// Classify the optional `code` field of a response.
    #[must_use]
    pub fn from_response(code: Option<&str>) -> Self {
        code.map_or(Self::Success, Self::parse)
    }

    /// Classify a raw code string.
    #[must_use]
    pub fn parse(code: &str) -> Self {
        match code {
            SUCCESS_CODE => Self::Success,
            "000101" => Self::HubUnreachable,
            "000102" => Self::HubUnresponsive,
            "000103" => Self::InvalidToken,
            "000201" => Self::DeviceUnreachable,
            "000202" => Self::DeviceUnresponsive,
            "000203" => Self::DeviceNotConnected,
            "010000" => Self::ConnectionUnavailable,
            "010101" => Self::HeaderError,
            "010201" => Self::MissingTime,
            "020102" => Self::DeviceMaskError,
            "020201" => Self::DeviceNotFound,
            "030101" => Self::NoDataFound,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The wire representation of this code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => SUCCESS_CODE,
            Self::HubUnreachable => "000101",
            Self::HubUnresponsive => "000102",
            Self::InvalidToken => "000103",
            Self::DeviceUnreachable => "000201",
            Self::DeviceUnresponsive => "000202",
            Self::DeviceNotConnected => "000203",
            Self::ConnectionUnavailable => "010000",
            Self::HeaderError => "010101",
            Self::MissingTime => "010201",
            Self::DeviceMaskError => "020102",
            Self::DeviceNotFound => "020201",
            Self::NoDataFound => "030101",
            Self::Unknown(code) => code,
        }
    }

    /// Human-readable meaning of this code.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::HubUnreachable => "can't connect to the hub",
            Self::HubUnresponsive => "hub can't respond to this command",
            Self::InvalidToken => "token is not valid",
            Self::DeviceUnreachable | Self::DeviceNotConnected => "can't connect to the device",
            Self::DeviceUnresponsive => "device can't respond to this command",
            Self::ConnectionUnavailable => "connection not available, try again",
            Self::HeaderError => "header error, customer id error",
            Self::MissingTime => "body error, time can not be null",
            Self::DeviceMaskError => "device mask error",
            Self::DeviceNotFound => "no device searched",
            Self::NoDataFound => "no data found",
            Self::Unknown(_) => "unknown error",
        }
    }

    /// Whether this code marks a successful response.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.message())
    }
}
