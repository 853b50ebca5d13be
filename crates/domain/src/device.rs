//! Device: a YoLink device as listed by the cloud, and the reports it pushes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A device registered to the account's home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
    pub name: String,
    /// Device family (`Dimmer`, `DoorSensor`, …); prefixes its method names.
    #[serde(rename = "type")]
    pub device_type: String,
    /// Per-device token required on device method calls.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
}

impl Device {
    /// Fully qualified method name for this device, e.g. `Dimmer.getState`.
    #[must_use]
    pub fn method(&self, action: &str) -> String {
        format!("{}.{action}", self.device_type)
    }
}

/// General information about the account's home.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HomeInfo {
    pub id: String,
}

/// A state report pushed by the cloud on a device topic.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceReport {
    pub event: String,
    pub device_id: String,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub msgid: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// Topic on which the cloud publishes reports for every device of a home.
#[must_use]
pub fn report_topic(home_id: &str) -> String {
    format!("yl-home/{home_id}/+/report")
}
