//! Home service: use-cases for the account's home and its devices.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use yolink_bridge_domain::device::{Device, HomeInfo};
use yolink_bridge_domain::envelope::{API_ENDPOINT, RequestEnvelope, ResponseEnvelope};
use yolink_bridge_domain::error::{ApiError, ProtocolError};

use crate::ports::HttpTransport;
use crate::services::request_client::ResilientRequestClient;

/// The outcome of a state request for one device.
#[derive(Debug)]
pub struct DeviceStateReport {
    pub device: Device,
    pub state: Result<Value, ApiError>,
}

/// Application service for home-level API calls.
///
/// The home id and the device list are fetched once and cached until
/// [`refresh_device_list`](Self::refresh_device_list) is called.
pub struct HomeService<T> {
    client: ResilientRequestClient<T>,
    home_id: Option<String>,
    devices: Option<Vec<Device>>,
}

impl<T: HttpTransport> HomeService<T> {
    /// Create a new service on top of `client`.
    pub fn new(client: ResilientRequestClient<T>) -> Self {
        Self {
            client,
            home_id: None,
            devices: None,
        }
    }

    /// The underlying request client.
    pub fn client(&self) -> &ResilientRequestClient<T> {
        &self.client
    }

    /// Id of the account's home (`Home.getGeneralInfo`).
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] of the call, or [`ApiError::Protocol`] if
    /// `data.id` is missing.
    #[tracing::instrument(skip(self))]
    pub fn home_id(&mut self) -> Result<String, ApiError> {
        if let Some(id) = &self.home_id {
            return Ok(id.clone());
        }
        let response = self.client.call(&RequestEnvelope::new("Home.getGeneralInfo"))?;
        let info: HomeInfo = parse_data(&response, None)?;
        tracing::debug!(home_id = %info.id, "home id resolved");
        self.home_id = Some(info.id.clone());
        Ok(info.id)
    }

    /// Devices registered to the home (`Home.getDeviceList`).
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] of the call, or [`ApiError::Protocol`] if
    /// `data.devices` is missing or malformed.
    #[tracing::instrument(skip(self))]
    pub fn device_list(&mut self) -> Result<Vec<Device>, ApiError> {
        if let Some(devices) = &self.devices {
            return Ok(devices.clone());
        }
        let response = self.client.call(&RequestEnvelope::new("Home.getDeviceList"))?;
        let devices: Vec<Device> = parse_data(&response, Some("devices"))?;
        tracing::info!(count = devices.len(), "device list fetched");
        self.devices = Some(devices.clone());
        Ok(devices)
    }

    /// Drop the cached device list and fetch it again.
    ///
    /// # Errors
    ///
    /// See [`device_list`](Self::device_list).
    pub fn refresh_device_list(&mut self) -> Result<Vec<Device>, ApiError> {
        self.devices = None;
        self.device_list()
    }

    /// Current state of a single device (`<Type>.getState`).
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] of the call, or [`ApiError::Protocol`] if
    /// the response carries no `data`.
    #[tracing::instrument(skip(self, device), fields(device_id = %device.device_id))]
    pub fn device_state(&self, device: &Device) -> Result<Value, ApiError> {
        let response = self.send_command(device, "getState", None)?;
        response.require_data().cloned().map_err(protocol)
    }

    /// State of every listed device.
    ///
    /// If the device list cannot be fetched, no per-device request is
    /// issued. A non-fatal failure for one device is recorded in its report
    /// and the remaining devices are still queried.
    ///
    /// # Errors
    ///
    /// Returns the device-list error, or the first fatal error.
    pub fn device_states(&mut self) -> Result<Vec<DeviceStateReport>, ApiError> {
        let devices = self.device_list()?;
        let mut reports = Vec::with_capacity(devices.len());
        for device in devices {
            let state = match self.device_state(&device) {
                Err(err) if err.is_fatal() => return Err(err),
                other => other,
            };
            reports.push(DeviceStateReport { device, state });
        }
        Ok(reports)
    }

    /// Invoke `action` (e.g. `setState`) on `device`, with optional params.
    ///
    /// # Errors
    ///
    /// See [`ResilientRequestClient::execute`].
    pub fn send_command(
        &self,
        device: &Device,
        action: &str,
        params: Option<Map<String, Value>>,
    ) -> Result<ResponseEnvelope, ApiError> {
        let mut request =
            RequestEnvelope::new(device.method(action)).target_device(&device.device_id);
        if let Some(token) = &device.token {
            request = request.device_token(token);
        }
        if let Some(params) = params {
            request = request.params(params);
        }
        self.client.call(&request)
    }
}

fn protocol(source: ProtocolError) -> ApiError {
    ApiError::Protocol {
        endpoint: API_ENDPOINT.to_string(),
        source,
    }
}

/// Decode `data` (or `data.<field>`) of a response into `D`.
fn parse_data<D: DeserializeOwned>(
    response: &ResponseEnvelope,
    field: Option<&'static str>,
) -> Result<D, ApiError> {
    let data = response.require_data().map_err(protocol)?;
    let value = match field {
        Some(name) => data
            .get(name)
            .ok_or(ProtocolError::MissingField(name))
            .map_err(protocol)?,
        None => data,
    };
    serde_json::from_value(value.clone())
        .map_err(|_| protocol(ProtocolError::MissingField(field.unwrap_or("data"))))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use yolink_bridge_domain::token::ClientCredentials;

    use super::*;
    use crate::retry::RetryPolicy;
    use crate::test_support::{BASE_URL, Reply, ScriptedHttp};

    fn make_service() -> (Arc<ScriptedHttp>, HomeService<Arc<ScriptedHttp>>) {
        let http = ScriptedHttp::new();
        let client = ResilientRequestClient::new(
            Arc::clone(&http),
            BASE_URL,
            ClientCredentials::new("uaid", "secret"),
            RetryPolicy::new(0, Duration::ZERO),
        );
        (http, HomeService::new(client))
    }

    fn success(data: &Value) -> Reply {
        Reply::json(&json!({ "code": "000000", "desc": "Success", "data": data }))
    }

    fn device_list() -> Value {
        json!({
            "devices": [
                { "deviceId": "d-1", "name": "Porch", "type": "Dimmer", "token": "t-1" },
                { "deviceId": "d-2", "name": "Door", "type": "DoorSensor", "token": "t-2" },
            ]
        })
    }

    #[test]
    fn should_fetch_and_cache_home_id() {
        let (http, mut svc) = make_service();
        http.push_api(success(&json!({ "id": "home-1" })));

        assert_eq!(svc.home_id().unwrap(), "home-1");
        assert_eq!(svc.home_id().unwrap(), "home-1");

        let api = http.api_calls();
        assert_eq!(api.len(), 1);
        assert_eq!(api[0].body["method"], "Home.getGeneralInfo");
    }

    #[test]
    fn should_report_missing_home_id() {
        let (http, mut svc) = make_service();
        http.push_api(success(&json!({ "name": "My Home" })));

        let err = svc.home_id().unwrap_err();

        assert!(matches!(err, ApiError::Protocol { .. }));
    }

    #[test]
    fn should_fetch_and_cache_device_list() {
        let (http, mut svc) = make_service();
        http.push_api(success(&device_list()));

        let devices = svc.device_list().unwrap();
        let again = svc.device_list().unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices, again);
        assert_eq!(devices[1].device_type, "DoorSensor");
        assert_eq!(http.api_calls().len(), 1);
    }

    #[test]
    fn should_refetch_device_list_on_refresh() {
        let (http, mut svc) = make_service();
        http.push_api(success(&device_list()));
        http.push_api(success(&json!({ "devices": [] })));

        svc.device_list().unwrap();
        let refreshed = svc.refresh_device_list().unwrap();

        assert!(refreshed.is_empty());
        assert_eq!(http.api_calls().len(), 2);
    }

    #[test]
    fn should_address_state_request_to_device() {
        let (http, mut svc) = make_service();
        http.push_api(success(&device_list()));
        http.push_api(success(&json!({ "state": { "brightness": 40 } })));

        let device = svc.device_list().unwrap().remove(0);
        let state = svc.device_state(&device).unwrap();

        assert_eq!(state["state"]["brightness"], 40);
        let body = &http.api_calls()[1].body;
        assert_eq!(body["method"], "Dimmer.getState");
        assert_eq!(body["targetDevice"], "d-1");
        assert_eq!(body["token"], "t-1");
        assert!(body["time"].is_i64());
    }

    #[test]
    fn should_skip_device_states_when_list_fails() {
        let (http, mut svc) = make_service();
        http.push_api(Reply::json(&json!({ "code": "000101" })));

        let err = svc.device_states().unwrap_err();

        assert!(!err.is_fatal());
        assert_eq!(http.api_calls().len(), 1);
    }

    #[test]
    fn should_record_per_device_failures_and_continue() {
        let (http, mut svc) = make_service();
        http.push_api(success(&device_list()));
        http.push_api(Reply::json(&json!({ "code": "000201" })));
        http.push_api(success(&json!({ "state": "closed" })));

        let reports = svc.device_states().unwrap();

        assert_eq!(reports.len(), 2);
        assert!(reports[0].state.is_err());
        assert_eq!(reports[1].device.device_id, "d-2");
        assert_eq!(reports[1].state.as_ref().unwrap()["state"], "closed");
    }

    #[test]
    fn should_abort_device_states_on_fatal_error() {
        let (http, mut svc) = make_service();
        http.push_api(success(&device_list()));
        http.push_api(Reply::Timeout);

        let err = svc.device_states().unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(http.api_calls().len(), 2);
    }

    #[test]
    fn should_send_command_with_params() {
        let (http, mut svc) = make_service();
        http.push_api(success(&device_list()));
        http.push_api(success(&json!({ "state": "open" })));
        let device = svc.device_list().unwrap().remove(0);
        let mut params = Map::new();
        params.insert("brightness".to_string(), json!(25));

        svc.send_command(&device, "setState", Some(params)).unwrap();

        let body = &http.api_calls()[1].body;
        assert_eq!(body["method"], "Dimmer.setState");
        assert_eq!(body["params"], json!({ "brightness": 25 }));
    }
}
