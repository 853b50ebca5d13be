//! In-memory port fakes shared by the service tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use yolink_bridge_domain::connection::{DeliveryClass, Message};
use yolink_bridge_domain::envelope::TOKEN_ENDPOINT;
use yolink_bridge_domain::error::{ConnectionFault, TransportError};
use yolink_bridge_domain::token::AccessToken;

use crate::ports::{HttpTransport, PubSubTransport};

pub(crate) const BASE_URL: &str = "https://api.example.test/open/yolink";

/// A scripted answer to one request.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Body(String),
    Status(u16),
    Timeout,
}

impl Reply {
    pub(crate) fn json(value: &Value) -> Self {
        Self::Body(value.to_string())
    }
}

/// A request observed by [`ScriptedHttp`].
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub url: String,
    pub bearer: Option<String>,
    pub body: Value,
}

impl Call {
    pub(crate) fn is_token_exchange(&self) -> bool {
        self.url.ends_with(&format!("/{TOKEN_ENDPOINT}"))
    }
}

/// HTTP fake with separate reply queues for the token endpoint and every
/// other endpoint.
///
/// When the token queue is empty, token exchanges succeed with
/// `token-1`, `token-2`, … in order.
#[derive(Default)]
pub(crate) struct ScriptedHttp {
    token_replies: Mutex<VecDeque<Reply>>,
    api_replies: Mutex<VecDeque<Reply>>,
    issued: Mutex<u32>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedHttp {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push_token(&self, reply: Reply) {
        self.token_replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn push_api(&self, reply: Reply) {
        self.api_replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn token_calls(&self) -> usize {
        self.calls().iter().filter(|c| c.is_token_exchange()).count()
    }

    pub(crate) fn api_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !c.is_token_exchange())
            .collect()
    }

    fn next_token(&self) -> Reply {
        let mut issued = self.issued.lock().unwrap();
        *issued += 1;
        Reply::json(&serde_json::json!({
            "access_token": format!("token-{issued}"),
            "token_type": "bearer",
            "expires_in": 7200,
        }))
    }
}

impl HttpTransport for ScriptedHttp {
    fn post_json(
        &self,
        url: &str,
        bearer: Option<&AccessToken>,
        body: &Value,
    ) -> Result<String, TransportError> {
        let call = Call {
            url: url.to_string(),
            bearer: bearer.map(|t| t.as_str().to_string()),
            body: body.clone(),
        };
        let reply = if call.is_token_exchange() {
            let scripted = self.token_replies.lock().unwrap().pop_front();
            scripted.unwrap_or_else(|| self.next_token())
        } else {
            self.api_replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Reply::Status(599))
        };
        self.calls.lock().unwrap().push(call);
        match reply {
            Reply::Body(body) => Ok(body),
            Reply::Status(status) => Err(TransportError::Status(status)),
            Reply::Timeout => Err(TransportError::Timeout),
        }
    }
}

/// A call observed by [`FakeBroker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BrokerCall {
    Credentials(String, String),
    Connect,
    Subscribe(String, DeliveryClass),
    Pump,
}

/// Pub/sub fake with scripted outcomes.
#[derive(Default)]
pub(crate) struct FakeBroker {
    pub calls: Vec<BrokerCall>,
    pub fail_connect: bool,
    pub fail_subscribe_on: Option<String>,
    pub pump_results: VecDeque<Result<Vec<Message>, ConnectionFault>>,
    pub transport_connected: bool,
}

impl FakeBroker {
    pub(crate) fn transport_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| !matches!(c, BrokerCall::Credentials(..)))
            .count()
    }
}

fn refused() -> ConnectionFault {
    ConnectionFault::Transport(Box::new(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "refused",
    )))
}

impl PubSubTransport for FakeBroker {
    fn set_credentials(&mut self, username: &str, password: &str) {
        self.calls.push(BrokerCall::Credentials(
            username.to_string(),
            password.to_string(),
        ));
    }

    fn connect(&mut self) -> Result<(), ConnectionFault> {
        self.calls.push(BrokerCall::Connect);
        if self.fail_connect {
            return Err(refused());
        }
        self.transport_connected = true;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str, class: DeliveryClass) -> Result<(), ConnectionFault> {
        self.calls
            .push(BrokerCall::Subscribe(topic.to_string(), class));
        if self.fail_subscribe_on.as_deref() == Some(topic) {
            return Err(ConnectionFault::Protocol("subscription rejected".into()));
        }
        Ok(())
    }

    fn pump(&mut self) -> Result<Vec<Message>, ConnectionFault> {
        self.calls.push(BrokerCall::Pump);
        self.pump_results.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn is_connected(&self) -> bool {
        self.transport_connected
    }
}
