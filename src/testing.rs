//! Test doubles shared by the unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;

use crate::error::WapiError;
use crate::transport::{HttpResponse, Method, Transport};

pub(crate) const URL: &str = "http://foo/wapi/v2.9";

pub(crate) fn network_schema() -> Value {
    serde_json::from_str(include_str!("../tests/fixtures/network_schema.json")).unwrap()
}

pub(crate) fn api_schema() -> Value {
    serde_json::from_str(include_str!("../tests/fixtures/api_schema.json")).unwrap()
}

/// One request seen by `RecordingTransport`.
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Call {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Replays scripted responses in order and records every request.
///
/// Clones share their script and their record, so a clone can be handed to a
/// `Client` while the test keeps inspecting the original.
#[derive(Default, Clone)]
pub(crate) struct RecordingTransport {
    responses: Rc<RefCell<VecDeque<HttpResponse>>>,
    calls: Rc<RefCell<Vec<Call>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose first answer is the network schema.
    pub fn with_network_schema() -> Self {
        let transport = Self::new();
        transport.push(200, network_schema());
        transport
    }

    pub fn push(&self, status: u16, body: Value) -> &Self {
        self.responses
            .borrow_mut()
            .push_back(HttpResponse::new(status, body.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn last_call(&self) -> Call {
        self.calls.borrow().last().cloned().unwrap()
    }
}

impl Transport for RecordingTransport {
    fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<HttpResponse, WapiError> {
        self.calls.borrow_mut().push(Call {
            method,
            url: url.to_string(),
            query: query.to_vec(),
            body: body.cloned(),
        });
        let response = self.responses.borrow_mut().pop_front();
        Ok(response.unwrap_or_else(|| panic!("no scripted response for {} {}", method.as_str(), url)))
    }
}
