//! Scripted in-memory Zabbix used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use super::client::RpcRequest;
use super::error::{Result, ZabbixError};
use super::traits::ZabbixOperations;

#[derive(Default)]
pub struct FakeZabbix {
    responses: Mutex<HashMap<String, VecDeque<JsonValue>>>,
    failures: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<RpcRequest>>,
}

impl FakeZabbix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `result` as the answer to the next `method` call.
    pub fn respond(self, method: &str, result: JsonValue) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(result);
        self
    }

    /// Makes every `method` call fail with an API error.
    pub fn fail(self, method: &str, detail: &str) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(method.to_string(), detail.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RpcRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.method).collect()
    }
}

#[async_trait]
impl ZabbixOperations for FakeZabbix {
    async fn call(&self, method: &str, params: JsonValue) -> Result<JsonValue> {
        let mut calls = self.calls.lock().unwrap();
        let id = calls.len() as u64 + 1;
        calls.push(RpcRequest::new(method, params, id, Some("token".to_string())));
        drop(calls);

        if let Some(detail) = self.failures.lock().unwrap().get(method) {
            return Err(ZabbixError::RemoteApi {
                code: -32602,
                detail: detail.clone(),
            });
        }

        let queued = self
            .responses
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(|queue| queue.pop_front());

        match queued {
            Some(result) => Ok(result),
            None if method.ends_with(".get") => Ok(json!([])),
            None => Err(ZabbixError::UnexpectedResponse(format!(
                "no scripted response for {}",
                method
            ))),
        }
    }

    fn preview(&self, method: &str, params: JsonValue) -> RpcRequest {
        RpcRequest::new(method, params, 0, Some("token".to_string())).redacted()
    }

    fn last_request(&self) -> Option<RpcRequest> {
        self.calls.lock().unwrap().last().map(|c| c.redacted())
    }
}
