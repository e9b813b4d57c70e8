use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::instrument;
use url::Url;

use super::error::{Result, ZabbixError};
use super::traits::ZabbixOperations;

const API_PATH: &str = "api_jsonrpc.php";
const REDACTED: &str = "********";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: JsonValue,
    pub id: u64,
    pub auth: Option<String>,
}

impl RpcRequest {
    pub fn new(method: &str, params: JsonValue, id: u64, auth: Option<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id,
            auth,
        }
    }

    /// Copy safe to print: auth token and login password masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.auth.is_some() {
            copy.auth = Some(REDACTED.to_string());
        }
        if let Some(password) = copy.params.get_mut("password") {
            *password = JsonValue::String(REDACTED.to_string());
        }
        copy
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<JsonValue>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<JsonValue>,
}

impl From<RpcErrorBody> for ZabbixError {
    fn from(body: RpcErrorBody) -> Self {
        let detail = match body.data {
            Some(JsonValue::String(data)) if !data.is_empty() => data,
            Some(JsonValue::String(_)) | Some(JsonValue::Null) | None => body.message,
            Some(other) => other.to_string(),
        };
        ZabbixError::RemoteApi {
            code: body.code,
            detail,
        }
    }
}

/// Appends `api_jsonrpc.php` to a frontend URL unless it already points at it.
pub fn endpoint_url(base: &str) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| ZabbixError::validation(format!("invalid Zabbix URL '{}': {}", base, e)))?;

    if !url.path().ends_with(API_PATH) {
        let path = format!("{}/{}", url.path().trim_end_matches('/'), API_PATH);
        url.set_path(&path);
    }

    Ok(url)
}

/// Authenticated JSON-RPC session.
///
/// Request ids start at 1 and increase by one per request sent.
pub struct ZabbixSession {
    http: reqwest::Client,
    endpoint: Url,
    auth: Option<String>,
    request_id: AtomicU64,
    last_request: Mutex<Option<RpcRequest>>,
}

impl ZabbixSession {
    fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint,
            auth: None,
            request_id: AtomicU64::new(0),
            last_request: Mutex::new(None),
        })
    }

    /// Logs in with `user.login` and keeps the returned token for every
    /// following call.
    #[instrument(skip(password, timeout))]
    pub async fn open(base_url: &str, user: &str, password: &str, timeout: Duration) -> Result<Self> {
        let mut session = Self::new(endpoint_url(base_url)?, timeout)?;

        let token = session
            .call("user.login", json!({"user": user, "password": password}))
            .await
            .map_err(|e| ZabbixError::Authentication(e.to_string()))?;

        match token {
            JsonValue::String(token) => {
                debug!("Authenticated to {} as {}", session.endpoint, user);
                session.auth = Some(token);
                Ok(session)
            }
            other => Err(ZabbixError::Authentication(format!(
                "user.login returned no token: {}",
                other
            ))),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> u64 {
        self.request_id.load(Ordering::SeqCst)
    }

    fn remember(&self, request: &RpcRequest) {
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.redacted());
        }
    }
}

#[async_trait]
impl ZabbixOperations for ZabbixSession {
    #[instrument(skip(self, params))]
    async fn call(&self, method: &str, params: JsonValue) -> Result<JsonValue> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst) + 1;
        let request = RpcRequest::new(method, params, id, self.auth.clone());
        self.remember(&request);

        debug!("Zabbix request #{}: {}", id, method);

        let response: RpcResponse = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json-rpc")
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Zabbix answers HTTP 200 for failed calls too; the body tells.
        if let Some(error) = response.error {
            return Err(error.into());
        }

        response.result.ok_or_else(|| {
            ZabbixError::UnexpectedResponse(format!("{} returned neither result nor error", method))
        })
    }

    fn preview(&self, method: &str, params: JsonValue) -> RpcRequest {
        RpcRequest::new(method, params, 0, self.auth.clone()).redacted()
    }

    fn last_request(&self) -> Option<RpcRequest> {
        self.last_request.lock().ok().and_then(|last| last.clone())
    }
}
