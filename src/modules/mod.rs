pub mod zabbix_configuration;
pub mod zabbix_object;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::utils::Task;
use crate::zabbix::{RpcRequest, ZabbixOperations};

pub use zabbix_configuration::ZabbixConfigurationModule;
pub use zabbix_object::ZabbixObjectModule;

/// What a task did, as reported back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    pub name: String,
    pub changed: bool,
    pub identifier: Option<String>,
    pub remote_state: Option<JsonValue>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RpcRequest>,
}

impl TaskReport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            changed: false,
            identifier: None,
            remote_state: None,
            error: None,
            request: None,
        }
    }

    pub fn failed(name: &str, error: &anyhow::Error) -> Self {
        Self {
            error: Some(format!("{:#}", error)),
            ..Self::new(name)
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

#[async_trait]
pub trait AutomationModule: Send + Sync {
    fn name(&self) -> &str;

    /// Rejects a malformed spec before any call to Zabbix.
    fn validate(&self, task: &Task) -> Result<()>;

    async fn apply(
        &self,
        client: &dyn ZabbixOperations,
        task: &Task,
        check_mode: bool,
    ) -> Result<TaskReport>;
}
