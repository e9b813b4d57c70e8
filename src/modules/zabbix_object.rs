use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;

use crate::modules::{AutomationModule, TaskReport};
use crate::utils::Task;
use crate::zabbix::{DesiredObject, Reconciler, ZabbixError, ZabbixOperations};

/// Creates, updates or deletes a single Zabbix object.
pub struct ZabbixObjectModule;

impl ZabbixObjectModule {
    pub fn new() -> Self {
        Self
    }

    fn desired(task: &Task) -> Result<DesiredObject> {
        let desired: DesiredObject = serde_json::from_value(task.spec.clone())
            .map_err(|e| ZabbixError::validation(e.to_string()))
            .with_context(|| format!("Task '{}' is not a valid zabbix_object", task.name))?;
        desired.validate()?;
        Ok(desired)
    }
}

impl Default for ZabbixObjectModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AutomationModule for ZabbixObjectModule {
    fn name(&self) -> &str {
        "zabbix_object"
    }

    fn validate(&self, task: &Task) -> Result<()> {
        Self::desired(task).map(|_| ())
    }

    async fn apply(
        &self,
        client: &dyn ZabbixOperations,
        task: &Task,
        check_mode: bool,
    ) -> Result<TaskReport> {
        let desired = Self::desired(task)?;

        let outcome = Reconciler::new(client)
            .check_mode(check_mode)
            .reconcile(&desired)
            .await
            .with_context(|| format!("Failed to reconcile {} for task '{}'", desired.object_type, task.name))?;

        info!("Task '{}' {}", task.name, if outcome.changed { "changed" } else { "ok" });

        Ok(TaskReport {
            changed: outcome.changed,
            identifier: outcome.identifier,
            remote_state: outcome.remote_state,
            request: outcome.request,
            ..TaskReport::new(&task.name)
        })
    }
}
