use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::info;
use serde::Deserialize;

use crate::modules::{AutomationModule, TaskReport};
use crate::utils::Task;
use crate::zabbix::configuration::{self, ExportKind, Format};
use crate::zabbix::{ZabbixError, ZabbixOperations};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ConfigurationTask {
    Export {
        kind: ExportKind,
        name: String,
        #[serde(default)]
        format: Format,
    },
    Import {
        #[serde(default)]
        format: Format,
        source: Option<String>,
        path: Option<PathBuf>,
    },
}

/// Bulk export and import through `configuration.export` / `.import`.
pub struct ZabbixConfigurationModule;

impl ZabbixConfigurationModule {
    pub fn new() -> Self {
        Self
    }

    fn parse(task: &Task) -> Result<ConfigurationTask> {
        let parsed: ConfigurationTask = serde_json::from_value(task.spec.clone())
            .map_err(|e| ZabbixError::validation(e.to_string()))
            .with_context(|| format!("Task '{}' is not a valid zabbix_configuration", task.name))?;

        if let ConfigurationTask::Import { source, path, .. } = &parsed {
            if source.is_some() == path.is_some() {
                return Err(ZabbixError::validation(format!(
                    "task '{}' must set exactly one of 'source' or 'path'",
                    task.name
                ))
                .into());
            }
        }

        Ok(parsed)
    }
}

impl Default for ZabbixConfigurationModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AutomationModule for ZabbixConfigurationModule {
    fn name(&self) -> &str {
        "zabbix_configuration"
    }

    fn validate(&self, task: &Task) -> Result<()> {
        Self::parse(task).map(|_| ())
    }

    async fn apply(
        &self,
        client: &dyn ZabbixOperations,
        task: &Task,
        check_mode: bool,
    ) -> Result<TaskReport> {
        let mut report = TaskReport::new(&task.name);

        match Self::parse(task)? {
            ConfigurationTask::Export { kind, name, format } => {
                let exported = configuration::export(client, kind, &name, format)
                    .await
                    .with_context(|| format!("Failed to export '{}'", name))?;
                report.remote_state = Some(exported);
                report.request = client.last_request();
            }
            ConfigurationTask::Import { format, source, path } => {
                let source = match (source, path) {
                    (Some(source), _) => source,
                    (None, Some(path)) => tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                    (None, None) => bail!("task '{}' has nothing to import", task.name),
                };

                if check_mode {
                    report.request = Some(
                        client.preview("configuration.import", configuration::import_params(&source, format)),
                    );
                } else {
                    report.changed = configuration::import(client, &source, format)
                        .await
                        .context("Failed to import configuration")?;
                    report.request = client.last_request();
                }
                info!("Import for task '{}' changed: {}", task.name, report.changed);
            }
        }

        Ok(report)
    }
}
