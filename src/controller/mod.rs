use anyhow::{anyhow, Result};
use log::{error, info};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

use crate::modules::{AutomationModule, TaskReport, ZabbixConfigurationModule, ZabbixObjectModule};
use crate::utils::Task;
use crate::zabbix::ZabbixOperations;

/// Modules known to the controller, keyed by the name tasks refer to them by.
#[derive(Default, Clone)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn AutomationModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every module of this crate.
    pub fn with_default_modules() -> Self {
        let mut registry = Self::new();
        registry.register_module(Arc::new(ZabbixObjectModule::new()));
        registry.register_module(Arc::new(ZabbixConfigurationModule::new()));
        registry
    }

    pub fn register_module(&mut self, module: Arc<dyn AutomationModule>) {
        let name = module.name().to_string();
        self.modules.insert(name, module);
    }

    fn select_module(&self, task: &Task) -> Result<Arc<dyn AutomationModule>> {
        self.modules
            .get(&task.module)
            .cloned()
            .ok_or_else(|| anyhow!("No module named '{}' for task '{}'", task.module, task.name))
    }

    /// Checks every task without talking to Zabbix, so that a typo in the
    /// last task does not leave the first ones applied.
    pub fn validate(&self, tasks: &[Task]) -> Result<()> {
        for task in tasks {
            let module = self.select_module(task)?;
            module.validate(task)?;
        }
        Ok(())
    }
}

/// Runs tasks one after the other against a single Zabbix session.
pub struct Controller {
    client: Box<dyn ZabbixOperations>,
    modules: ModuleRegistry,
    check_mode: bool,
}

impl Controller {
    pub fn new(client: Box<dyn ZabbixOperations>, modules: ModuleRegistry) -> Self {
        Self {
            client,
            modules,
            check_mode: false,
        }
    }

    /// Controller with every module of this crate registered.
    pub fn with_default_modules(client: Box<dyn ZabbixOperations>) -> Self {
        Self::new(client, ModuleRegistry::with_default_modules())
    }

    pub fn check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    pub fn validate(&self, tasks: &[Task]) -> Result<()> {
        self.modules.validate(tasks)
    }

    #[instrument(skip(self, task), fields(task_name = %task.name))]
    pub async fn run_task(&self, task: &Task) -> Result<TaskReport> {
        let module = self.modules.select_module(task)?;
        info!("Running task '{}' with module {}", task.name, module.name());

        module.apply(self.client.as_ref(), task, self.check_mode).await
    }

    /// Runs `tasks` in order and stops at the first failure. The failed task
    /// is the last report; tasks after it are not attempted.
    pub async fn run(&self, tasks: &[Task]) -> Vec<TaskReport> {
        if let Err(e) = self.validate(tasks) {
            error!("Task file rejected: {:#}", e);
            return vec![TaskReport::failed("validation", &e)];
        }

        let mut reports = Vec::with_capacity(tasks.len());
        for task in tasks {
            match self.run_task(task).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!("Task '{}' failed: {:#}", task.name, e);
                    reports.push(TaskReport::failed(&task.name, &e));
                    break;
                }
            }
        }

        reports
    }
}
