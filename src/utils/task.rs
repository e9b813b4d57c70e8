use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One entry of a task file: a name and the spec handed to the module.
///
/// ```yaml
/// - name: Database host group
///   zabbix_object:
///     object_type: hostgroup
///     fields: { name: db-servers }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub module: String,
    pub spec: JsonValue,
}

impl Task {
    pub fn new(name: &str, module: &str, spec: JsonValue) -> Self {
        Self {
            name: name.to_string(),
            module: module.to_string(),
            spec,
        }
    }

    /// Reads one task entry. Every key other than `name` names the module;
    /// there must be exactly one.
    pub fn from_yaml(entry: &serde_yaml::Value, position: usize) -> Result<Self> {
        let serde_yaml::Value::Mapping(map) = entry else {
            bail!("Task #{} is not a mapping", position + 1);
        };

        let mut name = None;
        let mut module = None;

        for (key, value) in map {
            let serde_yaml::Value::String(key) = key else {
                bail!("Task #{} has a non-string key", position + 1);
            };

            if key == "name" {
                name = value.as_str().map(str::to_string);
                continue;
            }

            if module.is_some() {
                bail!("Task #{} names more than one module", position + 1);
            }

            let spec = serde_json::to_value(value)
                .with_context(|| format!("Task #{} spec is not valid JSON", position + 1))?;
            module = Some((key.clone(), spec));
        }

        let (module, spec) = module.ok_or_else(|| anyhow!("Task #{} names no module", position + 1))?;
        let name = name.unwrap_or_else(|| format!("{} #{}", module, position + 1));

        Ok(Self { name, module, spec })
    }
}

pub fn parse_tasks(contents: &str) -> Result<Vec<Task>> {
    let entries: Vec<serde_yaml::Value> =
        serde_yaml::from_str(contents).context("Task file must be a YAML list")?;

    entries
        .iter()
        .enumerate()
        .map(|(position, entry)| Task::from_yaml(entry, position))
        .collect()
}

pub fn load_tasks<P: AsRef<Path>>(path: P) -> Result<Vec<Task>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read task file {}", path.display()))?;
    parse_tasks(&contents)
}
