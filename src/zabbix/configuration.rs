//! `configuration.export` and `configuration.import`.
//!
//! Handy for templates too large to describe object by object.

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use super::error::{Result, ZabbixError};
use super::object_type::ObjectType;
use super::traits::ZabbixOperations;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Xml,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
        }
    }
}

/// Kinds of objects `configuration.export` accepts by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Template,
    Host,
    #[serde(alias = "group")]
    HostGroup,
}

impl ExportKind {
    fn object_type(&self) -> ObjectType {
        match self {
            ExportKind::Template => ObjectType::Template,
            ExportKind::Host => ObjectType::Host,
            ExportKind::HostGroup => ObjectType::HostGroup,
        }
    }

    /// Key of the id list in the export `options`.
    fn option_key(&self) -> &'static str {
        match self {
            ExportKind::Template => "templates",
            ExportKind::Host => "hosts",
            ExportKind::HostGroup => "groups",
        }
    }
}

const FULL_SYNC: &[&str] = &[
    "applications",
    "items",
    "triggers",
    "graphs",
    "httptests",
    "templateScreens",
];
const CREATE_OR_UPDATE: &[&str] = &[
    "templates",
    "hosts",
    "images",
    "maps",
    "screens",
    "valueMaps",
];
const CREATE_ONLY: &[&str] = &["groups", "templateLinkage"];

/// Import rules: what the frontend import wizard enables by default.
pub fn import_rules() -> JsonValue {
    let mut rules = serde_json::Map::new();

    for name in FULL_SYNC {
        rules.insert(
            name.to_string(),
            json!({"createMissing": true, "updateExisting": true, "deleteMissing": true}),
        );
    }
    for name in CREATE_OR_UPDATE {
        rules.insert(
            name.to_string(),
            json!({"createMissing": true, "updateExisting": true}),
        );
    }
    for name in CREATE_ONLY {
        rules.insert(name.to_string(), json!({"createMissing": true}));
    }

    JsonValue::Object(rules)
}

pub fn import_params(source: &str, format: Format) -> JsonValue {
    json!({
        "format": format.as_str(),
        "source": source,
        "rules": import_rules(),
    })
}

/// Exports the object named `name` and returns the exported document.
pub async fn export(
    client: &dyn ZabbixOperations,
    kind: ExportKind,
    name: &str,
    format: Format,
) -> Result<JsonValue> {
    let object_type = kind.object_type();
    let id = client
        .resolve_id(object_type, name)
        .await?
        .ok_or_else(|| ZabbixError::validation(format!("{} '{}' not found", object_type, name)))?;

    info!("Exporting {} '{}' ({})", object_type, name, id);

    let mut options = serde_json::Map::new();
    options.insert(kind.option_key().to_string(), json!([id]));

    client
        .call(
            "configuration.export",
            json!({"format": format.as_str(), "options": options}),
        )
        .await
}

/// Imports `source` and reports whether Zabbix changed anything.
pub async fn import(client: &dyn ZabbixOperations, source: &str, format: Format) -> Result<bool> {
    let result = client
        .call("configuration.import", import_params(source, format))
        .await?;

    match result {
        JsonValue::Bool(changed) => Ok(changed),
        other => Err(ZabbixError::UnexpectedResponse(format!(
            "configuration.import returned {}",
            other
        ))),
    }
}
