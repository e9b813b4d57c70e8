use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::error::ZabbixError;

/// Field names Zabbix reads back under a different name than the one
/// accepted on create/update. Pairs are `(read name, write name)`.
pub const READ_WRITE_ALIASES: &[(&str, &str)] = &[("parentTemplates", "templates")];

/// Nested collections `<type>.get` leaves out unless asked for. Pairs are
/// `(desired field, get parameter, requested output)`.
const NESTED_SELECTS: &[(&str, &str, &str)] = &[
    ("groups", "selectGroups", "groupid"),
    ("templates", "selectParentTemplates", "templateid"),
    ("interfaces", "selectInterfaces", "extend"),
    ("hosts", "selectHosts", "hostid"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    HostGroup,
    Template,
    Item,
    Trigger,
    Host,
    User,
}

impl ObjectType {
    pub const ALL: [ObjectType; 6] = [
        ObjectType::HostGroup,
        ObjectType::Template,
        ObjectType::Item,
        ObjectType::Trigger,
        ObjectType::Host,
        ObjectType::User,
    ];

    /// Prefix of the JSON-RPC methods for this type, e.g. `template` in
    /// `template.get`.
    pub fn api_name(&self) -> &'static str {
        match self {
            ObjectType::HostGroup => "hostgroup",
            ObjectType::Template => "template",
            ObjectType::Item => "item",
            ObjectType::Trigger => "trigger",
            ObjectType::Host => "host",
            ObjectType::User => "user",
        }
    }

    pub fn unique_key(&self) -> &'static str {
        match self {
            ObjectType::HostGroup => "name",
            ObjectType::Template => "host",
            ObjectType::Item => "name",
            ObjectType::Trigger => "description",
            ObjectType::Host => "host",
            ObjectType::User => "alias",
        }
    }

    // hostgroup is the odd one out: its id is "groupid", not "hostgroupid"
    pub fn id_field(&self) -> &'static str {
        match self {
            ObjectType::HostGroup => "groupid",
            ObjectType::Template => "templateid",
            ObjectType::Item => "itemid",
            ObjectType::Trigger => "triggerid",
            ObjectType::Host => "hostid",
            ObjectType::User => "userid",
        }
    }

    /// Key holding the list of ids in create/update/delete responses.
    pub fn ids_field(&self) -> String {
        format!("{}s", self.id_field())
    }

    pub fn method(&self, verb: &str) -> String {
        format!("{}.{}", self.api_name(), verb)
    }

    /// Value of the unique key in `fields`. A missing or null key cannot be
    /// looked up.
    pub fn unique_value<'a>(&self, fields: &'a Map<String, JsonValue>) -> Result<&'a JsonValue, ZabbixError> {
        let key = self.unique_key();
        fields.get(key).filter(|v| !v.is_null()).ok_or_else(|| {
            ZabbixError::validation(format!("{} fields must contain unique key '{}'", self, key))
        })
    }

    pub fn create_request(&self, fields: Map<String, JsonValue>) -> (String, JsonValue) {
        (self.method("create"), JsonValue::Object(fields))
    }

    /// `fields` must already carry the id field.
    pub fn update_request(&self, fields: Map<String, JsonValue>) -> (String, JsonValue) {
        (self.method("update"), JsonValue::Object(fields))
    }

    /// `<type>.delete` takes a bare list of ids.
    pub fn delete_request(&self, identifier: &str) -> (String, JsonValue) {
        (self.method("delete"), JsonValue::Array(vec![JsonValue::String(identifier.to_string())]))
    }

    /// Builds the `<type>.get` params looking up `fields` by unique key.
    ///
    /// `scope` is merged into the filter as-is. Nested collections referenced
    /// by `fields` are requested so that they can be compared afterwards.
    pub fn get_params(
        &self,
        fields: &Map<String, JsonValue>,
        scope: Option<&Map<String, JsonValue>>,
    ) -> Result<JsonValue, ZabbixError> {
        let value = self.unique_value(fields)?;

        let mut filter = Map::new();
        filter.insert(self.unique_key().to_string(), value.clone());
        if let Some(scope) = scope {
            filter.extend(scope.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(hostid) = fields.get("hostid") {
            filter.insert("hostid".to_string(), hostid.clone());
        }

        let mut params = Map::new();
        params.insert("filter".to_string(), JsonValue::Object(filter));

        for (field, select, output) in NESTED_SELECTS {
            if fields.contains_key(*field) {
                params.insert(select.to_string(), JsonValue::String(output.to_string()));
            }
        }

        if *self == ObjectType::Trigger {
            params.insert("expandExpression".to_string(), JsonValue::Bool(true));
            params.insert("templated".to_string(), JsonValue::Bool(true));
        }

        Ok(JsonValue::Object(params))
    }
}

/// Renames fields of a fetched object to the names used when writing it.
pub fn apply_read_aliases(mut object: Map<String, JsonValue>) -> Map<String, JsonValue> {
    for (read, write) in READ_WRITE_ALIASES {
        if let Some(value) = object.remove(*read) {
            object.insert(write.to_string(), value);
        }
    }
    object
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

impl FromStr for ObjectType {
    type Err = ZabbixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectType::ALL
            .iter()
            .copied()
            .find(|t| t.api_name() == s)
            .ok_or_else(|| ZabbixError::validation(format!("unsupported object type '{}'", s)))
    }
}
