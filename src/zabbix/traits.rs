use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use super::client::RpcRequest;
use super::diff::scalar_string;
use super::error::{Result, ZabbixError};
use super::object_type::ObjectType;

/// Operations against a Zabbix JSON-RPC endpoint.
///
/// Implementors only provide the raw `call`; the typed object operations are
/// built on top of it.
#[async_trait]
pub trait ZabbixOperations: Send + Sync {
    async fn call(&self, method: &str, params: JsonValue) -> Result<JsonValue>;

    /// The request `call` would send, without sending it.
    fn preview(&self, method: &str, params: JsonValue) -> RpcRequest;

    /// Last request sent, credentials redacted.
    fn last_request(&self) -> Option<RpcRequest>;

    async fn fetch(
        &self,
        object_type: ObjectType,
        fields: &Map<String, JsonValue>,
        scope: Option<&Map<String, JsonValue>>,
    ) -> Result<Vec<Map<String, JsonValue>>> {
        let params = object_type.get_params(fields, scope)?;
        let result = self.call(&object_type.method("get"), params).await?;

        let JsonValue::Array(objects) = result else {
            return Err(ZabbixError::UnexpectedResponse(format!(
                "{} did not return a list",
                object_type.method("get")
            )));
        };

        objects
            .into_iter()
            .map(|object| match object {
                JsonValue::Object(map) => Ok(map),
                other => Err(ZabbixError::UnexpectedResponse(format!(
                    "{} returned a non-object entry: {}",
                    object_type.method("get"),
                    other
                ))),
            })
            .collect()
    }

    /// Like `fetch`, but more than one match is an error.
    async fn fetch_one(
        &self,
        object_type: ObjectType,
        fields: &Map<String, JsonValue>,
        scope: Option<&Map<String, JsonValue>>,
    ) -> Result<Option<Map<String, JsonValue>>> {
        let mut matches = self.fetch(object_type, fields, scope).await?;
        if matches.len() > 1 {
            let key = fields
                .get(object_type.unique_key())
                .map(scalar_string)
                .unwrap_or_default();
            return Err(ZabbixError::AmbiguousMatch {
                object_type: object_type.to_string(),
                key,
                count: matches.len(),
            });
        }
        Ok(matches.pop())
    }

    /// Looks up the id of the object whose unique key equals `name`.
    async fn resolve_id(&self, object_type: ObjectType, name: &str) -> Result<Option<String>> {
        let mut fields = Map::new();
        fields.insert(object_type.unique_key().to_string(), JsonValue::String(name.to_string()));

        self.fetch_one(object_type, &fields, None)
            .await?
            .map(|object| remote_identifier(object_type, &object))
            .transpose()
    }

    async fn create(&self, object_type: ObjectType, fields: Map<String, JsonValue>) -> Result<String> {
        let (method, params) = object_type.create_request(fields);
        let result = self.call(&method, params).await?;
        first_id(object_type, &result)
    }

    async fn update(&self, object_type: ObjectType, fields: Map<String, JsonValue>) -> Result<String> {
        let (method, params) = object_type.update_request(fields);
        let result = self.call(&method, params).await?;
        first_id(object_type, &result)
    }

    async fn delete(&self, object_type: ObjectType, identifier: &str) -> Result<()> {
        let (method, params) = object_type.delete_request(identifier);
        self.call(&method, params).await?;
        Ok(())
    }
}

/// Extracts the id from a `{"<type>ids": ["42"]}` mutation result.
pub fn first_id(object_type: ObjectType, result: &JsonValue) -> Result<String> {
    let ids_field = object_type.ids_field();
    match result.get(&ids_field).and_then(|ids| ids.get(0)) {
        Some(JsonValue::String(id)) => Ok(id.clone()),
        Some(JsonValue::Number(id)) => Ok(id.to_string()),
        _ => Err(ZabbixError::UnexpectedResponse(format!(
            "missing '{}' in {} result",
            ids_field, object_type
        ))),
    }
}

/// Reads the identifier field of a fetched object.
pub fn remote_identifier(object_type: ObjectType, object: &Map<String, JsonValue>) -> Result<String> {
    match object.get(object_type.id_field()) {
        Some(JsonValue::String(id)) => Ok(id.clone()),
        Some(JsonValue::Number(id)) => Ok(id.to_string()),
        _ => Err(ZabbixError::UnexpectedResponse(format!(
            "{} object without '{}'",
            object_type,
            object_type.id_field()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remote_identifier() {
        let object = json!({"groupid": "9", "name": "Linux servers"});
        assert_eq!(
            remote_identifier(ObjectType::HostGroup, object.as_object().unwrap()).unwrap(),
            "9"
        );

        let object = json!({"name": "Linux servers"});
        assert!(remote_identifier(ObjectType::HostGroup, object.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_first_id() {
        let result = json!({"groupids": ["42"]});
        assert_eq!(first_id(ObjectType::HostGroup, &result).unwrap(), "42");

        let result = json!({"itemids": [30060]});
        assert_eq!(first_id(ObjectType::Item, &result).unwrap(), "30060");
    }

    #[test]
    fn test_first_id_missing() {
        let err = first_id(ObjectType::Template, &json!({"hostids": ["1"]})).unwrap_err();
        assert!(matches!(err, ZabbixError::UnexpectedResponse(_)));
        assert!(err.to_string().contains("templateids"));
    }
}
