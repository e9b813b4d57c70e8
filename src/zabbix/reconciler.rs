use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::instrument;

use super::client::RpcRequest;
use super::diff;
use super::error::{Result, ZabbixError};
use super::object_type::{apply_read_aliases, ObjectType};
use super::traits::{remote_identifier, ZabbixOperations};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredState {
    #[default]
    Present,
    Absent,
}

/// One Zabbix object as the caller wants it to be.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredObject {
    #[serde(alias = "object_type", alias = "api")]
    pub object_type: ObjectType,
    #[serde(alias = "api_args")]
    pub fields: Map<String, JsonValue>,
    #[serde(default, alias = "declared_state", alias = "state")]
    pub declared_state: DeclaredState,
    #[serde(default, alias = "scope_filter", skip_serializing_if = "Option::is_none")]
    pub scope_filter: Option<Map<String, JsonValue>>,
    /// Name of the template the object belongs to. Resolved to a `hostid`
    /// scope before lookup.
    #[serde(default, alias = "template_name", skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl DesiredObject {
    pub fn new(object_type: ObjectType, fields: Map<String, JsonValue>, declared_state: DeclaredState) -> Self {
        Self {
            object_type,
            fields,
            declared_state,
            scope_filter: None,
            template: None,
        }
    }

    pub fn unique_value(&self) -> Option<&JsonValue> {
        self.object_type.unique_value(&self.fields).ok()
    }

    pub fn validate(&self) -> Result<()> {
        self.object_type.unique_value(&self.fields).map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    NoOp { identifier: Option<String> },
    Create { fields: Map<String, JsonValue> },
    Update { identifier: String, fields: Map<String, JsonValue> },
    Delete { identifier: String },
}

impl Decision {
    pub fn is_change(&self) -> bool {
        !matches!(self, Decision::NoOp { .. })
    }

    pub fn action(&self) -> &'static str {
        match self {
            Decision::NoOp { .. } => "noop",
            Decision::Create { .. } => "create",
            Decision::Update { .. } => "update",
            Decision::Delete { .. } => "delete",
        }
    }

    /// Method and params of the call carrying out this decision.
    pub fn request(&self, object_type: ObjectType) -> Option<(String, JsonValue)> {
        match self {
            Decision::NoOp { .. } => None,
            Decision::Create { fields } => Some(object_type.create_request(fields.clone())),
            Decision::Update { fields, .. } => Some(object_type.update_request(fields.clone())),
            Decision::Delete { identifier } => Some(object_type.delete_request(identifier)),
        }
    }
}

/// Decides what to do given the remote object, if one was found.
///
/// `remote` is expected to have gone through `apply_read_aliases`. An update
/// carries only the changed fields, plus the unique key and the identifier
/// which Zabbix requires on every update. Changed lists are sent whole.
pub fn plan(desired: &DesiredObject, remote: Option<&Map<String, JsonValue>>) -> Result<Decision> {
    let object_type = desired.object_type;

    match (desired.declared_state, remote) {
        (DeclaredState::Absent, None) => Ok(Decision::NoOp { identifier: None }),
        (DeclaredState::Absent, Some(current)) => Ok(Decision::Delete {
            identifier: remote_identifier(object_type, current)?,
        }),
        (DeclaredState::Present, None) => Ok(Decision::Create {
            fields: desired.fields.clone(),
        }),
        (DeclaredState::Present, Some(current)) => {
            let identifier = remote_identifier(object_type, current)?;
            let comparison = diff::compare(current, &desired.fields);
            if !comparison.is_different() {
                return Ok(Decision::NoOp {
                    identifier: Some(identifier),
                });
            }

            let mut fields = comparison.changed_fields(&desired.fields);
            if let Some(value) = desired.unique_value() {
                fields.insert(object_type.unique_key().to_string(), value.clone());
            }
            fields.insert(
                object_type.id_field().to_string(),
                JsonValue::String(identifier.clone()),
            );

            Ok(Decision::Update { identifier, fields })
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub changed: bool,
    pub action: &'static str,
    pub identifier: Option<String>,
    /// Remote object as fetched, before any change was applied.
    pub remote_state: Option<JsonValue>,
    pub request: Option<RpcRequest>,
}

pub struct Reconciler<'a> {
    client: &'a dyn ZabbixOperations,
    check_mode: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(client: &'a dyn ZabbixOperations) -> Self {
        Self {
            client,
            check_mode: false,
        }
    }

    /// Plan without sending create, update or delete calls.
    pub fn check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    async fn resolve_scope(&self, desired: &DesiredObject) -> Result<Option<Map<String, JsonValue>>> {
        let mut scope = desired.scope_filter.clone();

        if let Some(template) = &desired.template {
            let templateid = self
                .client
                .resolve_id(ObjectType::Template, template)
                .await?
                .ok_or_else(|| ZabbixError::validation(format!("template '{}' not found", template)))?;

            scope
                .get_or_insert_with(Map::new)
                .insert("hostid".to_string(), JsonValue::String(templateid));
        }

        Ok(scope)
    }

    #[instrument(skip(self, desired), fields(object_type = %desired.object_type))]
    pub async fn reconcile(&self, desired: &DesiredObject) -> Result<ReconcileOutcome> {
        desired.validate()?;

        let object_type = desired.object_type;
        let scope = self.resolve_scope(desired).await?;
        let remote = self
            .client
            .fetch_one(object_type, &desired.fields, scope.as_ref())
            .await?
            .map(apply_read_aliases);

        let decision = plan(desired, remote.as_ref())?;
        info!(
            "{} '{}': {}",
            object_type,
            desired.unique_value().map(diff::scalar_string).unwrap_or_default(),
            decision.action()
        );

        let mut request = None;
        let identifier = match &decision {
            Decision::NoOp { identifier } => identifier.clone(),
            _ if self.check_mode => {
                request = decision
                    .request(object_type)
                    .map(|(method, params)| self.client.preview(&method, params));
                match &decision {
                    Decision::Update { identifier, .. } | Decision::Delete { identifier } => {
                        Some(identifier.clone())
                    }
                    _ => None,
                }
            }
            Decision::Create { fields } => Some(self.client.create(object_type, fields.clone()).await?),
            Decision::Update { fields, .. } => Some(self.client.update(object_type, fields.clone()).await?),
            Decision::Delete { identifier } => {
                self.client.delete(object_type, identifier).await?;
                Some(identifier.clone())
            }
        };

        Ok(ReconcileOutcome {
            changed: decision.is_change(),
            action: decision.action(),
            identifier,
            remote_state: remote.map(JsonValue::Object),
            request: request.or_else(|| self.client.last_request()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zabbix::testing::FakeZabbix;
    use serde_json::json;

    fn map(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap()
    }

    fn desired(object_type: ObjectType, fields: JsonValue, state: DeclaredState) -> DesiredObject {
        DesiredObject::new(object_type, map(fields), state)
    }

    #[test]
    fn test_plan_absent_without_remote_is_noop() {
        let d = desired(ObjectType::HostGroup, json!({"name": "db"}), DeclaredState::Absent);
        assert_eq!(plan(&d, None).unwrap(), Decision::NoOp { identifier: None });
    }

    #[test]
    fn test_plan_absent_with_remote_deletes() {
        let d = desired(ObjectType::HostGroup, json!({"name": "db"}), DeclaredState::Absent);
        let remote = map(json!({"groupid": "42", "name": "db"}));

        assert_eq!(
            plan(&d, Some(&remote)).unwrap(),
            Decision::Delete { identifier: "42".to_string() }
        );
    }

    #[test]
    fn test_plan_present_without_remote_creates_with_desired_fields() {
        let d = desired(
            ObjectType::Template,
            json!({"host": "tmpl-A", "groups": [{"groupid": "9"}]}),
            DeclaredState::Present,
        );

        assert_eq!(
            plan(&d, None).unwrap(),
            Decision::Create { fields: d.fields.clone() }
        );
    }

    #[test]
    fn test_plan_identical_remote_is_noop_with_identifier() {
        let d = desired(ObjectType::Template, json!({"host": "tmpl-A", "status": 0}), DeclaredState::Present);
        let remote = map(json!({"templateid": "10001", "host": "tmpl-A", "status": "0", "name": "A"}));

        assert_eq!(
            plan(&d, Some(&remote)).unwrap(),
            Decision::NoOp { identifier: Some("10001".to_string()) }
        );
    }

    #[test]
    fn test_plan_update_sends_changed_fields_key_and_id() {
        let d = desired(
            ObjectType::Item,
            json!({"name": "load", "delay": "60", "units": "%", "groups": [{"groupid": "9"}, {"groupid": "2"}]}),
            DeclaredState::Present,
        );
        let remote = map(json!({
            "itemid": "30060",
            "name": "load",
            "delay": "30",
            "units": "%",
            "key_": "system.cpu.load",
            "groups": [{"groupid": "9"}],
        }));

        let Decision::Update { identifier, fields } = plan(&d, Some(&remote)).unwrap() else {
            panic!("expected an update");
        };
        assert_eq!(identifier, "30060");
        assert_eq!(
            fields,
            map(json!({
                "name": "load",
                "itemid": "30060",
                "delay": "60",
                "groups": [{"groupid": "9"}, {"groupid": "2"}],
            }))
        );
    }

    #[test]
    fn test_plan_remote_without_identifier_fails() {
        let d = desired(ObjectType::HostGroup, json!({"name": "db"}), DeclaredState::Absent);
        let remote = map(json!({"name": "db"}));
        assert!(matches!(
            plan(&d, Some(&remote)),
            Err(ZabbixError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_desired_object_from_task_keys() {
        let d: DesiredObject = serde_yaml::from_str(
            "object_type: template\nfields:\n  host: tmpl-A\nstate: absent\ntemplate_name: base\n",
        )
        .unwrap();
        assert_eq!(d.object_type, ObjectType::Template);
        assert_eq!(d.declared_state, DeclaredState::Absent);
        assert_eq!(d.template.as_deref(), Some("base"));

        let d: DesiredObject = serde_json::from_value(json!({
            "objectType": "hostgroup",
            "fields": {"name": "db"},
            "scopeFilter": {"hostid": "1"},
        }))
        .unwrap();
        assert_eq!(d.declared_state, DeclaredState::Present);
        assert!(d.scope_filter.is_some());
    }

    #[tokio::test]
    async fn test_reconcile_creates_missing_hostgroup() {
        let zbx = FakeZabbix::new().respond("hostgroup.create", json!({"groupids": ["42"]}));
        let d = desired(ObjectType::HostGroup, json!({"name": "db-servers"}), DeclaredState::Present);

        let outcome = Reconciler::new(&zbx).reconcile(&d).await.unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.action, "create");
        assert_eq!(outcome.identifier.as_deref(), Some("42"));
        assert!(outcome.remote_state.is_none());
        assert_eq!(zbx.methods(), vec!["hostgroup.get", "hostgroup.create"]);
        assert_eq!(zbx.calls()[1].params, json!({"name": "db-servers"}));
    }

    #[tokio::test]
    async fn test_reconcile_aliased_templates_unchanged() {
        let zbx = FakeZabbix::new().respond(
            "template.get",
            json!([{
                "templateid": "10001",
                "host": "tmpl-A",
                "groups": [{"groupid": "9"}],
                "parentTemplates": [{"templateid": "10050"}],
            }]),
        );
        let d = desired(
            ObjectType::Template,
            json!({"host": "tmpl-A", "groups": [{"groupid": "9"}], "templates": [{"templateid": "10050"}]}),
            DeclaredState::Present,
        );

        let outcome = Reconciler::new(&zbx).reconcile(&d).await.unwrap();

        assert!(!outcome.changed);
        assert_eq!(outcome.identifier.as_deref(), Some("10001"));
        assert_eq!(zbx.methods(), vec!["template.get"]);

        let remote_state = outcome.remote_state.unwrap();
        assert!(remote_state.get("templates").is_some());
        assert!(remote_state.get("parentTemplates").is_none());
    }

    #[tokio::test]
    async fn test_reconcile_deletes_by_identifier() {
        let zbx = FakeZabbix::new()
            .respond("user.get", json!([{"userid": "3", "alias": "guest"}]))
            .respond("user.delete", json!({"userids": ["3"]}));
        let d = desired(ObjectType::User, json!({"alias": "guest"}), DeclaredState::Absent);

        let outcome = Reconciler::new(&zbx).reconcile(&d).await.unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.identifier.as_deref(), Some("3"));
        assert_eq!(zbx.calls()[1].params, json!(["3"]));
    }

    #[tokio::test]
    async fn test_reconcile_absent_and_missing_is_noop() {
        let zbx = FakeZabbix::new();
        let d = desired(ObjectType::User, json!({"alias": "guest"}), DeclaredState::Absent);

        let outcome = Reconciler::new(&zbx).reconcile(&d).await.unwrap();

        assert!(!outcome.changed);
        assert!(outcome.identifier.is_none());
        assert_eq!(zbx.methods(), vec!["user.get"]);
    }

    #[tokio::test]
    async fn test_reconcile_missing_unique_key_makes_no_call() {
        let zbx = FakeZabbix::new();
        let d = desired(ObjectType::Template, json!({}), DeclaredState::Present);

        let err = Reconciler::new(&zbx).reconcile(&d).await.unwrap_err();

        assert!(matches!(err, ZabbixError::Validation(_)));
        assert!(zbx.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_rejects_ambiguous_match() {
        let zbx = FakeZabbix::new().respond(
            "item.get",
            json!([{"itemid": "1", "name": "load"}, {"itemid": "2", "name": "load"}]),
        );
        let d = desired(ObjectType::Item, json!({"name": "load"}), DeclaredState::Present);

        let err = Reconciler::new(&zbx).reconcile(&d).await.unwrap_err();
        assert!(matches!(err, ZabbixError::AmbiguousMatch { count: 2, .. }));
    }

    #[tokio::test]
    async fn test_reconcile_scopes_lookup_to_template() {
        let zbx = FakeZabbix::new()
            .respond("template.get", json!([{"templateid": "10105", "host": "tmpl-A"}]))
            .respond("item.get", json!([{"itemid": "7", "name": "load", "delay": "30"}]));
        let mut d = desired(ObjectType::Item, json!({"name": "load", "delay": "30"}), DeclaredState::Present);
        d.template = Some("tmpl-A".to_string());

        let outcome = Reconciler::new(&zbx).reconcile(&d).await.unwrap();

        assert!(!outcome.changed);
        let calls = zbx.calls();
        assert_eq!(calls[0].params["filter"], json!({"host": "tmpl-A"}));
        assert_eq!(calls[1].params["filter"], json!({"name": "load", "hostid": "10105"}));
    }

    #[tokio::test]
    async fn test_reconcile_unknown_template_fails() {
        let zbx = FakeZabbix::new();
        let mut d = desired(ObjectType::Item, json!({"name": "load"}), DeclaredState::Present);
        d.template = Some("missing".to_string());

        let err = Reconciler::new(&zbx).reconcile(&d).await.unwrap_err();
        assert!(err.to_string().contains("template 'missing' not found"));
    }

    #[tokio::test]
    async fn test_reconcile_check_mode_sends_nothing() {
        let zbx = FakeZabbix::new().respond(
            "hostgroup.get",
            json!([{"groupid": "42", "name": "db"}]),
        );
        let d = desired(ObjectType::HostGroup, json!({"name": "db"}), DeclaredState::Absent);

        let outcome = Reconciler::new(&zbx).check_mode(true).reconcile(&d).await.unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.identifier.as_deref(), Some("42"));
        assert_eq!(zbx.methods(), vec!["hostgroup.get"]);

        let request = outcome.request.unwrap();
        assert_eq!(request.method, "hostgroup.delete");
        assert_eq!(request.id, 0);
    }

    #[tokio::test]
    async fn test_check_mode_preview_matches_sent_update() {
        let remote = json!([{"templateid": "10001", "host": "tmpl-A", "description": "old"}]);
        let d = desired(
            ObjectType::Template,
            json!({"host": "tmpl-A", "description": "new"}),
            DeclaredState::Present,
        );

        let checked = FakeZabbix::new().respond("template.get", remote.clone());
        let preview = Reconciler::new(&checked)
            .check_mode(true)
            .reconcile(&d)
            .await
            .unwrap()
            .request
            .unwrap();

        let applied = FakeZabbix::new()
            .respond("template.get", remote)
            .respond("template.update", json!({"templateids": ["10001"]}));
        Reconciler::new(&applied).reconcile(&d).await.unwrap();
        let sent = applied.calls().pop().unwrap();

        assert_eq!(preview.method, sent.method);
        assert_eq!(preview.params, sent.params);
    }

    #[tokio::test]
    async fn test_reconcile_surfaces_api_error() {
        let zbx = FakeZabbix::new().fail("hostgroup.create", "No permissions.");
        let d = desired(ObjectType::HostGroup, json!({"name": "db"}), DeclaredState::Present);

        let err = Reconciler::new(&zbx).reconcile(&d).await.unwrap_err();
        assert!(matches!(err, ZabbixError::RemoteApi { .. }));
        assert!(err.to_string().contains("No permissions."));
    }
}
