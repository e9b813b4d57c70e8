//! Field comparison between a desired object and the object Zabbix holds.
//!
//! The comparison is one-directional: only fields named by the desired
//! object are looked at, so fields Zabbix fills in on its own never cause an
//! update.

use std::collections::BTreeSet;

use serde_json::{Map, Value as JsonValue};

/// Outcome of comparing a desired object against the current remote one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    changed: BTreeSet<String>,
}

impl Comparison {
    pub fn is_different(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Top-level desired keys whose value differs from the remote object.
    pub fn changed_keys(&self) -> &BTreeSet<String> {
        &self.changed
    }

    /// Desired values for the changed keys only.
    pub fn changed_fields(&self, desired: &Map<String, JsonValue>) -> Map<String, JsonValue> {
        self.changed
            .iter()
            .filter_map(|k| desired.get(k).map(|v| (k.clone(), v.clone())))
            .collect()
    }
}

pub fn compare(current: &Map<String, JsonValue>, desired: &Map<String, JsonValue>) -> Comparison {
    let changed = desired
        .iter()
        .filter(|(key, value)| match current.get(key.as_str()) {
            Some(existing) => values_differ(existing, value),
            None => true,
        })
        .map(|(key, _)| key.clone())
        .collect();

    Comparison { changed }
}

fn values_differ(current: &JsonValue, desired: &JsonValue) -> bool {
    match (current, desired) {
        (JsonValue::Object(current), JsonValue::Object(desired)) => {
            compare(current, desired).is_different()
        }
        (JsonValue::Array(current), JsonValue::Array(desired)) => lists_differ(current, desired),
        (_, JsonValue::Object(_)) | (_, JsonValue::Array(_)) => true,
        (current, desired) => scalar_string(current) != scalar_string(desired),
    }
}

fn lists_differ(current: &[JsonValue], desired: &[JsonValue]) -> bool {
    if current.len() != desired.len() {
        return true;
    }

    let field = sort_field(desired);
    sorted(current, field)
        .into_iter()
        .zip(sorted(desired, field))
        .any(|(current, desired)| values_differ(current, desired))
}

/// Zabbix answers every scalar as a string, whatever type was sent.
pub fn scalar_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Field mapping elements are sorted on: the first field of the first desired
/// element. Zabbix may answer with more fields per element than were asked
/// for, so the desired side decides.
fn sort_field(desired: &[JsonValue]) -> Option<&str> {
    desired
        .first()
        .and_then(JsonValue::as_object)
        .and_then(|map| map.keys().next())
        .map(String::as_str)
}

/// Value an element is sorted on: the element itself when scalar, the value
/// under `field` of a mapping.
fn sort_value(element: &JsonValue, field: Option<&str>) -> Option<String> {
    match element {
        JsonValue::Object(map) => field
            .and_then(|field| map.get(field))
            .and_then(|value| sort_value(value, None)),
        JsonValue::Array(_) => None,
        scalar => Some(scalar_string(scalar)),
    }
}

/// Orders the elements of a list so that two lists holding the same members
/// in a different order line up position by position.
///
/// Sorting is numeric when every sort value parses as an integer, lexical
/// otherwise. Elements without a sort value go first, in their given order.
pub fn sorted<'a>(list: &'a [JsonValue], field: Option<&str>) -> Vec<&'a JsonValue> {
    let mut keyed: Vec<_> = list
        .iter()
        .map(|element| (sort_value(element, field), element))
        .collect();

    let numeric = keyed
        .iter()
        .map(|(key, _)| key.as_deref().and_then(|key| key.parse::<i64>().ok()))
        .collect::<Option<Vec<_>>>();

    match numeric {
        Some(numbers) => {
            let mut indexed: Vec<_> = numbers.into_iter().zip(keyed).collect();
            indexed.sort_by(|(a, _), (b, _)| a.cmp(b));
            indexed.into_iter().map(|(_, (_, element))| element).collect()
        }
        None => {
            keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
            keyed.into_iter().map(|(_, element)| element).collect()
        }
    }
}
