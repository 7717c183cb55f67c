//! A single usage-statistics document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Unique key of a statistics document.
pub const UID_FIELD: &str = "uid";
/// Optimistic-concurrency field the index adds to every stored document.
pub const VERSION_FIELD: &str = "_version_";

/// One statistics event: field name to one or more values.
///
/// Single values serialize as scalars and multiple values as arrays, which
/// is the shape the index both returns and accepts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Value>",
    into = "BTreeMap<String, Value>"
)]
pub struct StatsRecord {
    fields: BTreeMap<String, Vec<Value>>,
}

impl StatsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter for a single value.
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), vec![value.into()]);
        self
    }

    /// Builder-style setter for several values.
    pub fn with_values<V: Into<Value>>(
        mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.set_values(field, values.into_iter().map(Into::into).collect());
        self
    }

    pub fn get(&self, field: &str) -> Option<&[Value]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Every value of a field rendered as a string.
    pub fn strings(&self, field: &str) -> Vec<String> {
        self.get(field)
            .map(|values| values.iter().map(value_to_string).collect())
            .unwrap_or_default()
    }

    /// First value of a field rendered as a string.
    pub fn first_str(&self, field: &str) -> Option<String> {
        self.get(field)
            .and_then(|values| values.first())
            .map(value_to_string)
    }

    /// Replace a field's values. An empty list removes the field.
    pub fn set_values(&mut self, field: &str, values: Vec<Value>) {
        if values.is_empty() {
            self.fields.remove(field);
        } else {
            self.fields.insert(field.to_string(), values);
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<Vec<Value>> {
        self.fields.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn uid(&self) -> Option<String> {
        self.first_str(UID_FIELD)
    }
}

impl From<BTreeMap<String, Value>> for StatsRecord {
    fn from(map: BTreeMap<String, Value>) -> Self {
        let fields = map
            .into_iter()
            .filter_map(|(name, value)| {
                let values = match value {
                    Value::Array(values) => values,
                    Value::Null => return None,
                    other => vec![other],
                };
                (!values.is_empty()).then_some((name, values))
            })
            .collect();
        Self { fields }
    }
}

impl From<StatsRecord> for BTreeMap<String, Value> {
    fn from(record: StatsRecord) -> Self {
        record
            .fields
            .into_iter()
            .map(|(name, mut values)| {
                let value = if values.len() == 1 {
                    values.remove(0)
                } else {
                    Value::Array(values)
                };
                (name, value)
            })
            .collect()
    }
}

/// Render a stored value the way the index's query syntax sees it.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A legacy value is any stored value the upgrade has not touched yet.
///
/// Unique identifiers and sentinel-marked values both contain a `-`.
pub fn is_legacy_value(value: &str) -> bool {
    !value.is_empty() && !value.contains('-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_scalars_and_arrays() {
        let record: StatsRecord = serde_json::from_value(json!({
            "uid": "abc",
            "id": "42",
            "type": 2,
            "owningComm": ["1", "2"],
            "_version_": 1234,
            "bundleName": null
        }))
        .unwrap();

        assert_eq!(record.uid().as_deref(), Some("abc"));
        assert_eq!(record.first_str("type").as_deref(), Some("2"));
        assert_eq!(record.strings("owningComm"), vec!["1", "2"]);
        assert!(record.contains(VERSION_FIELD));
        assert!(!record.contains("bundleName"));
    }

    #[test]
    fn test_serialize_keeps_single_values_scalar() {
        let record = StatsRecord::new()
            .with("uid", "abc")
            .with_values("owningColl", ["7", "8"]);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"uid": "abc", "owningColl": ["7", "8"]}));
    }

    #[test]
    fn test_set_empty_removes_field() {
        let mut record = StatsRecord::new().with("id", "1");
        record.set_values("id", Vec::new());
        assert!(!record.contains("id"));
    }

    #[test]
    fn test_legacy_value_detection() {
        assert!(is_legacy_value("42"));
        assert!(is_legacy_value("e15"));
        assert!(!is_legacy_value("42-unmigrated"));
        assert!(!is_legacy_value("0d8f3c52-4a57-4d43-9b35-0d4c2a0ec9a1"));
        assert!(!is_legacy_value(""));
    }
}
