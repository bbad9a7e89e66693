//! Health records.

use crate::error::{ProtocolError, ProtocolResult};
use crate::record_type::RecordType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single health record as the provider returns it.
///
/// The payload is provider-defined JSON. The gateway only interprets a few
/// well-known fields:
///
/// - `metadata.id`: the record's stable unique identifier
/// - `recordType`: the type tag (present on pushed records)
/// - `time`, or `startTime` + `endTime`: when the measurement happened
///
/// Everything else is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HealthRecord(Map<String, Value>);

impl HealthRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON value, which must be an object.
    pub fn from_value(value: Value) -> ProtocolResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ProtocolError::NotAnObject),
        }
    }

    /// Sets a top-level field, returning the record for chaining.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Sets the record identifier, returning the record for chaining.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.set_id(id);
        self
    }

    /// Returns the stable identifier (`metadata.id`).
    pub fn id(&self) -> Option<&str> {
        self.0
            .get("metadata")
            .and_then(|m| m.get("id"))
            .and_then(Value::as_str)
    }

    /// Sets `metadata.id`, creating the metadata object if needed.
    pub fn set_id(&mut self, id: impl Into<String>) {
        let metadata = self
            .0
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if !metadata.is_object() {
            *metadata = Value::Object(Map::new());
        }
        if let Value::Object(m) = metadata {
            m.insert("id".into(), Value::String(id.into()));
        }
    }

    /// Returns the `recordType` tag, if present and canonical.
    pub fn record_type(&self) -> Option<RecordType> {
        self.0
            .get("recordType")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// Sets the `recordType` tag.
    pub fn set_record_type(&mut self, record_type: RecordType) {
        self.0
            .insert("recordType".into(), Value::String(record_type.to_string()));
    }

    /// Returns when the measurement starts: `time` for instantaneous records,
    /// `startTime` for interval records.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.timestamp("time").or_else(|| self.timestamp("startTime"))
    }

    /// Returns when the measurement ends: `endTime` for interval records,
    /// `time` for instantaneous records.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.timestamp("endTime").or_else(|| self.timestamp("time"))
    }

    /// Returns a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
    }
}

impl TryFrom<Value> for HealthRecord {
    type Error = ProtocolError;

    fn try_from(value: Value) -> ProtocolResult<Self> {
        Self::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_comes_from_metadata() {
        let record = HealthRecord::from_value(json!({
            "count": 120,
            "metadata": { "id": "abc", "dataOrigin": "com.example" }
        }))
        .unwrap();
        assert_eq!(record.id(), Some("abc"));
    }

    #[test]
    fn set_id_creates_metadata() {
        let mut record = HealthRecord::new().with_field("count", 3);
        assert_eq!(record.id(), None);
        record.set_id("xyz");
        assert_eq!(record.id(), Some("xyz"));
        assert_eq!(record.get("count"), Some(&json!(3)));
    }

    #[test]
    fn set_id_keeps_other_metadata() {
        let mut record = HealthRecord::from_value(json!({
            "metadata": { "dataOrigin": "com.example" }
        }))
        .unwrap();
        record.set_id("1");
        assert_eq!(
            record.get("metadata"),
            Some(&json!({ "dataOrigin": "com.example", "id": "1" }))
        );
    }

    #[test]
    fn record_type_tag() {
        let mut record = HealthRecord::new().with_field("recordType", "steps");
        assert_eq!(record.record_type(), Some(RecordType::Steps));
        record.set_record_type(RecordType::Weight);
        assert_eq!(record.record_type(), Some(RecordType::Weight));

        let unknown = HealthRecord::new().with_field("recordType", "Mood");
        assert_eq!(unknown.record_type(), None);
    }

    #[test]
    fn instant_and_interval_times() {
        let instant = HealthRecord::new().with_field("time", "2024-03-01T10:00:00Z");
        assert_eq!(instant.start_time(), instant.end_time());
        assert!(instant.start_time().is_some());

        let interval = HealthRecord::new()
            .with_field("startTime", "2024-03-01T10:00:00+02:00")
            .with_field("endTime", "2024-03-01T11:00:00+02:00");
        let start = interval.start_time().unwrap();
        let end = interval.end_time().unwrap();
        assert_eq!((end - start).num_minutes(), 60);
        assert_eq!(start.to_rfc3339(), "2024-03-01T08:00:00+00:00");
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(matches!(
            HealthRecord::from_value(json!([1, 2])),
            Err(ProtocolError::NotAnObject)
        ));
    }

    #[test]
    fn serializes_transparently() {
        let record = HealthRecord::new().with_id("a").with_field("count", 1);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({ "metadata": { "id": "a" }, "count": 1 }));
    }
}
