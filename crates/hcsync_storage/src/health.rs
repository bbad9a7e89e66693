//! Health store adapter trait definition.

use crate::error::{StorageError, StorageResult};
use hcsync_protocol::{HealthRecord, Permission, RecordType, TimeRange};

/// Capability-gated access to device-resident health records.
///
/// This is the boundary to the platform health data provider. Records are
/// opaque JSON to the store except for their id, type tag and timestamps.
///
/// # Invariants
///
/// - Record ids are unique within a type
/// - Concurrent writes to the same id are last-write-wins
/// - Implementations must be `Send + Sync`; the sync pass and the push
///   handler call into the same store concurrently
///
/// # Implementors
///
/// - [`super::InMemoryHealthStore`] - For testing
/// - [`super::FileHealthStore`] - For the command-line host
pub trait HealthStore: Send + Sync {
    /// Establishes access to the provider.
    ///
    /// Called at the start of every sync pass and every push command, since
    /// either may run in a freshly started process.
    fn initialize(&self) -> StorageResult<()>;

    /// Returns the permissions the user has granted.
    fn granted_permissions(&self) -> StorageResult<Vec<Permission>>;

    /// Reads every record of `record_type` whose start lies inside `range`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The type is not supported on this device
    /// - Read permission for the type has not been granted
    fn read_records(
        &self,
        record_type: RecordType,
        range: &TimeRange,
    ) -> StorageResult<Vec<HealthRecord>>;

    /// Reads a single record with all of its detail fields.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no record has this id, plus the
    /// same capability errors as [`HealthStore::read_records`].
    fn read_record(&self, record_type: RecordType, id: &str) -> StorageResult<HealthRecord>;

    /// Writes records, returning their ids in input order.
    ///
    /// Records without an id are assigned a fresh one. The whole call fails
    /// if any record fails validation; nothing is written in that case.
    fn insert_records(&self, records: &[HealthRecord]) -> StorageResult<Vec<String>>;

    /// Removes records by id, returning how many existed.
    ///
    /// Unknown ids are ignored.
    fn delete_records(&self, record_type: RecordType, ids: &[String]) -> StorageResult<usize>;
}

/// Checks that a record can be written, returning its type.
///
/// A record needs a canonical `recordType`, and either a `time` or both
/// `startTime` and `endTime`, with `startTime <= endTime`.
pub fn validate_record(record: &HealthRecord) -> StorageResult<RecordType> {
    let record_type = match record.get("recordType").and_then(|v| v.as_str()) {
        Some(name) => name
            .parse::<RecordType>()
            .map_err(|e| StorageError::validation(e.to_string()))?,
        None => return Err(StorageError::validation("record is missing recordType")),
    };

    let has_time = record.get("time").is_some();
    let has_start = record.get("startTime").is_some();
    let has_end = record.get("endTime").is_some();

    if has_start != has_end {
        return Err(StorageError::validation(
            "startTime and endTime must be provided together",
        ));
    }
    if !has_time && !has_start {
        return Err(StorageError::validation(
            "record needs either time or startTime and endTime",
        ));
    }

    match (record.start_time(), record.end_time()) {
        (Some(start), Some(end)) if start <= end => Ok(record_type),
        (Some(_), Some(_)) => Err(StorageError::validation("startTime is after endTime")),
        _ => Err(StorageError::validation("record timestamps are not RFC 3339")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> HealthRecord {
        HealthRecord::from_value(value).unwrap()
    }

    #[test]
    fn accepts_instant_and_interval_records() {
        let instant = record(json!({ "recordType": "Weight", "time": "2024-01-01T00:00:00Z" }));
        assert_eq!(validate_record(&instant).unwrap(), RecordType::Weight);

        let interval = record(json!({
            "recordType": "steps",
            "startTime": "2024-01-01T00:00:00Z",
            "endTime": "2024-01-01T01:00:00Z"
        }));
        assert_eq!(validate_record(&interval).unwrap(), RecordType::Steps);
    }

    #[test]
    fn rejects_missing_type() {
        let r = record(json!({ "time": "2024-01-01T00:00:00Z" }));
        assert!(matches!(validate_record(&r), Err(StorageError::Validation(_))));
    }

    #[test]
    fn rejects_unknown_type() {
        let r = record(json!({ "recordType": "Mood", "time": "2024-01-01T00:00:00Z" }));
        assert!(matches!(validate_record(&r), Err(StorageError::Validation(_))));
    }

    #[test]
    fn rejects_half_interval() {
        let r = record(json!({ "recordType": "Steps", "startTime": "2024-01-01T00:00:00Z" }));
        assert!(matches!(validate_record(&r), Err(StorageError::Validation(_))));
    }

    #[test]
    fn rejects_inverted_interval() {
        let r = record(json!({
            "recordType": "Steps",
            "startTime": "2024-01-02T00:00:00Z",
            "endTime": "2024-01-01T00:00:00Z"
        }));
        assert!(matches!(validate_record(&r), Err(StorageError::Validation(_))));
    }

    #[test]
    fn rejects_unparseable_time() {
        let r = record(json!({ "recordType": "Weight", "time": "yesterday" }));
        assert!(matches!(validate_record(&r), Err(StorageError::Validation(_))));
    }
}
