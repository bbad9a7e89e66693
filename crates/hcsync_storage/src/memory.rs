//! In-memory health store for testing.

use crate::error::{StorageError, StorageResult};
use crate::health::{validate_record, HealthStore};
use hcsync_protocol::{AccessType, HealthRecord, Permission, RecordType, TimeRange};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Records grouped by type, in insertion order.
pub(crate) type RecordMap = BTreeMap<RecordType, Vec<HealthRecord>>;

/// An in-memory health store.
///
/// Stores records per type and enforces the same rules a device provider
/// does: unsupported types and missing permissions fail the call, and
/// inserts are validated as a whole.
///
/// # Thread Safety
///
/// All state sits behind `parking_lot` locks, so the store can be shared
/// between a sync pass and the push handler.
///
/// # Example
///
/// ```rust
/// use hcsync_protocol::{HealthRecord, RecordType};
/// use hcsync_storage::{HealthStore, InMemoryHealthStore};
///
/// let store = InMemoryHealthStore::new();
/// let record = HealthRecord::new()
///     .with_field("recordType", "Weight")
///     .with_field("time", "2024-01-01T08:00:00Z");
/// let ids = store.insert_records(&[record]).unwrap();
/// assert_eq!(store.records(RecordType::Weight).len(), 1);
/// assert_eq!(store.records(RecordType::Weight)[0].id(), Some(ids[0].as_str()));
/// ```
#[derive(Debug)]
pub struct InMemoryHealthStore {
    records: RwLock<RecordMap>,
    supported: RwLock<HashSet<RecordType>>,
    granted: RwLock<HashSet<Permission>>,
    initializations: AtomicUsize,
    detail_reads: AtomicUsize,
}

impl Default for InMemoryHealthStore {
    fn default() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            supported: RwLock::new(RecordType::ALL.iter().copied().collect()),
            granted: RwLock::new(RecordType::all_permissions().into_iter().collect()),
            initializations: AtomicUsize::new(0),
            detail_reads: AtomicUsize::new(0),
        }
    }
}

impl InMemoryHealthStore {
    /// Creates an empty store supporting every type with every permission
    /// granted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated from a snapshot.
    pub(crate) fn from_snapshot(records: RecordMap) -> Self {
        Self {
            records: RwLock::new(records),
            ..Self::default()
        }
    }

    /// Restricts the device to the given types.
    #[must_use]
    pub fn with_supported(self, types: &[RecordType]) -> Self {
        *self.supported.write() = types.iter().copied().collect();
        self
    }

    /// Withdraws a permission.
    pub fn revoke(&self, permission: Permission) {
        self.granted.write().remove(&permission);
    }

    /// Stores records directly, bypassing validation and permissions.
    ///
    /// Each record must carry an id; its type is given explicitly.
    pub fn seed(&self, record_type: RecordType, records: impl IntoIterator<Item = HealthRecord>) {
        let mut map = self.records.write();
        let bucket = map.entry(record_type).or_default();
        for record in records {
            upsert(bucket, record);
        }
    }

    /// Returns every stored record of a type.
    #[must_use]
    pub fn records(&self, record_type: RecordType) -> Vec<HealthRecord> {
        self.records
            .read()
            .get(&record_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the ids of every stored record of a type.
    #[must_use]
    pub fn ids(&self, record_type: RecordType) -> Vec<String> {
        self.records(record_type)
            .iter()
            .filter_map(|r| r.id().map(str::to_string))
            .collect()
    }

    /// Returns a copy of all records.
    pub(crate) fn snapshot(&self) -> RecordMap {
        self.records.read().clone()
    }

    /// Returns a detached copy with the same records, types and
    /// permissions. Counters start at zero.
    pub(crate) fn staged(&self) -> Self {
        Self {
            records: RwLock::new(self.snapshot()),
            supported: RwLock::new(self.supported.read().clone()),
            granted: RwLock::new(self.granted.read().clone()),
            ..Self::default()
        }
    }

    /// Replaces every record with `records`.
    pub(crate) fn restore(&self, records: RecordMap) {
        *self.records.write() = records;
    }

    /// Number of times [`HealthStore::initialize`] was called.
    #[must_use]
    pub fn initializations(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }

    /// Number of single-record detail reads served.
    #[must_use]
    pub fn detail_reads(&self) -> usize {
        self.detail_reads.load(Ordering::SeqCst)
    }

    fn check(&self, access: AccessType, record_type: RecordType) -> StorageResult<()> {
        if !self.supported.read().contains(&record_type) {
            return Err(StorageError::Unsupported(record_type));
        }
        if !self
            .granted
            .read()
            .contains(&Permission::new(access, record_type))
        {
            return Err(StorageError::PermissionDenied {
                access,
                record_type,
            });
        }
        Ok(())
    }
}

/// Replaces the record with the same id, or appends.
fn upsert(bucket: &mut Vec<HealthRecord>, record: HealthRecord) {
    match bucket
        .iter_mut()
        .find(|existing| existing.id().is_some() && existing.id() == record.id())
    {
        Some(existing) => *existing = record,
        None => bucket.push(record),
    }
}

impl HealthStore for InMemoryHealthStore {
    fn initialize(&self) -> StorageResult<()> {
        self.initializations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn granted_permissions(&self) -> StorageResult<Vec<Permission>> {
        Ok(self.granted.read().iter().copied().collect())
    }

    fn read_records(
        &self,
        record_type: RecordType,
        range: &TimeRange,
    ) -> StorageResult<Vec<HealthRecord>> {
        self.check(AccessType::Read, record_type)?;
        Ok(self
            .records
            .read()
            .get(&record_type)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|r| r.start_time().is_some_and(|t| range.contains(t)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn read_record(&self, record_type: RecordType, id: &str) -> StorageResult<HealthRecord> {
        self.check(AccessType::Read, record_type)?;
        self.detail_reads.fetch_add(1, Ordering::SeqCst);
        self.records
            .read()
            .get(&record_type)
            .and_then(|bucket| bucket.iter().find(|r| r.id() == Some(id)))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                record_type,
                id: id.to_string(),
            })
    }

    fn insert_records(&self, records: &[HealthRecord]) -> StorageResult<Vec<String>> {
        let mut prepared = Vec::with_capacity(records.len());
        for record in records {
            let record_type = validate_record(record)?;
            self.check(AccessType::Write, record_type)?;

            let mut record = record.clone();
            if record.id().is_none() {
                record.set_id(uuid::Uuid::new_v4().to_string());
            }
            prepared.push((record_type, record));
        }

        let mut map = self.records.write();
        let mut ids = Vec::with_capacity(prepared.len());
        for (record_type, record) in prepared {
            ids.push(record.id().unwrap_or_default().to_string());
            upsert(map.entry(record_type).or_default(), record);
        }
        tracing::debug!(count = ids.len(), "inserted health records");
        Ok(ids)
    }

    fn delete_records(&self, record_type: RecordType, ids: &[String]) -> StorageResult<usize> {
        self.check(AccessType::Write, record_type)?;
        let mut map = self.records.write();
        let Some(bucket) = map.get_mut(&record_type) else {
            return Ok(0);
        };
        let before = bucket.len();
        bucket.retain(|r| !r.id().is_some_and(|id| ids.iter().any(|d| d == id)));
        let removed = before - bucket.len();
        tracing::debug!(%record_type, removed, "deleted health records");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn steps(id: &str, hour: u32) -> HealthRecord {
        HealthRecord::from_value(json!({
            "recordType": "Steps",
            "count": 100,
            "startTime": format!("2024-01-01T{hour:02}:00:00Z"),
            "endTime": format!("2024-01-01T{hour:02}:30:00Z"),
            "metadata": { "id": id }
        }))
        .unwrap()
    }

    fn day() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryHealthStore::new();
        assert!(store.records(RecordType::Steps).is_empty());
        assert_eq!(store.granted_permissions().unwrap().len(), 68);
    }

    #[test]
    fn memory_read_filters_by_range() {
        let store = InMemoryHealthStore::new();
        store.seed(RecordType::Steps, [steps("a", 1), steps("b", 5)]);

        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap(),
        )
        .unwrap();
        let records = store.read_records(RecordType::Steps, &range).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), Some("a"));
    }

    #[test]
    fn memory_unsupported_type_fails() {
        let store = InMemoryHealthStore::new().with_supported(&[RecordType::Steps]);
        let result = store.read_records(RecordType::Vo2Max, &day());
        assert!(matches!(result, Err(StorageError::Unsupported(RecordType::Vo2Max))));
        assert!(store.read_records(RecordType::Steps, &day()).is_ok());
    }

    #[test]
    fn memory_revoked_permission_fails() {
        let store = InMemoryHealthStore::new();
        store.revoke(Permission::new(AccessType::Read, RecordType::Steps));
        assert!(matches!(
            store.read_records(RecordType::Steps, &day()),
            Err(StorageError::PermissionDenied { .. })
        ));
        assert_eq!(store.granted_permissions().unwrap().len(), 67);
    }

    #[test]
    fn memory_read_record_counts_detail_reads() {
        let store = InMemoryHealthStore::new();
        store.seed(RecordType::Steps, [steps("a", 1)]);
        assert_eq!(store.read_record(RecordType::Steps, "a").unwrap().id(), Some("a"));
        assert!(matches!(
            store.read_record(RecordType::Steps, "zzz"),
            Err(StorageError::NotFound { .. })
        ));
        assert_eq!(store.detail_reads(), 2);
    }

    #[test]
    fn memory_insert_assigns_ids() {
        let store = InMemoryHealthStore::new();
        let record = HealthRecord::from_value(json!({
            "recordType": "Weight",
            "time": "2024-01-01T08:00:00Z",
            "weight": { "inKilograms": 70 }
        }))
        .unwrap();
        let ids = store.insert_records(&[record]).unwrap();
        assert_eq!(ids.len(), 1);
        assert!(!ids[0].is_empty());
        assert_eq!(store.ids(RecordType::Weight), ids);
    }

    #[test]
    fn memory_insert_is_all_or_nothing() {
        let store = InMemoryHealthStore::new();
        let bad = HealthRecord::from_value(json!({ "recordType": "Steps" })).unwrap();
        let result = store.insert_records(&[steps("a", 1), bad]);
        assert!(matches!(result, Err(StorageError::Validation(_))));
        assert!(store.records(RecordType::Steps).is_empty());
    }

    #[test]
    fn memory_insert_same_id_replaces() {
        let store = InMemoryHealthStore::new();
        store.insert_records(&[steps("a", 1)]).unwrap();
        let updated = steps("a", 1).with_field("count", 999);
        store.insert_records(&[updated]).unwrap();

        let records = store.records(RecordType::Steps);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("count"), Some(&json!(999)));
    }

    #[test]
    fn memory_delete_removes_only_listed_ids() {
        let store = InMemoryHealthStore::new();
        store.seed(RecordType::Steps, [steps("a", 1), steps("b", 2), steps("c", 3)]);

        let removed = store
            .delete_records(RecordType::Steps, &["a".into(), "b".into(), "missing".into()])
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.ids(RecordType::Steps), vec!["c".to_string()]);
    }

    #[test]
    fn memory_initialize_is_counted() {
        let store = InMemoryHealthStore::new();
        store.initialize().unwrap();
        store.initialize().unwrap();
        assert_eq!(store.initializations(), 2);
    }
}
