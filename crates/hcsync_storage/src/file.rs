//! File-backed health store and JSON persistence helpers.

use crate::error::StorageResult;
use crate::health::HealthStore;
use crate::memory::{InMemoryHealthStore, RecordMap};
use fs2::FileExt;
use hcsync_protocol::{HealthRecord, Permission, RecordType, TimeRange};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Reads a JSON document, returning `T::default()` if the file is missing.
pub(crate) fn read_json<T: DeserializeOwned + Default>(path: &Path) -> StorageResult<T> {
    match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(T::default()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

/// An exclusive advisory lock on a lock file, released on drop.
///
/// The lock is held per open file, so it excludes other processes and
/// other handles within this process alike.
#[derive(Debug)]
pub struct LockFile {
    file: File,
    path: PathBuf,
}

impl LockFile {
    /// Blocks until the lock at `path` is acquired, creating the file if
    /// needed.
    pub fn acquire(path: &Path) -> StorageResult<Self> {
        let file = open_lock_file(path)?;
        file.lock_exclusive()?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Acquires the lock at `path` if nobody holds it.
    ///
    /// Returns `Ok(None)` while another holder has it.
    pub fn try_acquire(path: &Path) -> StorageResult<Option<Self>> {
        let file = open_lock_file(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                file,
                path: path.to_path_buf(),
            })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the lock file's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}

fn open_lock_file(path: &Path) -> StorageResult<File> {
    create_parent(path)?;
    Ok(OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?)
}

fn create_parent(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Lock guarding read-modify-write cycles on the document at `path`.
pub(crate) fn document_lock(path: &Path) -> StorageResult<LockFile> {
    LockFile::acquire(&path.with_extension("lock"))
}

/// Replaces a JSON document via a synced temp file and a rename.
///
/// Callers hold [`document_lock`] so writers never interleave.
pub(crate) fn replace_json<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    create_parent(path)?;
    let tmp = path.with_extension("tmp");
    let mut file = File::create(&tmp)?;
    file.write_all(&serde_json::to_vec_pretty(value)?)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// A health store persisted as a JSON file.
///
/// Stands in for the device provider when running on a host without one.
/// Reads are served from memory; every successful mutation rewrites the
/// file.
///
/// # Example
///
/// ```no_run
/// use hcsync_storage::{FileHealthStore, HealthStore};
/// use std::path::Path;
///
/// let store = FileHealthStore::open(Path::new("health.json")).unwrap();
/// store.initialize().unwrap();
/// ```
#[derive(Debug)]
pub struct FileHealthStore {
    path: PathBuf,
    inner: InMemoryHealthStore,
    // Serializes stage + write + commit so two mutations never persist out
    // of order.
    persist: Mutex<()>,
}

impl FileHealthStore {
    /// Opens or creates a store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let records: RecordMap = read_json(path)?;
        tracing::debug!(path = %path.display(), types = records.len(), "opened health store");
        Ok(Self {
            path: path.to_path_buf(),
            inner: InMemoryHealthStore::from_snapshot(records),
            persist: Mutex::new(()),
        })
    }

    /// Returns the path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns every stored record of a type.
    #[must_use]
    pub fn records(&self, record_type: RecordType) -> Vec<HealthRecord> {
        self.inner.records(record_type)
    }

    /// Applies `change` to a copy of the records, writes the copy, and only
    /// then makes it visible. A failed write leaves memory untouched.
    fn commit<T>(
        &self,
        change: impl FnOnce(&InMemoryHealthStore) -> StorageResult<T>,
        changed: impl FnOnce(&T) -> bool,
    ) -> StorageResult<T> {
        let _guard = self.persist.lock();
        let staged = self.inner.staged();
        let outcome = change(&staged)?;
        if changed(&outcome) {
            let snapshot = staged.snapshot();
            let _lock = document_lock(&self.path)?;
            replace_json(&self.path, &snapshot)?;
            self.inner.restore(snapshot);
        }
        Ok(outcome)
    }
}

impl HealthStore for FileHealthStore {
    fn initialize(&self) -> StorageResult<()> {
        self.inner.initialize()
    }

    fn granted_permissions(&self) -> StorageResult<Vec<Permission>> {
        self.inner.granted_permissions()
    }

    fn read_records(
        &self,
        record_type: RecordType,
        range: &TimeRange,
    ) -> StorageResult<Vec<HealthRecord>> {
        self.inner.read_records(record_type, range)
    }

    fn read_record(&self, record_type: RecordType, id: &str) -> StorageResult<HealthRecord> {
        self.inner.read_record(record_type, id)
    }

    fn insert_records(&self, records: &[HealthRecord]) -> StorageResult<Vec<String>> {
        self.commit(|staged| staged.insert_records(records), |_| true)
    }

    fn delete_records(&self, record_type: RecordType, ids: &[String]) -> StorageResult<usize> {
        self.commit(
            |staged| staged.delete_records(record_type, ids),
            |removed| *removed > 0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::tempdir;

    fn weight(id: &str) -> HealthRecord {
        HealthRecord::from_value(json!({
            "recordType": "Weight",
            "time": "2024-02-01T07:00:00Z",
            "weight": { "inKilograms": 71.5 },
            "metadata": { "id": id }
        }))
        .unwrap()
    }

    #[test]
    fn file_create_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("health.json");

        let store = FileHealthStore::open(&path).unwrap();
        assert!(store.records(RecordType::Weight).is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("health.json");

        {
            let store = FileHealthStore::open(&path).unwrap();
            store.insert_records(&[weight("a"), weight("b")]).unwrap();
            store
                .delete_records(RecordType::Weight, &["a".into()])
                .unwrap();
        }

        let store = FileHealthStore::open(&path).unwrap();
        let records = store.records(RecordType::Weight);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), Some("b"));

        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap(),
        )
        .unwrap();
        assert_eq!(store.read_records(RecordType::Weight, &range).unwrap().len(), 1);
    }

    #[test]
    fn file_rejected_insert_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("health.json");

        let store = FileHealthStore::open(&path).unwrap();
        let bad = HealthRecord::new().with_field("recordType", "Weight");
        assert!(store.insert_records(&[bad]).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn file_corrupt_document_fails_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("health.json");
        fs::write(&path, b"{not json").unwrap();
        assert!(FileHealthStore::open(&path).is_err());
    }

    #[test]
    fn file_failed_write_keeps_memory_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("health.json");

        let store = FileHealthStore::open(&path).unwrap();
        store.insert_records(&[weight("a")]).unwrap();

        // A directory where the temp file goes makes every write fail.
        fs::create_dir(path.with_extension("tmp")).unwrap();
        assert!(store.insert_records(&[weight("b")]).is_err());
        assert!(store
            .delete_records(RecordType::Weight, &["a".into()])
            .is_err());

        assert_eq!(store.records(RecordType::Weight).len(), 1);
        assert_eq!(store.records(RecordType::Weight)[0].id(), Some("a"));
        let reopened = FileHealthStore::open(&path).unwrap();
        assert_eq!(reopened.records(RecordType::Weight).len(), 1);
    }

    #[test]
    fn lock_file_excludes_second_holder() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sync.lock");

        let held = LockFile::try_acquire(&path).unwrap();
        assert!(held.is_some());
        assert!(LockFile::try_acquire(&path).unwrap().is_none());

        drop(held);
        assert!(LockFile::try_acquire(&path).unwrap().is_some());
    }

    #[test]
    fn read_json_missing_is_default() {
        let dir = tempdir().unwrap();
        let value: RecordMap = read_json(&dir.path().join("absent.json")).unwrap();
        assert!(value.is_empty());
    }
}
