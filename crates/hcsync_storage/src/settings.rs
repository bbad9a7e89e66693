//! Durable key/value settings.

use crate::error::StorageResult;
use crate::file::{document_lock, read_json, replace_json};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A durable string key/value store.
///
/// Holds everything that must survive a process restart: credentials, the
/// sync cursor and user configuration. Values are opaque strings; parsing
/// them is the caller's job.
pub trait SettingsStore: Send + Sync {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Returns every stored key, sorted.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

/// An in-memory settings store for testing.
#[derive(Debug, Default)]
pub struct InMemorySettings {
    values: RwLock<BTreeMap<String, String>>,
}

impl InMemorySettings {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given pairs.
    pub fn with_values<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            values: RwLock::new(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        }
    }
}

impl SettingsStore for InMemorySettings {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.values.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.values.read().keys().cloned().collect())
    }
}

/// A settings store persisted as a JSON object on disk.
///
/// The file is the only copy: every read loads it, and every write
/// re-reads it under the document lock before replacing it. Several
/// processes can share one file; each sees the others' writes and none
/// overwrites them with stale values.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    /// Opens or creates a settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let settings = Self {
            path: path.to_path_buf(),
        };
        settings.load()?;
        Ok(settings)
    }

    /// Returns the path to the settings file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        read_json(&self.path)
    }

    /// Applies `apply` to the current file contents. The file is rewritten
    /// only when `apply` reports a change.
    fn mutate(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> StorageResult<()> {
        let _lock = document_lock(&self.path)?;
        let mut values = self.load()?;
        if apply(&mut values) {
            replace_json(&self.path, &values)?;
        }
        Ok(())
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.mutate(|values| {
            values.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.mutate(|values| values.remove(key).is_some())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.load()?.into_keys().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_set_get_remove() {
        let settings = InMemorySettings::new();
        assert_eq!(settings.get("login").unwrap(), None);

        settings.set("login", "token").unwrap();
        assert_eq!(settings.get("login").unwrap().as_deref(), Some("token"));

        settings.remove("login").unwrap();
        settings.remove("login").unwrap();
        assert_eq!(settings.get("login").unwrap(), None);
    }

    #[test]
    fn memory_with_values() {
        let settings = InMemorySettings::with_values([("b", "2"), ("a", "1")]);
        assert_eq!(settings.keys().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        {
            let settings = FileSettings::open(&path).unwrap();
            settings.set("apiBase", "https://example.test").unwrap();
            settings.set("lastSync", "2024-01-01T00:00:00Z").unwrap();
            settings.remove("lastSync").unwrap();
        }

        let settings = FileSettings::open(&path).unwrap();
        assert_eq!(
            settings.get("apiBase").unwrap().as_deref(),
            Some("https://example.test")
        );
        assert_eq!(settings.get("lastSync").unwrap(), None);
        assert_eq!(settings.keys().unwrap(), vec!["apiBase"]);
    }

    #[test]
    fn file_write_failure_leaves_file_intact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = FileSettings::open(&path).unwrap();
        settings.set("login", "t").unwrap();

        // A directory where the temp file goes makes the write fail.
        std::fs::create_dir(path.with_extension("tmp")).unwrap();
        assert!(settings.set("login", "other").is_err());
        assert_eq!(settings.get("login").unwrap().as_deref(), Some("t"));
    }

    #[test]
    fn file_handles_share_one_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let long_lived = FileSettings::open(&path).unwrap();
        long_lived.set("login", "token").unwrap();
        long_lived.set("syncPeriodDays", "30").unwrap();

        let other = FileSettings::open(&path).unwrap();
        other.remove("login").unwrap();
        other.set("syncPeriodDays", "7").unwrap();

        assert_eq!(long_lived.get("login").unwrap(), None);
        assert_eq!(long_lived.get("syncPeriodDays").unwrap().as_deref(), Some("7"));

        long_lived.set("lastSync", "2024-06-15T12:00:00Z").unwrap();
        let reopened = FileSettings::open(&path).unwrap();
        assert_eq!(reopened.get("login").unwrap(), None);
        assert_eq!(reopened.get("syncPeriodDays").unwrap().as_deref(), Some("7"));
        assert_eq!(reopened.keys().unwrap(), vec!["lastSync", "syncPeriodDays"]);
    }
}
