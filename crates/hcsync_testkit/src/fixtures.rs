//! Test fixtures and harnesses.
//!
//! Provides record builders and ready-wired [`SyncContext`]s backed by
//! in-memory or temp-dir file stores.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hcsync_engine::{
    keys, EngineConfig, MockHttpClient, PushHandler, RecordingNotifier, Scheduler, Session,
    SettingsExt, SyncContext, SyncEngine,
};
use hcsync_protocol::{HealthRecord, PushMessage, RecordType};
use hcsync_storage::{FileHealthStore, FileSettings, InMemoryHealthStore, InMemorySettings, SettingsStore};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

/// Base URL every harness points at.
pub const BASE_URL: &str = "https://gateway.test";

/// Access token stored by [`TestHarness::logged_in`].
pub const ACCESS_TOKEN: &str = "access-token";

/// Refresh token stored by [`TestHarness::logged_in`].
pub const REFRESH_TOKEN: &str = "refresh-token";

/// A fixed instant used as "now" in deterministic tests.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0)
        .single()
        .expect("valid fixed instant")
}

/// Builds an interval record of `record_type` starting at `start`.
pub fn record_for(record_type: RecordType, id: &str, start: DateTime<Utc>) -> HealthRecord {
    HealthRecord::from_value(json!({
        "recordType": record_type.as_str(),
        "startTime": start.to_rfc3339(),
        "endTime": (start + Duration::minutes(5)).to_rfc3339(),
        "metadata": { "id": id, "dataOrigin": "com.example.tracker" }
    }))
    .expect("record fixture is an object")
}

/// Builds a Steps record starting at `start`.
pub fn steps_record(id: &str, start: DateTime<Utc>) -> HealthRecord {
    record_for(RecordType::Steps, id, start).with_field("count", 250)
}

/// Builds a HeartRate record with two samples starting at `start`.
pub fn heart_rate_record(id: &str, start: DateTime<Utc>) -> HealthRecord {
    record_for(RecordType::HeartRate, id, start).with_field(
        "samples",
        json!([
            { "time": start.to_rfc3339(), "beatsPerMinute": 72 },
            { "time": (start + Duration::minutes(1)).to_rfc3339(), "beatsPerMinute": 75 }
        ]),
    )
}

/// Builds an instantaneous Weight record.
pub fn weight_record(id: &str, time: DateTime<Utc>) -> HealthRecord {
    HealthRecord::from_value(json!({
        "recordType": "Weight",
        "time": time.to_rfc3339(),
        "weight": { "inKilograms": 72.4 },
        "metadata": { "id": id }
    }))
    .expect("record fixture is an object")
}

/// Builds an insert push message.
pub fn insert_message(record_type: RecordType, records: Vec<HealthRecord>) -> PushMessage {
    PushMessage::insert(record_type, records).expect("insert message encodes")
}

/// Builds a delete push message.
pub fn delete_message(record_type: RecordType, uuids: &[&str]) -> PushMessage {
    PushMessage::delete(record_type, uuids.iter().map(|s| s.to_string()).collect())
        .expect("delete message encodes")
}

/// Engine configuration for tests: no detail delay.
pub fn test_config() -> EngineConfig {
    EngineConfig::new().with_detail_delay(std::time::Duration::ZERO)
}

/// Mock services wired into a [`SyncContext`].
pub struct TestHarness {
    /// The health store.
    pub store: Arc<InMemoryHealthStore>,
    /// The settings store.
    pub settings: Arc<InMemorySettings>,
    /// The scripted HTTP client.
    pub http: Arc<MockHttpClient>,
    /// The recording notifier.
    pub notifier: Arc<RecordingNotifier>,
    /// Context sharing the services above.
    pub ctx: SyncContext,
}

impl TestHarness {
    /// Creates a harness with an empty store and [`test_config`].
    pub fn new() -> Self {
        Self::build(InMemoryHealthStore::new(), MockHttpClient::new(), test_config())
    }

    /// Creates a harness around the given store, HTTP client and config.
    pub fn build(store: InMemoryHealthStore, http: MockHttpClient, config: EngineConfig) -> Self {
        let store = Arc::new(store);
        let settings = Arc::new(InMemorySettings::with_values([(keys::API_BASE, BASE_URL)]));
        let http = Arc::new(http);
        let notifier = Arc::new(RecordingNotifier::new());
        let ctx = SyncContext::new(
            store.clone(),
            settings.clone(),
            http.clone(),
            notifier.clone(),
        )
        .with_config(config);
        Self {
            store,
            settings,
            http,
            notifier,
            ctx,
        }
    }

    /// Stores [`ACCESS_TOKEN`] and [`REFRESH_TOKEN`].
    pub fn logged_in(self) -> Self {
        store_tokens(self.settings.as_ref());
        self
    }

    /// Creates an engine over this harness.
    pub fn engine(&self) -> SyncEngine {
        SyncEngine::new(self.ctx.clone())
    }

    /// Creates a push handler over this harness.
    pub fn push_handler(&self) -> PushHandler {
        PushHandler::new(self.ctx.clone())
    }

    /// Creates the session routines over this harness.
    pub fn session(&self) -> Session {
        Session::new(self.ctx.clone())
    }

    /// Creates a scheduler over this harness.
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.ctx.clone())
    }

    /// Reads a raw setting.
    pub fn setting(&self, key: &str) -> Option<String> {
        self.settings.get(key).expect("in-memory settings never fail")
    }

    /// Reads the stored cursor.
    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.settings
            .load_settings()
            .expect("in-memory settings never fail")
            .cursor
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// File-backed stores in a temporary data directory.
pub struct FileHarness {
    /// The health store.
    pub store: Arc<FileHealthStore>,
    /// The settings store.
    pub settings: Arc<FileSettings>,
    /// The scripted HTTP client.
    pub http: Arc<MockHttpClient>,
    /// The recording notifier.
    pub notifier: Arc<RecordingNotifier>,
    /// Context sharing the services above.
    pub ctx: SyncContext,
    dir: TempDir,
}

impl FileHarness {
    /// Creates a harness in a fresh temp directory.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(
            FileHealthStore::open(&dir.path().join("health.json"))
                .expect("Failed to open health store"),
        );
        let settings = Arc::new(
            FileSettings::open(&dir.path().join("settings.json"))
                .expect("Failed to open settings"),
        );
        settings
            .save_base_url(BASE_URL)
            .expect("Failed to write settings");
        let http = Arc::new(MockHttpClient::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let ctx = SyncContext::new(
            store.clone(),
            settings.clone(),
            http.clone(),
            notifier.clone(),
        )
        .with_config(test_config());
        Self {
            store,
            settings,
            http,
            notifier,
            ctx,
            dir,
        }
    }

    /// Stores [`ACCESS_TOKEN`] and [`REFRESH_TOKEN`].
    pub fn logged_in(self) -> Self {
        store_tokens(self.settings.as_ref());
        self
    }

    /// Returns the data directory.
    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// Re-opens the settings file, as a restarted process would.
    pub fn reopen_settings(&self) -> FileSettings {
        FileSettings::open(&self.dir.path().join("settings.json"))
            .expect("Failed to reopen settings")
    }

    /// Re-opens the health store file, as a restarted process would.
    pub fn reopen_store(&self) -> FileHealthStore {
        FileHealthStore::open(&self.dir.path().join("health.json"))
            .expect("Failed to reopen health store")
    }
}

impl Default for FileHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn store_tokens(settings: &dyn SettingsStore) {
    settings
        .set(keys::ACCESS_TOKEN, ACCESS_TOKEN)
        .expect("Failed to write settings");
    settings
        .set(keys::REFRESH_TOKEN, REFRESH_TOKEN)
        .expect("Failed to write settings");
}
