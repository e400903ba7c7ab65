// ── Restore state ──
//
// Last-known entity values, persisted after each applied snapshot and read
// back at startup so entities have a value before the first fetch completes.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use poolmath_api::{MeasurementCode, MeasurementValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;

/// What is persisted for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    pub value: MeasurementValue,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Persisted state for every entity of one pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredPoolState {
    #[serde(default)]
    pub entities: BTreeMap<MeasurementCode, StoredState>,
}

impl StoredPoolState {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Host-provided persistence for entity state, keyed per pool.
pub trait RestoreStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<StoredPoolState>, CoreError>;
    fn save(&self, key: &str, state: &StoredPoolState) -> Result<(), CoreError>;
}

// ── In-memory ──────────────────────────────────────────────────────

/// Process-local store; state survives coordinator restarts but not the process.
#[derive(Debug, Default)]
pub struct MemoryRestoreStore {
    states: DashMap<String, StoredPoolState>,
}

impl MemoryRestoreStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RestoreStore for MemoryRestoreStore {
    fn load(&self, key: &str) -> Result<Option<StoredPoolState>, CoreError> {
        Ok(self.states.get(key).map(|s| s.value().clone()))
    }

    fn save(&self, key: &str, state: &StoredPoolState) -> Result<(), CoreError> {
        self.states.insert(key.to_owned(), state.clone());
        Ok(())
    }
}

// ── JSON files ─────────────────────────────────────────────────────

/// One pretty-printed JSON file per pool: `{dir}/{key}.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl RestoreStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<StoredPoolState>, CoreError> {
        let path = self.path_for(key);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CoreError::restore(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };
        let state = serde_json::from_str(&contents)
            .map_err(|e| CoreError::restore(format!("cannot parse {}: {e}", path.display())))?;
        debug!(path = %path.display(), "loaded restore state");
        Ok(Some(state))
    }

    fn save(&self, key: &str, state: &StoredPoolState) -> Result<(), CoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            CoreError::restore(format!("cannot create {}: {e}", self.dir.display()))
        })?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(state)
            .map_err(|e| CoreError::restore(format!("cannot serialize state: {e}")))?;
        fs::write(&tmp, contents)
            .and_then(|()| fs::rename(&tmp, &path))
            .map_err(|e| CoreError::restore(format!("cannot write {}: {e}", path.display())))?;
        debug!(path = %path.display(), "saved restore state");
        Ok(())
    }
}
