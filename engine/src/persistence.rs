//! Durable save slot for a single session.
//!
//! The session is stored as one JSON object under [`SAVE_KEY`]: every session
//! field plus a `savedAt` timestamp. Stores only move strings around, so the
//! same format works for a directory of files and for an in-memory map.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::session::Session;

pub const SAVE_KEY: &str = "text-adventure-game-save";
const UNKNOWN_SCENARIO: &str = "לא ידוע";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("save store I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("save data is not valid: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Key-value storage for save slots.
pub trait SaveStore {
    fn get(&self, key: &str) -> PersistenceResult<Option<String>>;
    fn put(&self, key: &str, value: &str) -> PersistenceResult<()>;
    fn remove(&self, key: &str) -> PersistenceResult<()>;
}

/// One `<key>.json` file per slot inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SaveStore for FileStore {
    fn get(&self, key: &str) -> PersistenceResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &str) -> PersistenceResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> PersistenceResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Process-local store. Clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SaveStore for MemoryStore {
    fn get(&self, key: &str) -> PersistenceResult<Option<String>> {
        Ok(self.slots().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> PersistenceResult<()> {
        self.slots().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PersistenceResult<()> {
        self.slots().remove(key);
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveRecordRef<'a> {
    #[serde(flatten)]
    session: &'a Session,
    saved_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ScenarioName {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveHeader {
    saved_at: DateTime<Utc>,
    #[serde(default)]
    player_name: String,
    #[serde(default)]
    selected_scenario: Option<ScenarioName>,
    #[serde(default)]
    turn_count: u32,
}

/// Summary of the saved game, readable without restoring it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveInfo {
    pub saved_at: DateTime<Utc>,
    pub player_name: String,
    pub scenario: String,
    pub turn_count: u32,
}

/// Write `session` to the save slot, replacing any previous save.
pub fn persist(store: &dyn SaveStore, session: &Session) -> PersistenceResult<()> {
    let record = SaveRecordRef { session, saved_at: Utc::now() };
    let json = serde_json::to_string(&record)?;
    store.put(SAVE_KEY, &json)?;
    debug!(turn = session.turn_count, bytes = json.len(), "session saved");
    Ok(())
}

/// Read back the saved session, or `None` when there is no save.
pub fn restore(store: &dyn SaveStore) -> PersistenceResult<Option<Session>> {
    let Some(json) = store.get(SAVE_KEY)? else {
        return Ok(None);
    };
    let mut session: Session = serde_json::from_str(&json)?;
    session.settle_after_restore();
    Ok(Some(session))
}

pub fn has_saved_game(store: &dyn SaveStore) -> bool {
    matches!(store.get(SAVE_KEY), Ok(Some(_)))
}

/// Summary of the save. Unreadable data yields `None`.
pub fn save_info(store: &dyn SaveStore) -> Option<SaveInfo> {
    let json = match store.get(SAVE_KEY) {
        Ok(Some(json)) => json,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "could not read save slot");
            return None;
        }
    };
    match serde_json::from_str::<SaveHeader>(&json) {
        Ok(header) => Some(SaveInfo {
            saved_at: header.saved_at,
            player_name: header.player_name,
            scenario: header
                .selected_scenario
                .map(|s| s.name)
                .unwrap_or_else(|| UNKNOWN_SCENARIO.to_string()),
            turn_count: header.turn_count,
        }),
        Err(e) => {
            warn!(error = %e, "save slot is not a readable save");
            None
        }
    }
}

pub fn delete_save(store: &dyn SaveStore) -> PersistenceResult<()> {
    store.remove(SAVE_KEY)
}
