//! Session persistence across launches.
//!
//! The whole signed-in [`User`] is stored as JSON under one fixed key and
//! restored verbatim at startup. The record is never validated on restore:
//! there is no expiry and no signature, matching the portal's trust model
//! where real session security lives server-side.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::model::User;

pub const SESSION_STORAGE_KEY: &str = "sunday_school.session";

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("session storage IO failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session record could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The stored record; wraps the user so the format can grow without
/// breaking old payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub user: User,
}

/// Keyed string storage for the session record.
pub trait SessionStorage {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&self, key: &str, value: &str) -> Result<(), PersistError>;
    fn clear(&self, key: &str) -> Result<(), PersistError>;
}

/// Filesystem-backed storage: one `<key>.json` file per key under `dir`.
#[derive(Debug, Clone)]
pub struct DirSessionStorage {
    dir: PathBuf,
}

impl DirSessionStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SessionStorage for DirSessionStorage {
    fn load(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn save(&self, key: &str, value: &str) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), PersistError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage double for tests.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), PersistError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_owned(), value.to_owned());
        }
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), PersistError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
        Ok(())
    }
}

pub fn persist_session(storage: &dyn SessionStorage, user: &User) -> Result<(), PersistError> {
    let record = PersistedSession { user: user.clone() };
    let json = serde_json::to_string(&record)?;
    storage.save(SESSION_STORAGE_KEY, &json)
}

/// Restore the persisted user, if any. A record that no longer parses is
/// treated as absent, not an error.
pub fn restore_session(storage: &dyn SessionStorage) -> Option<User> {
    let json = storage.load(SESSION_STORAGE_KEY)?;
    match serde_json::from_str::<PersistedSession>(&json) {
        Ok(record) => Some(record.user),
        Err(e) => {
            log::warn!("discarding unreadable persisted session: {e}");
            None
        }
    }
}

pub fn clear_session(storage: &dyn SessionStorage) -> Result<(), PersistError> {
    storage.clear(SESSION_STORAGE_KEY)
}
