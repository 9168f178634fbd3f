//! User preferences that outlive a scan: island aliases and the last save path.

mod file_store;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub use file_store::{default_store_path, JsonFileStore};

/// Value returned for islands the user never renamed.
pub const NO_ALIAS: &str = "none";

/// Key holding the last save path. Island keys always start with the biome
/// tag, so they cannot collide with it.
pub const SAVE_PATH_KEY: &str = "savegame";

/// Key/value persistence for display aliases.
pub trait AliasStore {
    fn get(&self, key: &str, default: &str) -> String;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Non-persistent store, used by tests and `--no-prefs` runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryAliasStore {
    values: HashMap<String, String>,
}

impl MemoryAliasStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AliasStore for MemoryAliasStore {
    fn get(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub fn last_save_path(store: &dyn AliasStore) -> Option<PathBuf> {
    let stored = store.get(SAVE_PATH_KEY, NO_ALIAS);
    (stored != NO_ALIAS && !stored.is_empty()).then(|| PathBuf::from(stored))
}

pub fn remember_save_path(store: &mut dyn AliasStore, path: &Path) -> Result<()> {
    store.set(SAVE_PATH_KEY, &path.to_string_lossy())
}
