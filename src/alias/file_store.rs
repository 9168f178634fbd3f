use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use super::AliasStore;
use crate::error::{Error, Result};

pub fn default_store_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("deeply-lost"))
        .or_else(|| dirs::home_dir().map(|home| home.join(".deeply-lost")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("preferences.json")
}

/// Preferences persisted as a flat JSON object, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: IndexMap<String, String>,
}

impl JsonFileStore {
    /// Open the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| Error::Preferences {
                path: path.clone(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => IndexMap::new(),
            Err(e) => {
                return Err(Error::Preferences {
                    path,
                    reason: e.to_string(),
                })
            }
        };
        debug!(path = %path.display(), entries = values.len(), "preferences_loaded");
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let preferences_error = |reason: String| Error::Preferences {
            path: self.path.clone(),
            reason,
        };
        let text = serde_json::to_string_pretty(&self.values)
            .map_err(|e| preferences_error(e.to_string()))?;
        write_text_atomic(&self.path, &text).map_err(|e| preferences_error(e.to_string()))
    }
}

impl AliasStore for JsonFileStore {
    fn get(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }
}

fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, text)?;
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("preferences.json");
    path.with_file_name(format!("{file_name}.tmp"))
}
