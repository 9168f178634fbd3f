//! Save document loading and schema-tolerant access.
//!
//! The save is kept as a generic JSON tree. `serde_json` is built with
//! `preserve_order`, so object keys keep their file order, and with
//! `arbitrary_precision`, so numbers nobody touches are written back with
//! their original text.

mod node;

use std::fs;
use std::io;
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};

pub use node::{NodeRef, PathError};

/// File name the game uses for its save.
pub const SAVE_FILE_NAME: &str = "Save.json";

#[derive(Debug, Clone, PartialEq)]
pub struct SaveDocument {
    root: Value,
}

impl SaveDocument {
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::DocumentNotFound {
                path: path.to_path_buf(),
            },
            _ => Error::Io(format!("failed to read {}: {}", path.display(), e)),
        })?;
        Self::from_slice(&bytes).map_err(|e| Error::DocumentMalformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes).map(Self::from_value)
    }

    /// Compact serialization, the same shape the game writes.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.root)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let write_failed = |reason: String| Error::WriteFailed {
            path: path.to_path_buf(),
            backup: None,
            reason,
        };
        let bytes = self.to_bytes().map_err(|e| write_failed(e.to_string()))?;
        fs::write(path, bytes).map_err(|e| write_failed(e.to_string()))
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef::new(&self.root)
    }

    pub fn value(&self) -> &Value {
        &self.root
    }

    /// Replace (or add) the leaf at `path`. Every parent must already exist
    /// as an object; no structure is invented.
    pub fn set_at(&mut self, path: &[&str], value: Value) -> std::result::Result<(), PathError> {
        let (leaf, parents) = path.split_last().ok_or_else(|| PathError::Missing {
            path: String::new(),
        })?;

        let mut cursor = &mut self.root;
        for (depth, key) in parents.iter().enumerate() {
            cursor = cursor
                .as_object_mut()
                .ok_or_else(|| PathError::TypeMismatch {
                    path: node::join_path(&parents[..depth]),
                    expected: "an object",
                })?
                .get_mut(*key)
                .ok_or_else(|| PathError::Missing {
                    path: node::join_path(&parents[..=depth]),
                })?;
        }

        let map = cursor.as_object_mut().ok_or_else(|| PathError::TypeMismatch {
            path: node::join_path(parents),
            expected: "an object",
        })?;
        map.insert((*leaf).to_string(), value);
        Ok(())
    }
}

/// Whether `path` names the file the game writes its save to.
pub fn is_save_file(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(SAVE_FILE_NAME)
}
