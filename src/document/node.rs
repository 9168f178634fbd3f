use serde_json::{Map, Value};

use crate::codec;

/// Why a schema lookup did not produce a usable value.
///
/// Absence is an ordinary outcome when reading a save written by a
/// different game version; callers decide whether it is fatal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathError {
    #[error("missing field `{path}`")]
    Missing { path: String },

    #[error("field `{path}` is not {expected}")]
    TypeMismatch { path: String, expected: &'static str },

    #[error("field `{path}` holds {raw:?}, which is not a game float")]
    BadFloat { path: String, raw: String },
}

impl PathError {
    pub fn path(&self) -> &str {
        match self {
            PathError::Missing { path }
            | PathError::TypeMismatch { path, .. }
            | PathError::BadFloat { path, .. } => path,
        }
    }
}

pub(crate) fn join_path(path: &[&str]) -> String {
    path.join(".")
}

/// Read-only view of one node of the save tree.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    value: &'a Value,
}

impl<'a> NodeRef<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Child by key. Non-object nodes have no children.
    pub fn get(&self, key: &str) -> Option<NodeRef<'a>> {
        self.value.as_object()?.get(key).map(NodeRef::new)
    }

    pub fn at(&self, path: &[&str]) -> Result<NodeRef<'a>, PathError> {
        let mut node = *self;
        for (depth, key) in path.iter().enumerate() {
            let map = node.value.as_object().ok_or_else(|| PathError::TypeMismatch {
                path: join_path(&path[..depth]),
                expected: "an object",
            })?;
            node = map.get(*key).map(NodeRef::new).ok_or_else(|| PathError::Missing {
                path: join_path(&path[..=depth]),
            })?;
        }
        Ok(node)
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.value.as_str()
    }

    pub fn as_object(&self) -> Option<&'a Map<String, Value>> {
        self.value.as_object()
    }

    pub fn str_at(&self, path: &[&str]) -> Result<&'a str, PathError> {
        self.at(path)?.as_str().ok_or_else(|| PathError::TypeMismatch {
            path: join_path(path),
            expected: "a string",
        })
    }

    pub fn bool_at(&self, path: &[&str]) -> Result<bool, PathError> {
        self.at(path)?.value.as_bool().ok_or_else(|| PathError::TypeMismatch {
            path: join_path(path),
            expected: "a boolean",
        })
    }

    /// Decode a game float leaf.
    pub fn float_at(&self, path: &[&str]) -> Result<f32, PathError> {
        let raw = self.str_at(path)?;
        codec::decode(raw).map_err(|_| PathError::BadFloat {
            path: join_path(path),
            raw: raw.to_string(),
        })
    }

    /// Entries of an object in document order, or the items of an array.
    ///
    /// Array items carry no key. Scalars have no children.
    pub fn children(&self) -> Vec<(Option<&'a str>, NodeRef<'a>)> {
        match self.value {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| (Some(k.as_str()), NodeRef::new(v)))
                .collect(),
            Value::Array(items) => items.iter().map(|v| (None, NodeRef::new(v))).collect(),
            _ => Vec::new(),
        }
    }
}
