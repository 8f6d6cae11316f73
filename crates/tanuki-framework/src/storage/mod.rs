//! Key-path storage shared by plugins.
//!
//! Plugins keep durable per-user and per-group state in a single JSON
//! document addressed by dot-delimited key paths:
//!
//! ```text
//! users.628123@s\.whatsapp\.net.warnings   → 2
//! groups.1203634@g\.us.welcome             → "Hi!"
//! ```
//!
//! A literal `.` inside a segment is written as `\.` (see
//! [`escape_segment`]); numeric segments index into arrays.
//!
//! The [`Storage`] trait is the contract plugins consume; [`JsonStore`] is the
//! bundled implementation. The pipeline never reads or writes storage itself.

mod json;
mod path;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use json::JsonStore;
pub use path::escape_segment;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Errors that can occur while reading or writing storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key is empty or contains an empty segment.
    #[error("invalid storage key '{key}'")]
    InvalidKey {
        /// The offending key.
        key: String,
    },

    /// A segment of the key walks through a value that is not an object or
    /// array.
    #[error("storage key '{key}' conflicts with an existing value at '{segment}'")]
    PathConflict {
        /// The full key.
        key: String,
        /// The segment that could not be traversed.
        segment: String,
    },

    /// An array index lies too far past the end of the array to be padded.
    #[error("storage key '{key}' indexes {index} into an array of length {len}")]
    IndexOutOfRange {
        /// The full key.
        key: String,
        /// The requested index.
        index: usize,
        /// The array length at the time of the write.
        len: usize,
    },

    /// The backing file could not be read or written.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be (de)serialised.
    #[error("storage serialisation error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The backing document is not a JSON object.
    #[error("storage document is malformed: {0}")]
    Malformed(String),
}

impl StorageError {
    pub(crate) fn invalid_key(key: &str) -> Self {
        Self::InvalidKey {
            key: key.to_string(),
        }
    }

    pub(crate) fn conflict(key: &str, segment: &str) -> Self {
        Self::PathConflict {
            key: key.to_string(),
            segment: segment.to_string(),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// ─── Storage trait ───────────────────────────────────────────────────────────

/// A hierarchical key-value store addressed by dot-delimited key paths.
///
/// Implementations synchronise internally: every method takes `&self` and may
/// be called from many message tasks at once.
pub trait Storage: Send + Sync + 'static {
    /// Returns the value at `key`, or `None` if the path does not exist.
    fn get(&self, key: &str) -> Option<Value>;

    /// Writes `value` at `key`, creating intermediate objects as needed.
    fn set(&self, key: &str, value: Value) -> StorageResult<()>;

    /// Removes the value at `key`. Returns `true` if something was removed.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Replaces the value at `key` with `f(current)` as one atomic step and
    /// returns the new value.
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&Value>) -> Value,
    ) -> StorageResult<Value>;

    /// Returns `true` if a value (including `null`) exists at `key`.
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns a copy of the whole document.
    fn snapshot(&self) -> Value;

    /// Removes everything.
    fn clear(&self) -> StorageResult<()>;
}

/// A shared storage handle.
pub type BoxedStorage = Arc<dyn Storage>;

// ─── StorageExt ──────────────────────────────────────────────────────────────

/// Typed and scoped helpers available on every [`Storage`].
pub trait StorageExt: Storage {
    /// Deserialises the value at `key` into `T`.
    ///
    /// Returns `Ok(None)` when the key is absent.
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        self.get(key)
            .map(serde_json::from_value)
            .transpose()
            .map_err(StorageError::from)
    }

    /// Serialises `value` and writes it at `key`.
    fn set_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        self.set(key, serde_json::to_value(value)?)
    }

    /// Adds `by` to the integer at `key` (missing or non-numeric counts as 0)
    /// and returns the result.
    fn increment(&self, key: &str, by: i64) -> StorageResult<i64> {
        let next = self.update(key, &mut |current: Option<&Value>| {
            let n = current.and_then(Value::as_i64).unwrap_or(0);
            Value::from(n.saturating_add(by))
        })?;
        Ok(next.as_i64().unwrap_or_default())
    }

    /// Returns the string at `key`; numbers and booleans are rendered.
    fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Returns the integer at `key`; numeric strings are parsed.
    fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(b)),
            _ => None,
        }
    }

    /// Returns the float at `key`; numeric strings are parsed.
    fn get_f64(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the boolean at `key`; `"true"`/`"false"` strings are parsed.
    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Reads `users.<user_id>.<key>`.
    fn user(&self, user_id: &str, key: &str) -> Option<Value> {
        self.get(&scoped("users", user_id, Some(key)))
    }

    /// Writes `users.<user_id>.<key>`.
    fn set_user(&self, user_id: &str, key: &str, value: Value) -> StorageResult<()> {
        self.set(&scoped("users", user_id, Some(key)), value)
    }

    /// Returns `true` if anything is stored for `user_id`.
    fn has_user(&self, user_id: &str) -> bool {
        self.has(&scoped("users", user_id, None))
    }

    /// Reads `groups.<group_id>.<key>`.
    fn group(&self, group_id: &str, key: &str) -> Option<Value> {
        self.get(&scoped("groups", group_id, Some(key)))
    }

    /// Writes `groups.<group_id>.<key>`.
    fn set_group(&self, group_id: &str, key: &str, value: Value) -> StorageResult<()> {
        self.set(&scoped("groups", group_id, Some(key)), value)
    }

    /// Returns `true` if anything is stored for `group_id`.
    fn has_group(&self, group_id: &str) -> bool {
        self.has(&scoped("groups", group_id, None))
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

/// Builds `<root>.<escaped id>[.<key>]`. The id is escaped because network
/// identifiers routinely contain dots; `key` is used as a path.
fn scoped(root: &str, id: &str, key: Option<&str>) -> String {
    match key {
        Some(key) => format!("{root}.{}.{key}", escape_segment(id)),
        None => format!("{root}.{}", escape_segment(id)),
    }
}
