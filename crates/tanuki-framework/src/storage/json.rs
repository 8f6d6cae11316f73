use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{Storage, StorageError, StorageResult, path};

/// A [`Storage`] backed by one JSON document, optionally persisted to a file.
///
/// Every successful mutation rewrites the whole file, pretty-printed. A
/// mutation is applied to a copy first and only swapped in once the file
/// write succeeded, so a failed write leaves both the file and the in-memory
/// document unchanged.
///
/// The file write is synchronous and happens under the write lock, so
/// mutations are serialised and block the calling thread for the duration of
/// the write. Reads wait for an in-progress write. This suits the small
/// documents bots keep.
#[derive(Debug)]
pub struct JsonStore {
    path: Option<PathBuf>,
    data: RwLock<Value>,
}

impl JsonStore {
    /// Creates a store that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(Value::Object(Map::new())),
        }
    }

    /// Opens the store at `path`.
    ///
    /// Missing parent directories are created. A missing file is created
    /// holding `{}`; an empty file is read as `{}`. Any other content must be
    /// a JSON object.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let data = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                Value::Object(Map::new())
            } else {
                match serde_json::from_str::<Value>(&raw)? {
                    doc @ Value::Object(_) => doc,
                    other => {
                        return Err(StorageError::Malformed(format!(
                            "expected a JSON object at the top level, found {}",
                            kind_of(&other)
                        )));
                    }
                }
            }
        } else {
            let empty = Value::Object(Map::new());
            write_file(&path, &empty)?;
            empty
        };

        info!(path = %path.display(), "Storage opened");
        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// The backing file, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes the current document to the backing file.
    pub fn flush(&self) -> StorageResult<()> {
        match &self.path {
            Some(path) => write_file(path, &self.data.read()),
            None => Ok(()),
        }
    }

    /// Applies `f` to a copy of the document, persists it, then swaps it in.
    fn mutate<T>(&self, f: impl FnOnce(&mut Value) -> StorageResult<T>) -> StorageResult<T> {
        let mut guard = self.data.write();
        let mut next = guard.clone();
        let out = f(&mut next)?;
        if let Some(path) = &self.path {
            write_file(path, &next)?;
        }
        *guard = next;
        Ok(out)
    }
}

impl Storage for JsonStore {
    fn get(&self, key: &str) -> Option<Value> {
        let segments = path::split(key).ok()?;
        path::get(&self.data.read(), &segments).cloned()
    }

    fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        let segments = path::split(key)?;
        self.mutate(|doc| path::set(doc, key, &segments, value))?;
        debug!(key, "Storage value set");
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let segments = path::split(key)?;
        if path::get(&self.data.read(), &segments).is_none() {
            return Ok(false);
        }
        self.mutate(|doc| Ok(path::delete(doc, &segments)))
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&Value>) -> Value,
    ) -> StorageResult<Value> {
        let segments = path::split(key)?;
        self.mutate(|doc| {
            let next = f(path::get(doc, &segments));
            path::set(doc, key, &segments, next.clone())?;
            Ok(next)
        })
    }

    fn snapshot(&self) -> Value {
        self.data.read().clone()
    }

    fn clear(&self) -> StorageResult<()> {
        self.mutate(|doc| {
            *doc = Value::Object(Map::new());
            Ok(())
        })
    }
}

fn write_file(path: &Path, doc: &Value) -> StorageResult<()> {
    let text = serde_json::to_string_pretty(doc)?;
    fs::write(path, text)?;
    Ok(())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_file(tag: &str) -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir()
            .join(format!("tanuki-store-{}-{tag}-{n}", std::process::id()))
            .join("db.json")
    }

    #[test]
    fn test_open_creates_file_and_parent() {
        let path = temp_file("create");
        let store = JsonStore::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(store.snapshot(), json!({}));
        assert_eq!(store.path(), Some(path.as_path()));
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "{}");
    }

    #[test]
    fn test_mutations_persist_across_reopen() {
        let path = temp_file("persist");
        {
            let store = JsonStore::open(&path).unwrap();
            store.set("users.a.xp", json!(5)).unwrap();
            store.set("users.b.xp", json!(7)).unwrap();
            assert!(store.delete("users.b").unwrap());
        }

        let store = JsonStore::open(&path).unwrap();
        assert_eq!(store.snapshot(), json!({"users": {"a": {"xp": 5}}}));
    }

    #[test]
    fn test_empty_file_reads_as_empty_object() {
        let path = temp_file("empty");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "  \n").unwrap();

        let store = JsonStore::open(&path).unwrap();
        assert_eq!(store.snapshot(), json!({}));
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        let path = temp_file("array");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[1, 2]").unwrap();

        let err = JsonStore::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Malformed(_)));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonStore::open(&path).unwrap_err(),
            StorageError::Serialize(_)
        ));
    }

    #[test]
    fn test_failed_set_leaves_document_unchanged() {
        let store = JsonStore::in_memory();
        store.set("a", json!(1)).unwrap();

        assert!(store.set("a.b.c", json!(2)).is_err());
        assert_eq!(store.snapshot(), json!({"a": 1}));
    }

    #[test]
    fn test_huge_array_index_is_an_error() {
        let store = JsonStore::in_memory();
        store.set("list", json!([1])).unwrap();

        let err = store.set("list.18446744073709551615", json!(2)).unwrap_err();
        assert!(matches!(err, StorageError::IndexOutOfRange { .. }));
        assert!(store.update("list.100000000000", &mut |_: Option<&Value>| json!(0)).is_err());
        assert_eq!(store.snapshot(), json!({"list": [1]}));
    }

    #[test]
    fn test_invalid_keys() {
        let store = JsonStore::in_memory();
        assert!(matches!(
            store.set("", json!(1)).unwrap_err(),
            StorageError::InvalidKey { .. }
        ));
        assert!(store.delete("a..b").is_err());
        assert_eq!(store.get(""), None);
    }

    #[test]
    fn test_delete_missing_is_false() {
        let store = JsonStore::in_memory();
        assert!(!store.delete("nothing.here").unwrap());
    }

    #[test]
    fn test_has_counts_explicit_null() {
        let store = JsonStore::in_memory();
        store.set("flag", Value::Null).unwrap();
        assert!(store.has("flag"));
        assert!(!store.has("other"));
    }

    #[test]
    fn test_clear() {
        let path = temp_file("clear");
        let store = JsonStore::open(&path).unwrap();
        store.set("x", json!(true)).unwrap();
        store.clear().unwrap();

        assert_eq!(store.snapshot(), json!({}));
        let reopened = JsonStore::open(&path).unwrap();
        assert_eq!(reopened.snapshot(), json!({}));
    }

    #[test]
    fn test_concurrent_writers() {
        let store = Arc::new(JsonStore::in_memory());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in 0..25 {
                        store.set(&format!("t{i}.k{j}"), json!(j)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let doc = store.snapshot();
        let total: usize = doc
            .as_object()
            .unwrap()
            .values()
            .map(|v| v.as_object().unwrap().len())
            .sum();
        assert_eq!(total, 200);
    }
}
