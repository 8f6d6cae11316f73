//! Dot-path traversal over a `serde_json::Value` document.

use serde_json::{Map, Value};

use super::{StorageError, StorageResult};

/// Escapes `.` and `\` so that `segment` is read back as one path segment.
pub fn escape_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for ch in segment.chars() {
        if ch == '.' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Splits `key` on unescaped dots.
pub(crate) fn split(key: &str) -> StorageResult<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut escape_next = false;

    for ch in key.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }
        match ch {
            '\\' => escape_next = true,
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    if escape_next {
        current.push('\\');
    }
    segments.push(current);

    if segments.iter().any(String::is_empty) {
        return Err(StorageError::invalid_key(key));
    }
    Ok(segments)
}

/// How many `null`s a write may append to reach its index.
const MAX_ARRAY_GAP: usize = 1024;

fn parse_index(segment: &str) -> Option<usize> {
    if segment.bytes().all(|b| b.is_ascii_digit()) {
        segment.parse().ok()
    } else {
        None
    }
}

pub(crate) fn get<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => parse_index(segment).and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Writes `value` at `segments`.
///
/// Missing or `null` intermediates become objects; arrays are padded with
/// `null` up to a numeric index. Walking through any other scalar is a
/// conflict. On error `root` may already hold new empty intermediates, so
/// callers that need atomicity work on a copy.
pub(crate) fn set(
    root: &mut Value,
    key: &str,
    segments: &[String],
    value: Value,
) -> StorageResult<()> {
    let Some((last, parents)) = segments.split_last() else {
        return Err(StorageError::invalid_key(key));
    };

    let mut node = root;
    for segment in parents {
        node = child_mut(node, key, segment)?;
    }

    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            *slot(items, key, last)? = value;
            Ok(())
        }
        _ => Err(StorageError::conflict(key, last)),
    }
}

fn child_mut<'a>(node: &'a mut Value, key: &str, segment: &str) -> StorageResult<&'a mut Value> {
    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => Ok(map.entry(segment.to_string()).or_insert(Value::Null)),
        Value::Array(items) => slot(items, key, segment),
        _ => Err(StorageError::conflict(key, segment)),
    }
}

/// Returns the element at `segment`, padding with `null` up to it.
fn slot<'a>(items: &'a mut Vec<Value>, key: &str, segment: &str) -> StorageResult<&'a mut Value> {
    let idx = parse_index(segment).ok_or_else(|| StorageError::conflict(key, segment))?;
    if idx >= items.len() {
        if idx - items.len() >= MAX_ARRAY_GAP {
            return Err(StorageError::IndexOutOfRange {
                key: key.to_string(),
                index: idx,
                len: items.len(),
            });
        }
        items.resize(idx + 1, Value::Null);
    }
    Ok(&mut items[idx])
}

/// Removes the value at `segments`. Array elements are removed, shifting the
/// rest down.
pub(crate) fn delete(root: &mut Value, segments: &[String]) -> bool {
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut node = root;
    for segment in parents {
        let next = match node {
            Value::Object(map) => map.get_mut(segment),
            Value::Array(items) => parse_index(segment).and_then(|i| items.get_mut(i)),
            _ => None,
        };
        match next {
            Some(child) => node = child,
            None => return false,
        }
    }

    match node {
        Value::Object(map) => map.remove(last).is_some(),
        Value::Array(items) => match parse_index(last) {
            Some(idx) if idx < items.len() => {
                items.remove(idx);
                true
            }
            _ => false,
        },
        _ => false,
    }
}
