//! Operator-key escape codec.
//!
//! Undo payloads are patch documents, and patch documents use `$`-prefixed
//! keys as mutation operators. When such a payload is itself persisted
//! (inside an undo frame) those keys must survive as opaque content, so
//! they are escaped on write and unescaped on read, recursively through
//! nested objects and arrays.
//!
//! `{"$set": {"a": 1}}` ⇄ `{"@$set": {"a": 1}}`

use serde_json::Value;

/// Escape `$`-prefixed keys to `@$`-prefixed ones, in place.
pub fn escape_keys(value: &mut Value) {
    transform_keys(value, &|key| {
        if key.starts_with('$') {
            Some(format!("@{}", key))
        } else {
            None
        }
    });
}

/// Reverse of [`escape_keys`]: strip the `@` from `@$`-prefixed keys.
pub fn unescape_keys(value: &mut Value) {
    transform_keys(value, &|key| {
        key.strip_prefix("@$").map(|rest| format!("${}", rest))
    });
}

fn transform_keys(value: &mut Value, rename: &dyn Fn(&str) -> Option<String>) {
    match value {
        Value::Object(map) => {
            let entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
            for (key, mut inner) in entries {
                transform_keys(&mut inner, rename);
                let key = rename(&key).unwrap_or(key);
                map.insert(key, inner);
            }
        }
        Value::Array(items) => {
            for item in items {
                transform_keys(item, rename);
            }
        }
        _ => {}
    }
}
