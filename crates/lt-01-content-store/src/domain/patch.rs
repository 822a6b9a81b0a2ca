//! Operator-keyed document patch engine.
//!
//! Updates are JSON objects whose top-level keys are operators applied to
//! dotted field paths:
//!
//! ```text
//! { "$set":      { "stats.comments_count": 4 },
//!   "$inc":      { "stats.comment_order_seq": 1 },
//!   "$push":     { "votes.up_votes": {...} },
//!   "$pull":     { "votes": "carol" },
//!   "$addToSet": { "votes": "carol" },
//!   "$unset":    { "executer": 1 } }
//! ```
//!
//! A bare (non-`$`) top-level key is shorthand for `$set` of that path.
//! Both live mutation and undo replay go through this single entry point,
//! which is what makes inverse patches exact.

use serde_json::{Map, Value};

use super::errors::StoreError;

/// Apply `update` to `doc` in place.
pub fn apply_update(doc: &mut Value, update: &Value) -> Result<(), StoreError> {
    let fields = update
        .as_object()
        .ok_or_else(|| StoreError::invalid_patch("update must be an object"))?;

    for (key, spec) in fields {
        match key.as_str() {
            "$set" => for_each_path(spec, |path, value| set_path(doc, path, value.clone()))?,
            "$unset" => for_each_path(spec, |path, _| {
                unset_path(doc, path);
                Ok(())
            })?,
            "$inc" => for_each_path(spec, |path, value| inc_path(doc, path, value))?,
            "$push" => for_each_path(spec, |path, value| {
                with_array(doc, path, |items| items.push(value.clone()))
            })?,
            "$pull" => for_each_path(spec, |path, value| {
                with_array(doc, path, |items| items.retain(|item| item != value))
            })?,
            "$addToSet" => for_each_path(spec, |path, value| {
                with_array(doc, path, |items| {
                    if !items.contains(value) {
                        items.push(value.clone());
                    }
                })
            })?,
            other if other.starts_with('$') => {
                return Err(StoreError::UnsupportedOperator {
                    operator: other.to_string(),
                });
            }
            // Bare field: implicit $set, as the store's update shorthand.
            path => set_path(doc, path, spec.clone())?,
        }
    }

    Ok(())
}

fn for_each_path<F>(spec: &Value, mut apply: F) -> Result<(), StoreError>
where
    F: FnMut(&str, &Value) -> Result<(), StoreError>,
{
    let map = spec
        .as_object()
        .ok_or_else(|| StoreError::invalid_patch("operator argument must be an object"))?;
    for (path, value) in map {
        apply(path, value)?;
    }
    Ok(())
}

/// Read the value at a dotted path.
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write `value` at a dotted path, creating intermediate objects.
pub fn set_path(doc: &mut Value, path: &str, value: Value) -> Result<(), StoreError> {
    let (parent, leaf) = resolve_parent(doc, path)?;
    parent.insert(leaf.to_string(), value);
    Ok(())
}

fn unset_path(doc: &mut Value, path: &str) {
    let mut current = match doc.as_object_mut() {
        Some(map) => map,
        None => return,
    };
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.remove(segment);
            return;
        }
        current = match current.get_mut(segment).and_then(Value::as_object_mut) {
            Some(map) => map,
            None => return,
        };
    }
}

fn inc_path(doc: &mut Value, path: &str, delta: &Value) -> Result<(), StoreError> {
    let delta = delta
        .as_f64()
        .ok_or_else(|| StoreError::invalid_patch(format!("$inc on {} needs a number", path)))?;
    let current = get_path(doc, path).and_then(Value::as_f64).unwrap_or(0.0);
    let next = current + delta;
    // Keep integers integral; counters must not drift into floats.
    let next = if next.fract() == 0.0 && next.abs() < i64::MAX as f64 {
        Value::from(next as i64)
    } else {
        Value::from(next)
    };
    set_path(doc, path, next)
}

fn with_array<F>(doc: &mut Value, path: &str, mutate: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut Vec<Value>),
{
    let (parent, leaf) = resolve_parent(doc, path)?;
    let slot = parent
        .entry(leaf.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    let items = slot.as_array_mut().ok_or_else(|| {
        StoreError::invalid_patch(format!("array operator on non-array field {}", path))
    })?;
    mutate(items);
    Ok(())
}

/// Walk to the parent object of the final path segment, creating
/// intermediate objects along the way.
fn resolve_parent<'a>(
    doc: &'a mut Value,
    path: &'a str,
) -> Result<(&'a mut Map<String, Value>, &'a str), StoreError> {
    let root = match doc {
        Value::Object(map) => map,
        _ => return Err(StoreError::invalid_patch("document root must be an object")),
    };

    let segments: Vec<&str> = path.split('.').collect();
    let (leaf, parents) = segments
        .split_last()
        .ok_or_else(|| StoreError::invalid_patch("empty path"))?;

    Ok((descend(root, parents)?, leaf))
}

fn descend<'a>(
    map: &'a mut Map<String, Value>,
    segments: &[&str],
) -> Result<&'a mut Map<String, Value>, StoreError> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(map);
    };
    let slot = map
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    match slot {
        Value::Object(inner) => descend(inner, rest),
        _ => Err(StoreError::invalid_patch(format!(
            "path segment {} is not an object",
            head
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_dotted_path() {
        let mut doc = json!({"stats": {"comments_count": 1}});
        apply_update(&mut doc, &json!({"$set": {"stats.comments_count": 5}})).unwrap();
        assert_eq!(doc, json!({"stats": {"comments_count": 5}}));
    }

    #[test]
    fn test_set_creates_intermediates() {
        let mut doc = json!({});
        apply_update(&mut doc, &json!({"$set": {"a.b.c": true}})).unwrap();
        assert_eq!(doc, json!({"a": {"b": {"c": true}}}));
    }

    #[test]
    fn test_inc_and_unset() {
        let mut doc = json!({"stats": {"seq": 7}, "executer": "dan"});
        apply_update(
            &mut doc,
            &json!({"$inc": {"stats.seq": 1}, "$unset": {"executer": 1}}),
        )
        .unwrap();
        assert_eq!(doc, json!({"stats": {"seq": 8}}));
    }

    #[test]
    fn test_inc_missing_field_starts_at_zero() {
        let mut doc = json!({});
        apply_update(&mut doc, &json!({"$inc": {"n": 3}})).unwrap();
        assert_eq!(doc, json!({"n": 3}));
    }

    #[test]
    fn test_push_pull_add_to_set() {
        let mut doc = json!({"votes": ["alice"]});
        apply_update(&mut doc, &json!({"$addToSet": {"votes": "bob"}})).unwrap();
        apply_update(&mut doc, &json!({"$addToSet": {"votes": "bob"}})).unwrap();
        assert_eq!(doc, json!({"votes": ["alice", "bob"]}));

        apply_update(&mut doc, &json!({"$pull": {"votes": "alice"}})).unwrap();
        assert_eq!(doc, json!({"votes": ["bob"]}));

        apply_update(&mut doc, &json!({"$push": {"log": 1}})).unwrap();
        assert_eq!(doc["log"], json!([1]));
    }

    #[test]
    fn test_bare_key_is_implicit_set() {
        let mut doc = json!({"active": true, "url": "x"});
        apply_update(&mut doc, &json!({"active": false})).unwrap();
        assert_eq!(doc, json!({"active": false, "url": "x"}));
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let mut doc = json!({});
        let err = apply_update(&mut doc, &json!({"$rename": {"a": "b"}})).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedOperator { .. }));
    }

    #[test]
    fn test_inverse_patch_restores_document() {
        let mut doc = json!({"stats": {"count": 2, "seq": 9}});
        let inverse = json!({"$set": {"stats.count": 2, "stats.seq": 9}});

        apply_update(
            &mut doc,
            &json!({"$inc": {"stats.count": 1, "stats.seq": 1}}),
        )
        .unwrap();
        assert_eq!(doc, json!({"stats": {"count": 3, "seq": 10}}));

        apply_update(&mut doc, &inverse).unwrap();
        assert_eq!(doc, json!({"stats": {"count": 2, "seq": 9}}));
    }
}
