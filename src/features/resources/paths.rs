//! Small path language over JSON payloads.
//!
//! A path is a dot separated list of segments:
//! - `field` descends into an object field,
//! - `field[]` descends into the field and visits every array element,
//! - `*` visits every value of the current object.
//!
//! The empty path addresses the value itself. Missing fields end the walk
//! silently, which keeps strip lists and reference tables tolerant of
//! optional keys.

use serde_json::{Map, Value};
use shared::utilities::errors::AppError;

fn segments(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('.').collect()
    }
}

/// Calls `f` on every value addressed by `path`.
pub fn visit_mut<F>(value: &mut Value, path: &str, f: &mut F) -> Result<(), AppError>
where
    F: FnMut(&mut Value) -> Result<(), AppError>,
{
    walk(value, &segments(path), f)
}

fn walk<F>(value: &mut Value, segments: &[&str], f: &mut F) -> Result<(), AppError>
where
    F: FnMut(&mut Value) -> Result<(), AppError>,
{
    let Some((head, rest)) = segments.split_first() else {
        return f(value);
    };

    if *head == "*" {
        if let Value::Object(map) = value {
            for child in map.values_mut() {
                walk(child, rest, f)?;
            }
        }
        return Ok(());
    }

    let (field, each) = match head.strip_suffix("[]") {
        Some(field) => (field, true),
        None => (*head, false),
    };

    let Some(child) = value.get_mut(field) else {
        return Ok(());
    };

    if each {
        if let Value::Array(items) = child {
            for item in items {
                walk(item, rest, f)?;
            }
        }
        Ok(())
    } else {
        walk(child, rest, f)
    }
}

/// Calls `f` on every object that owns the last segment of `path`, with that segment's key.
pub fn visit_parents_mut<F>(value: &mut Value, path: &str, f: &mut F) -> Result<(), AppError>
where
    F: FnMut(&mut Map<String, Value>, &str) -> Result<(), AppError>,
{
    let (parent, key) = split_last(path);
    visit_mut(value, parent, &mut |slot| match slot {
        Value::Object(map) => f(map, key),
        _ => Ok(()),
    })
}

fn split_last(path: &str) -> (&str, &str) {
    match path.rsplit_once('.') {
        Some((parent, key)) => (parent, key),
        None => ("", path),
    }
}

/// Reads a plain dotted path. Array segments are not supported here.
pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path)
        .into_iter()
        .try_fold(value, |current, segment| current.get(segment))
        .filter(|found| !found.is_null())
}

pub fn get_str<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
    get(value, path).and_then(Value::as_str)
}

/// Sets a plain dotted path, creating intermediate objects as needed.
pub fn set(value: &mut Value, path: &str, new_value: Value) {
    let mut current = value;
    let parts = segments(path);
    let Some((last, parents)) = parts.split_last() else {
        *current = new_value;
        return;
    };
    for part in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map.entry(part.to_string()).or_insert(Value::Null),
            _ => return,
        };
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert(last.to_string(), new_value);
    }
}

/// Removes every field addressed by `path`. Absent keys are not an error.
pub fn remove(value: &mut Value, path: &str) {
    // The closure never fails.
    let _ = visit_parents_mut(value, path, &mut |map, key| {
        map.remove(key);
        Ok(())
    });
}

/// Copies only the fields addressed by `paths` into a fresh value.
///
/// Arrays named with `field[]` keep every element, each projected with the
/// remainder of the path. A path that ends on an object keeps it whole.
pub fn project(value: &Value, paths: &[&str]) -> Value {
    let split: Vec<Vec<&str>> = paths.iter().map(|path| segments(path)).collect();
    let refs: Vec<&[&str]> = split.iter().map(Vec::as_slice).collect();
    project_segments(value, &refs)
}

fn project_segments(value: &Value, paths: &[&[&str]]) -> Value {
    if paths.iter().any(|path| path.is_empty()) {
        return value.clone();
    }
    let Value::Object(map) = value else {
        return value.clone();
    };

    let mut projected = Map::new();
    for (key, child) in map {
        let array_head = format!("{key}[]");
        let mut direct = Vec::new();
        let mut each = Vec::new();
        for path in paths {
            let (head, rest) = (path[0], &path[1..]);
            if head == key || head == "*" {
                direct.push(rest);
            } else if head == array_head {
                each.push(rest);
            }
        }

        if !each.is_empty() {
            if let Value::Array(items) = child {
                let items = items
                    .iter()
                    .map(|item| project_segments(item, &each))
                    .collect();
                projected.insert(key.clone(), Value::Array(items));
                continue;
            }
            direct.extend(each);
        }
        if !direct.is_empty() {
            projected.insert(key.clone(), project_segments(child, &direct));
        }
    }
    Value::Object(projected)
}

/// Checks that `path` is present and non-null everywhere it applies.
pub fn is_present(value: &Value, path: &str) -> bool {
    present(value, &segments(path))
}

fn present(value: &Value, segments: &[&str]) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        return !value.is_null();
    };
    if *head == "*" {
        return match value {
            Value::Object(map) => map.values().all(|child| present(child, rest)),
            _ => false,
        };
    }
    match head.strip_suffix("[]") {
        Some(field) => match value.get(field) {
            Some(Value::Array(items)) => items.iter().all(|item| present(item, rest)),
            _ => false,
        },
        None => value.get(*head).is_some_and(|child| present(child, rest)),
    }
}
