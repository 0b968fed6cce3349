// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Field manipulation utilities for STAC items
//!
//! Dot-path addressing into JSON trees (`properties.eo:cloud_cover`),
//! recursive merging, and wildcard path expansion for update templates.

use std::collections::HashMap;

use serde_json::{Map, Value};

/// Merge strategies for [`deep_merge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Existing keys are kept, new keys are added
    KeepExisting,
    /// Overlay wins on every key (default)
    Overwrite,
    /// Only keys already present are overwritten, nothing is added
    UpdateOnly,
}

/// Get a nested field by dot-separated path
pub fn get_nested<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = item;
    for key in path.split('.') {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

/// Set a nested field by dot-separated path, creating intermediate objects
/// as needed. Non-object intermediates are replaced.
pub fn set_nested(item: &mut Value, path: &str, value: Value) {
    let keys: Vec<&str> = path.split('.').collect();
    let mut current = item;

    for key in &keys[..keys.len() - 1] {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let map = current.as_object_mut().expect("object ensured above");
        current = map
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    current
        .as_object_mut()
        .expect("object ensured above")
        .insert(keys[keys.len() - 1].to_string(), value);
}

/// Remove a nested field by dot-separated path. Missing segments are a no-op.
pub fn remove_nested(item: &mut Value, path: &str) {
    let keys: Vec<&str> = path.split('.').collect();
    let mut current = item;

    for key in &keys[..keys.len() - 1] {
        match current.as_object_mut().and_then(|m| m.get_mut(*key)) {
            Some(next) => current = next,
            None => return,
        }
    }

    if let Some(map) = current.as_object_mut() {
        map.remove(keys[keys.len() - 1]);
    }
}

/// Recursively merge `overlay` into `base`
pub fn deep_merge(base: &mut Value, overlay: &Value, strategy: MergeStrategy) {
    let Some(overlay_map) = overlay.as_object() else {
        return;
    };
    if !base.is_object() {
        *base = Value::Object(Map::new());
    }
    let base_map = base.as_object_mut().expect("object ensured above");

    for (key, value) in overlay_map {
        match base_map.get_mut(key) {
            Some(existing) if existing.is_object() && value.is_object() => {
                deep_merge(existing, value, strategy);
            }
            Some(existing) => {
                if strategy != MergeStrategy::KeepExisting {
                    *existing = value.clone();
                }
            }
            None => {
                if strategy != MergeStrategy::UpdateOnly {
                    base_map.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

/// Expand wildcard paths in an update template against an actual item.
///
/// A single `*` segment fans out over the keys of the object at its parent
/// path: `assets.*.href` expands to one entry per asset. Values may carry
/// `{item_id}`, `{collection_id}`, and (within a wildcard fan-out)
/// `{asset_key}` template variables.
pub fn expand_wildcard_paths(
    template: &Map<String, Value>,
    target: &Value,
    context: &HashMap<String, String>,
) -> Map<String, Value> {
    let mut context = context.clone();
    if !context.contains_key("item_id") {
        if let Some(id) = target.get("id").and_then(Value::as_str) {
            context.insert("item_id".to_string(), id.to_string());
        }
    }
    if !context.contains_key("collection_id") {
        if let Some(coll) = target.get("collection").and_then(Value::as_str) {
            context.insert("collection_id".to_string(), coll.to_string());
        }
    }

    let mut expanded = Map::new();

    for (path, value) in template {
        let parts: Vec<&str> = path.split('.').collect();
        let Some(wildcard_idx) = parts.iter().position(|p| *p == "*") else {
            expanded.insert(path.clone(), apply_template_variables(value, &context));
            continue;
        };

        let parent_path = parts[..wildcard_idx].join(".");
        let parent_obj = if parent_path.is_empty() {
            Some(target)
        } else {
            get_nested(target, &parent_path)
        };
        let Some(parent_map) = parent_obj.and_then(Value::as_object) else {
            continue;
        };

        let suffix = parts[wildcard_idx + 1..].join(".");

        for key in parent_map.keys() {
            let mut expanded_path = if parent_path.is_empty() {
                key.clone()
            } else {
                format!("{parent_path}.{key}")
            };
            if !suffix.is_empty() {
                expanded_path = format!("{expanded_path}.{suffix}");
            }

            let mut asset_context = context.clone();
            asset_context.insert("asset_key".to_string(), key.clone());
            expanded.insert(expanded_path, apply_template_variables(value, &asset_context));
        }
    }

    expanded
}

/// Substitute `{variable}` placeholders in string values; everything else
/// passes through unchanged.
pub fn apply_template_variables(value: &Value, context: &HashMap<String, String>) -> Value {
    let Some(text) = value.as_str() else {
        return value.clone();
    };

    let mut result = text.to_string();
    for (name, substitution) in context {
        let placeholder = format!("{{{name}}}");
        if result.contains(&placeholder) {
            result = result.replace(&placeholder, substitution);
        }
    }
    Value::String(result)
}
