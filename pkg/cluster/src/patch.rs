use serde::Serialize;
use serde_json::{Map, Value};

/// A JSON merge patch (RFC 7386) computed between two snapshots of an object.
///
/// Only changed fields are carried; removed map entries become `null`, and
/// arrays are replaced wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct MergePatch {
    data: Value,
}

impl MergePatch {
    /// Build the patch that turns `original` into `modified`.
    pub fn merge_from<T: Serialize>(original: &T, modified: &T) -> serde_json::Result<Self> {
        let original = serde_json::to_value(original)?;
        let modified = serde_json::to_value(modified)?;
        Ok(Self {
            data: diff(&original, &modified),
        })
    }

    /// Wrap an already computed patch document.
    pub fn from_value(data: Value) -> Self {
        Self { data }
    }

    /// Make the patch apply only if the stored object still carries
    /// `resource_version`.
    pub fn with_optimistic_lock(mut self, resource_version: u64) -> Self {
        if !self.data.is_object() {
            self.data = Value::Object(Map::new());
        }
        if let Value::Object(root) = &mut self.data {
            let meta = root
                .entry("metadata")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(meta) = meta {
                meta.insert("resource_version".to_string(), Value::from(resource_version));
            }
        }
        self
    }

    /// Resource version the patch is locked to, if any.
    pub fn resource_version(&self) -> Option<u64> {
        self.data
            .get("metadata")
            .and_then(|m| m.get("resource_version"))
            .and_then(Value::as_u64)
    }

    pub fn is_empty(&self) -> bool {
        match &self.data {
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Apply the patch to `target` in place.
    pub fn apply_to(&self, target: &mut Value) {
        apply(target, &self.data);
    }
}

/// Compute the merge patch between two JSON documents.
pub fn diff(original: &Value, modified: &Value) -> Value {
    match (original, modified) {
        (Value::Object(orig), Value::Object(modi)) => {
            let mut patch = Map::new();
            for (key, orig_value) in orig {
                match modi.get(key) {
                    None => {
                        patch.insert(key.clone(), Value::Null);
                    }
                    Some(modi_value) if modi_value != orig_value => {
                        let nested = match (orig_value, modi_value) {
                            (Value::Object(_), Value::Object(_)) => diff(orig_value, modi_value),
                            _ => modi_value.clone(),
                        };
                        patch.insert(key.clone(), nested);
                    }
                    Some(_) => {}
                }
            }
            for (key, modi_value) in modi {
                if !orig.contains_key(key) {
                    patch.insert(key.clone(), modi_value.clone());
                }
            }
            Value::Object(patch)
        }
        _ => modified.clone(),
    }
}

/// Apply a merge patch document to `target`.
pub fn apply(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                apply(
                    target_map.entry(key.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
    }
}
