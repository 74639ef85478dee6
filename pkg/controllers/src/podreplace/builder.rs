use serde::Serialize;
use serde_json::Value;

use pkg_constants::devpod::{
    CONFIG_HASH_ANNOTATION, POD_TEMPLATE_HASH_LABEL, REPLACED_LABEL, REPLACED_LABEL_VALUE,
    REPLACEMENT_REPLICAS, REPLACEMENT_SUFFIX, TARGET_KIND_ANNOTATION, TARGET_NAME_ANNOTATION,
};
use pkg_types::devpod::DevPod;
use pkg_types::meta::ObjectMeta;
use pkg_types::replicaset::{ReplicaSet, ReplicaSetSpec, ReplicaSetStatus};
use pkg_types::workload::Workload;

use super::devcontainer::apply_dev_containers;
use super::error::ReplaceError;
use super::hash::hash_config;

/// Name of the replica set replacing `target_name`.
pub fn replacement_name(target_name: &str) -> String {
    format!("{}{}", target_name, REPLACEMENT_SUFFIX)
}

/// Name of the claim backing persisted paths of the replacement `replica_set`.
pub fn claim_name(replica_set: &str, dev_pod: &DevPod) -> String {
    dev_pod
        .explicit_claim_name()
        .map(str::to_string)
        .unwrap_or_else(|| replica_set.to_string())
}

/// Build the desired replacement for `target`. Pure: the same inputs always
/// produce the same replica set.
pub fn build_replica_set(
    name: &str,
    target: &Workload,
    dev_pod: &DevPod,
) -> Result<ReplicaSet, ReplaceError> {
    let mut template = target.template().clone();
    template.metadata.labels.remove(POD_TEMPLATE_HASH_LABEL);
    template.metadata.labels.insert(
        REPLACED_LABEL.to_string(),
        REPLACED_LABEL_VALUE.to_string(),
    );
    apply_dev_containers(
        &mut template,
        dev_pod,
        &claim_name(name, dev_pod),
        &target.to_string(),
    )?;

    let mut metadata = ObjectMeta::new(name, target.namespace());
    metadata.labels = target.meta().labels.clone();
    metadata.labels.insert(
        REPLACED_LABEL.to_string(),
        REPLACED_LABEL_VALUE.to_string(),
    );
    metadata.annotations.insert(
        TARGET_KIND_ANNOTATION.to_string(),
        target.kind().as_str().to_string(),
    );
    metadata
        .annotations
        .insert(TARGET_NAME_ANNOTATION.to_string(), target.name().to_string());
    metadata
        .annotations
        .insert(CONFIG_HASH_ANNOTATION.to_string(), hash_config(dev_pod)?);

    Ok(ReplicaSet {
        metadata,
        spec: ReplicaSetSpec {
            replicas: Some(REPLACEMENT_REPLICAS),
            selector: template.metadata.labels.clone(),
            template,
        },
        status: ReplicaSetStatus::default(),
    })
}

/// Compare two objects ignoring the difference between absent, `null`,
/// empty and default-`false` fields.
pub fn semantically_equal<T: Serialize>(a: &T, b: &T) -> Result<bool, ReplaceError> {
    let a = serde_json::to_value(a).map_err(|e| ReplaceError::serialization("pod template", e))?;
    let b = serde_json::to_value(b).map_err(|e| ReplaceError::serialization("pod template", e))?;
    Ok(normalize(a) == normalize(b))
}

fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !is_empty(v))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        other => other,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
