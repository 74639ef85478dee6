use tracing::info;

use pkg_cluster::{ClusterApi, ClusterExt, MergePatch};
use pkg_constants::devpod::REPLICAS_ANNOTATION;
use pkg_types::workload::Workload;

use super::error::ReplaceError;

/// Scale `target` to zero, remembering its replica count in an annotation.
///
/// A target already at zero is left untouched, so repeated calls never
/// overwrite the remembered count with zero. A count remembered by an
/// earlier scale-down is kept when the target was scaled back up by hand,
/// unless it does not parse, in which case the current count replaces it.
/// Returns whether the target was patched.
pub async fn scale_down_target<C: ClusterApi + ?Sized>(
    client: &C,
    target: &Workload,
) -> Result<bool, ReplaceError> {
    // unset replicas means one
    let replicas = target.replicas().unwrap_or(1);
    if replicas == 0 {
        return Ok(false);
    }

    let remembered = target
        .meta()
        .annotation(REPLICAS_ANNOTATION)
        .and_then(|v| v.trim().parse::<u32>().ok());
    let mut scaled = target.clone();
    if remembered.is_none() {
        scaled
            .meta_mut()
            .annotations
            .insert(REPLICAS_ANNOTATION.to_string(), replicas.to_string());
    }
    scaled.set_replicas(0);

    patch_target(client, target, &scaled, "scale down").await?;
    info!("Scaled down {} from {} to 0 replicas", target, replicas);
    Ok(true)
}

/// Restore the replica count remembered by [`scale_down_target`] and drop
/// the annotation. Returns the restored count.
pub async fn scale_up_target<C: ClusterApi + ?Sized>(
    client: &C,
    target: &Workload,
) -> Result<u32, ReplaceError> {
    let value = target
        .meta()
        .annotation(REPLICAS_ANNOTATION)
        .ok_or_else(|| ReplaceError::MissingReplicasAnnotation {
            kind: target.kind(),
            namespace: target.namespace().to_string(),
            name: target.name().to_string(),
        })?;
    let replicas: u32 =
        value
            .trim()
            .parse()
            .map_err(|_| ReplaceError::InvalidReplicasAnnotation {
                kind: target.kind(),
                namespace: target.namespace().to_string(),
                name: target.name().to_string(),
                value: value.to_string(),
            })?;

    let mut restored = target.clone();
    restored.meta_mut().annotations.remove(REPLICAS_ANNOTATION);
    restored.set_replicas(replicas);

    patch_target(client, target, &restored, "scale up").await?;
    info!("Scaled up {} to {} replicas", target, replicas);
    Ok(replicas)
}

async fn patch_target<C: ClusterApi + ?Sized>(
    client: &C,
    current: &Workload,
    desired: &Workload,
    op: &'static str,
) -> Result<Workload, ReplaceError> {
    let patch = MergePatch::merge_from(current, desired)
        .map_err(|e| ReplaceError::serialization("scale patch", e))?
        .with_optimistic_lock(current.meta().resource_version);
    client
        .patch_workload(current.kind(), current.namespace(), current.name(), &patch)
        .await
        .map_err(|e| ReplaceError::api(op, current, e))
}
