use std::collections::BTreeMap;

use tracing::debug;

use pkg_cluster::{ClusterApi, ClusterExt};
use pkg_constants::devpod::REPLACED_LABEL;
use pkg_types::devpod::DevPod;
use pkg_types::workload::{Workload, WorkloadKind};

use super::error::ReplaceError;

/// Find the workload whose pods `dev_pod` should replace.
///
/// Kinds are searched in [`WorkloadKind::ALL`] order and candidates of one
/// kind by name, so the same cluster state always yields the same target.
/// Replacements created by us and replica sets managed by a controller are
/// never targets.
pub async fn find_target_by_selector<C: ClusterApi + ?Sized>(
    client: &C,
    namespace: &str,
    dev_pod: &DevPod,
) -> Result<Option<Workload>, ReplaceError> {
    let selector = dev_pod.effective_label_selector();
    let image = dev_pod.image_selector.as_deref();

    for kind in WorkloadKind::ALL {
        let workloads = client
            .list_workloads(kind, namespace)
            .await
            .map_err(|e| ReplaceError::api("list", format!("{}s in {}", kind, namespace), e))?;

        let mut candidates: Vec<Workload> = workloads
            .into_iter()
            .filter(|w| is_replaceable(w) && matches(w, &selector, image))
            .collect();
        candidates.sort_by(|a, b| a.name().cmp(b.name()));

        if candidates.len() > 1 {
            debug!(
                "Dev pod {} matches {} {}s, using {}",
                dev_pod.name,
                candidates.len(),
                kind,
                candidates[0].name()
            );
        }
        if let Some(target) = candidates.into_iter().next() {
            return Ok(Some(target));
        }
    }

    Ok(None)
}

/// Fetch a target recorded by kind and name. `Ok(None)` if it no longer
/// exists.
pub async fn find_target_by_kind_name<C: ClusterApi + ?Sized>(
    client: &C,
    kind: &str,
    namespace: &str,
    name: &str,
) -> Result<Option<Workload>, ReplaceError> {
    let kind: WorkloadKind = kind
        .parse()
        .map_err(|_| ReplaceError::UnsupportedKind(kind.to_string()))?;

    match client.get_workload(kind, namespace, name).await {
        Ok(workload) => Ok(Some(workload)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(ReplaceError::api(
            "get",
            format!("{} {}/{}", kind, namespace, name),
            e,
        )),
    }
}

fn is_replaceable(workload: &Workload) -> bool {
    let meta = workload.meta();
    if meta.labels.contains_key(REPLACED_LABEL) {
        return false;
    }
    // replica sets rolled out by a deployment are reached through the deployment
    !(workload.kind() == WorkloadKind::ReplicaSet && meta.controller_ref().is_some())
}

fn matches(workload: &Workload, selector: &BTreeMap<String, String>, image: Option<&str>) -> bool {
    let template = workload.template();
    let labels_match = selector
        .iter()
        .all(|(k, v)| template.metadata.labels.get(k) == Some(v));
    let image_matches = match image {
        Some(image) => template.spec.containers.iter().any(|c| c.image == image),
        None => true,
    };
    labels_match && image_matches
}
