use tracing::{debug, info};

use pkg_cluster::ClusterExt;
use pkg_constants::devpod::{DEFAULT_PVC_ACCESS_MODE, DEFAULT_PVC_SIZE};
use pkg_types::devpod::{ClaimRecord, DevPod};
use pkg_types::meta::{ObjectMeta, Resource};
use pkg_types::quantity::parse_quantity;
use pkg_types::replicaset::ReplicaSet;
use pkg_types::volume::{AccessMode, PVCPhase, PersistentVolumeClaim, PersistentVolumeClaimSpec};

use super::builder::claim_name;
use super::error::ReplaceError;
use super::{ReplaceContext, ReplacerOptions};

/// Build the claim backing the persisted paths of `replica_set`.
///
/// Claims named after the replacement are owned by it and collected
/// together with it; an explicitly named claim has no owner.
pub fn build_claim(
    replica_set: &ReplicaSet,
    dev_pod: &DevPod,
) -> Result<PersistentVolumeClaim, ReplaceError> {
    let options = dev_pod.persistence_options.clone().unwrap_or_default();

    let storage = options
        .size
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_PVC_SIZE.to_string());
    let requested_bytes =
        parse_quantity(&storage).map_err(|e| ReplaceError::InvalidQuantity {
            value: storage.clone(),
            reason: e.to_string(),
        })?;

    let access_modes = match options.access_modes {
        Some(modes) if !modes.is_empty() => modes
            .iter()
            .map(|m| {
                m.parse::<AccessMode>()
                    .map_err(|_| ReplaceError::InvalidAccessMode(m.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => vec![
            DEFAULT_PVC_ACCESS_MODE
                .parse::<AccessMode>()
                .map_err(|_| ReplaceError::InvalidAccessMode(DEFAULT_PVC_ACCESS_MODE.to_string()))?,
        ],
    };

    let mut metadata = ObjectMeta::new(claim_name(replica_set.name(), dev_pod), replica_set.namespace());
    if dev_pod.explicit_claim_name().is_none() {
        metadata.owner_references.push(replica_set.controller_owner_ref());
    }

    Ok(PersistentVolumeClaim {
        metadata,
        spec: PersistentVolumeClaimSpec {
            storage_class: options.storage_class_name.filter(|s| !s.is_empty()),
            access_modes,
            storage,
            requested_bytes,
        },
        phase: PVCPhase::Pending,
    })
}

/// Make sure the claim for `replica_set` exists.
///
/// An explicitly named claim that already exists is adopted as is. A claim
/// carrying the replacement's name but left over from an earlier
/// replacement is deleted, and recreated once it has terminated.
pub async fn ensure_pvc(
    ctx: &ReplaceContext,
    options: &ReplacerOptions,
    replica_set: &ReplicaSet,
    dev_pod: &DevPod,
) -> Result<ClaimRecord, ReplaceError> {
    let claim = build_claim(replica_set, dev_pod)?;
    let namespace = claim.namespace().to_string();
    let name = claim.name().to_string();
    let owned = dev_pod.explicit_claim_name().is_none();
    let record = ClaimRecord {
        name: name.clone(),
        owned,
    };

    let err = match ctx.client.create(&claim).await {
        Ok(_) => {
            info!("Created persistent volume claim {}/{}", namespace, name);
            return Ok(record);
        }
        Err(e) => e,
    };
    if !err.is_already_exists() {
        return Err(ReplaceError::api("create persistent volume claim", &name, err));
    }
    if !owned {
        info!("Using existing persistent volume claim {}/{}", namespace, name);
        return Ok(record);
    }

    let existing = match ctx.client.get::<PersistentVolumeClaim>(&namespace, &name).await {
        Ok(existing) => Some(existing),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(ReplaceError::api("get persistent volume claim", &name, e)),
    };
    if let Some(existing) = existing {
        if existing
            .metadata
            .controller_ref()
            .is_some_and(|r| r.uid == replica_set.metadata.uid)
        {
            debug!("Persistent volume claim {}/{} already belongs to {}", namespace, name, replica_set.name());
            return Ok(record);
        }

        info!("Deleting stale persistent volume claim {}/{}", namespace, name);
        match ctx
            .client
            .delete::<PersistentVolumeClaim>(&namespace, &name)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(ReplaceError::api("delete persistent volume claim", &name, e)),
        }
        wait_for_claim_termination(ctx, options, &namespace, &name).await?;
    }

    ctx.client
        .create(&claim)
        .await
        .map_err(|e| ReplaceError::api("create persistent volume claim", &name, e))?;
    info!("Created persistent volume claim {}/{}", namespace, name);
    Ok(record)
}

async fn wait_for_claim_termination(
    ctx: &ReplaceContext,
    options: &ReplacerOptions,
    namespace: &str,
    name: &str,
) -> Result<(), ReplaceError> {
    info!(
        "Waiting for persistent volume claim {}/{} to terminate",
        namespace, name
    );

    let poll = async {
        loop {
            match ctx
                .client
                .get::<PersistentVolumeClaim>(namespace, name)
                .await
            {
                Err(e) if e.is_not_found() => return,
                Err(e) => debug!("Error checking persistent volume claim {}/{}: {}", namespace, name, e),
                Ok(_) => {}
            }
            tokio::time::sleep(options.claim_termination_poll).await;
        }
    };

    tokio::select! {
        res = tokio::time::timeout(options.claim_termination_timeout, poll) => {
            res.map_err(|_| ReplaceError::PvcTerminationTimeout {
                namespace: namespace.to_string(),
                name: name.to_string(),
                timeout_secs: options.claim_termination_timeout.as_secs(),
            })
        }
        _ = ctx.cancelled() => {
            Err(ReplaceError::Cancelled("waiting for a persistent volume claim to terminate"))
        }
    }
}
