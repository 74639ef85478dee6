use serde::{Deserialize, Serialize};

use crate::impl_resource;
use crate::meta::{ObjectMeta, ResourceKind};

/// Volume mount in a pod.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeMount {
    /// Name of the volume (must match a Volume in the pod spec)
    pub name: String,
    /// Path inside the container to mount the volume
    pub mount_path: String,
    /// Path within the volume to mount instead of its root
    #[serde(default)]
    pub sub_path: Option<String>,
    /// Whether to mount read-only
    #[serde(default)]
    pub read_only: bool,
}

/// Where the storage of a volume comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VolumeSource {
    /// A path on the host node's filesystem
    HostPath { path: String },
    /// An empty directory created when the pod starts, deleted when it stops
    EmptyDir {},
    /// A persistent volume claim reference
    PersistentVolumeClaim { claim_name: String },
    /// A configmap projected as files
    ConfigMap { name: String },
    /// A secret projected as files
    Secret { secret_name: String },
}

/// Named volume in a pod spec.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Volume {
    pub name: String,
    pub source: VolumeSource,
}

// --- Persistent Volume Claims ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccessMode {
    ReadWriteOnce,
    ReadOnlyMany,
    ReadWriteMany,
    ReadWriteOncePod,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::ReadWriteOnce => "ReadWriteOnce",
            AccessMode::ReadOnlyMany => "ReadOnlyMany",
            AccessMode::ReadWriteMany => "ReadWriteMany",
            AccessMode::ReadWriteOncePod => "ReadWriteOncePod",
        }
    }
}

impl std::str::FromStr for AccessMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ReadWriteOnce" => Ok(AccessMode::ReadWriteOnce),
            "ReadOnlyMany" => Ok(AccessMode::ReadOnlyMany),
            "ReadWriteMany" => Ok(AccessMode::ReadWriteMany),
            "ReadWriteOncePod" => Ok(AccessMode::ReadWriteOncePod),
            other => anyhow::bail!("unknown access mode '{}'", other),
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PVCPhase {
    #[default]
    Pending,
    Bound,
    Lost,
}

impl std::fmt::Display for PVCPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PVCPhase::Pending => write!(f, "Pending"),
            PVCPhase::Bound => write!(f, "Bound"),
            PVCPhase::Lost => write!(f, "Lost"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PersistentVolumeClaimSpec {
    /// Storage class name; `None` selects the cluster default
    #[serde(default)]
    pub storage_class: Option<String>,
    #[serde(default)]
    pub access_modes: Vec<AccessMode>,
    /// Requested storage as written by the user (e.g. "10Gi")
    #[serde(default)]
    pub storage: String,
    /// Requested storage in bytes
    #[serde(default)]
    pub requested_bytes: u64,
}

/// A request for storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistentVolumeClaim {
    pub metadata: ObjectMeta,
    pub spec: PersistentVolumeClaimSpec,
    /// Current phase
    #[serde(default)]
    pub phase: PVCPhase,
}

impl_resource!(PersistentVolumeClaim, ResourceKind::PersistentVolumeClaim);
