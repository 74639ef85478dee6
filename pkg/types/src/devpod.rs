use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use pkg_constants::devpod::DEFAULT_SELECTOR_LABEL;

use crate::validate::{validate_name, validate_selector};

// --- Dev pod declaration ---

/// A path inside a dev container whose contents survive pod restarts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersistentPath {
    /// Absolute path inside the container
    pub path: String,
    /// Sub path inside the claim; derived from `path` when unset
    #[serde(default)]
    pub volume_path: Option<String>,
    #[serde(default)]
    pub read_only: bool,
}

impl PersistentPath {
    /// Sub path inside the persistence claim backing this path.
    pub fn sub_path(&self) -> String {
        match &self.volume_path {
            Some(p) if !p.is_empty() => p.trim_start_matches('/').to_string(),
            _ => self.path.trim_start_matches('/').to_string(),
        }
    }
}

/// Overrides applied to one container of the replaced pod template.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DevContainer {
    /// Container to patch; the first container of the template when unset
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub dev_image: Option<String>,
    #[serde(default)]
    pub command: Option<Vec<String>>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Merged over the container's own environment
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub persist_paths: Vec<PersistentPath>,
}

/// Storage settings for the claim backing persisted paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceOptions {
    /// Storage quantity, e.g. "10Gi"
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub storage_class_name: Option<String>,
    #[serde(default)]
    pub access_modes: Option<Vec<String>>,
    /// Explicit claim name. A pre-existing claim with this name is reused
    /// and kept when the replacement is reverted.
    #[serde(default)]
    pub name: Option<String>,
}

/// Request to replace the pods of an existing workload with a
/// developer-controlled replica set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DevPod {
    pub name: String,
    /// Defaults to the active namespace of the cluster client
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub label_selector: BTreeMap<String, String>,
    /// Matches workloads running a container with exactly this image
    #[serde(default)]
    pub image_selector: Option<String>,
    #[serde(default)]
    pub dev_containers: Vec<DevContainer>,
    #[serde(default)]
    pub persistence_options: Option<PersistenceOptions>,
}

impl DevPod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn namespace_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => ns,
            _ => fallback,
        }
    }

    /// True if any dev container asks for persisted paths.
    pub fn has_persist_paths(&self) -> bool {
        self.dev_containers
            .iter()
            .any(|c| !c.persist_paths.is_empty())
    }

    /// The label selector used for target discovery. Falls back to
    /// `app=<name>` when neither a label nor an image selector is set.
    pub fn effective_label_selector(&self) -> BTreeMap<String, String> {
        if self.label_selector.is_empty() && self.image_selector.is_none() {
            return BTreeMap::from([(DEFAULT_SELECTOR_LABEL.to_string(), self.name.clone())]);
        }
        self.label_selector.clone()
    }

    /// Explicit claim name, if the user supplied one.
    pub fn explicit_claim_name(&self) -> Option<&str> {
        self.persistence_options
            .as_ref()
            .and_then(|o| o.name.as_deref())
            .filter(|n| !n.is_empty())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validate_name(&self.name)?;
        validate_selector(&self.label_selector)?;
        if let Some(ns) = &self.namespace {
            validate_name(ns)?;
        }
        if let Some(name) = self.explicit_claim_name() {
            validate_name(name)?;
        }
        Ok(())
    }
}

// --- Dev pod cache ---

/// Progress of a replacement as recorded ahead of each cluster mutation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReplacePhase {
    /// Target and replacement name are recorded; the replacement may or
    /// may not exist yet.
    #[default]
    Pending,
    /// The replacement was created.
    Replaced,
}

/// A persistence claim recorded before it is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub name: String,
    /// Created by us and owned by the replacement; deleted on revert.
    pub owned: bool,
}

/// Persisted mapping from a dev pod to its target and replacement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DevPodCache {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub target_kind: String,
    #[serde(default)]
    pub target_name: String,
    /// Name of the replacement replica set; empty if none was recorded
    #[serde(default)]
    pub replica_set: String,
    #[serde(default)]
    pub phase: ReplacePhase,
    #[serde(default)]
    pub claim: Option<ClaimRecord>,
}

impl DevPodCache {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn has_replacement(&self) -> bool {
        !self.replica_set.is_empty()
    }

    /// Record the intent to replace `target_kind/target_name` with
    /// `replica_set`. Must be persisted before the replacement is created.
    pub fn record_intent(
        &mut self,
        target_kind: impl Into<String>,
        target_name: impl Into<String>,
        replica_set: impl Into<String>,
    ) {
        self.target_kind = target_kind.into();
        self.target_name = target_name.into();
        self.replica_set = replica_set.into();
        self.phase = ReplacePhase::Pending;
    }

    pub fn mark_replaced(&mut self) {
        self.phase = ReplacePhase::Replaced;
    }
}
