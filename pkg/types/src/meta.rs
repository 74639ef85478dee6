use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// --- Resource kinds ---

/// Every object kind the dev pod controller reads or writes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Deployment,
    StatefulSet,
    ReplicaSet,
    PersistentVolumeClaim,
    ConfigMap,
}

impl ResourceKind {
    /// Plural path segment used in registry keys.
    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Deployment => "deployments",
            ResourceKind::StatefulSet => "statefulsets",
            ResourceKind::ReplicaSet => "replicasets",
            ResourceKind::PersistentVolumeClaim => "persistentvolumeclaims",
            ResourceKind::ConfigMap => "configmaps",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Deployment => "Deployment",
            ResourceKind::StatefulSet => "StatefulSet",
            ResourceKind::ReplicaSet => "ReplicaSet",
            ResourceKind::PersistentVolumeClaim => "PersistentVolumeClaim",
            ResourceKind::ConfigMap => "ConfigMap",
        }
    }

    /// API group/version stamped into owner references.
    pub fn api_version(&self) -> &'static str {
        match self {
            ResourceKind::Deployment | ResourceKind::StatefulSet | ResourceKind::ReplicaSet => {
                "apps/v1"
            }
            ResourceKind::PersistentVolumeClaim | ResourceKind::ConfigMap => "v1",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// --- Owner references ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
    /// True if the owner is the managing controller; dependents are
    /// garbage-collected together with it.
    #[serde(default)]
    pub controller: bool,
}

// --- Object metadata ---

/// Metadata shared by every stored object.
///
/// Maps are ordered so that serializing the same object twice yields the
/// same bytes; config hashes and merge patches depend on that.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    /// Assigned by the registry on create.
    #[serde(default)]
    pub uid: String,
    /// Bumped by the registry on every write.
    #[serde(default)]
    pub resource_version: u64,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub owner_references: Vec<OwnerReference>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// The owner reference marked as controller, if any.
    pub fn controller_ref(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|r| r.controller)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

// --- Resource trait ---

/// A typed object the cluster API can store.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn meta(&self) -> &ObjectMeta;
    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn name(&self) -> &str {
        &self.meta().name
    }

    fn namespace(&self) -> &str {
        &self.meta().namespace
    }

    /// Owner reference pointing at this object with controller semantics.
    fn controller_owner_ref(&self) -> OwnerReference {
        OwnerReference {
            api_version: Self::KIND.api_version().to_string(),
            kind: Self::KIND.as_str().to_string(),
            name: self.meta().name.clone(),
            uid: self.meta().uid.clone(),
            controller: true,
        }
    }
}

/// Implements [`Resource`] for a struct with a `metadata: ObjectMeta` field.
#[macro_export]
macro_rules! impl_resource {
    ($ty:ty, $kind:expr) => {
        impl $crate::meta::Resource for $ty {
            const KIND: $crate::meta::ResourceKind = $kind;

            fn meta(&self) -> &$crate::meta::ObjectMeta {
                &self.metadata
            }

            fn meta_mut(&mut self) -> &mut $crate::meta::ObjectMeta {
                &mut self.metadata
            }
        }
    };
}
