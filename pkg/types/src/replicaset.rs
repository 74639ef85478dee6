use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::impl_resource;
use crate::meta::{ObjectMeta, ResourceKind};
use crate::pod::PodTemplateSpec;

// --- ReplicaSet status ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicaSetStatus {
    pub replicas: u32,
    pub ready_replicas: u32,
    pub available_replicas: u32,
}

// --- ReplicaSet spec ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplicaSetSpec {
    /// Desired pod count; unset means 1
    #[serde(default)]
    pub replicas: Option<u32>,
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
    pub template: PodTemplateSpec,
}

// --- ReplicaSet ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplicaSet {
    pub metadata: ObjectMeta,
    pub spec: ReplicaSetSpec,
    #[serde(default)]
    pub status: ReplicaSetStatus,
}

impl_resource!(ReplicaSet, ResourceKind::ReplicaSet);
