use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::impl_resource;
use crate::meta::{ObjectMeta, ResourceKind};
use crate::pod::PodTemplateSpec;

// --- StatefulSet status ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatefulSetStatus {
    pub replicas: u32,
    pub ready_replicas: u32,
    pub current_revision: Option<String>,
}

// --- StatefulSet spec ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatefulSetSpec {
    /// Desired pod count; unset means 1
    #[serde(default)]
    pub replicas: Option<u32>,
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
    pub template: PodTemplateSpec,
    /// Headless service governing the stable network identities
    #[serde(default)]
    pub service_name: String,
}

// --- StatefulSet ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatefulSet {
    pub metadata: ObjectMeta,
    pub spec: StatefulSetSpec,
    #[serde(default)]
    pub status: StatefulSetStatus,
}

impl_resource!(StatefulSet, ResourceKind::StatefulSet);
