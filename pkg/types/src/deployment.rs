use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::impl_resource;
use crate::meta::{ObjectMeta, ResourceKind};
use crate::pod::PodTemplateSpec;

// --- Deployment strategy ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeploymentStrategy {
    RollingUpdate {
        #[serde(default = "default_max_surge")]
        max_surge: u32,
        #[serde(default = "default_max_unavailable")]
        max_unavailable: u32,
    },
    Recreate,
}

fn default_max_surge() -> u32 {
    1
}
fn default_max_unavailable() -> u32 {
    0
}

impl Default for DeploymentStrategy {
    fn default() -> Self {
        DeploymentStrategy::RollingUpdate {
            max_surge: 1,
            max_unavailable: 0,
        }
    }
}

// --- Deployment status ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentStatus {
    pub ready_replicas: u32,
    pub available_replicas: u32,
    pub updated_replicas: u32,
}

// --- Deployment spec ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeploymentSpec {
    /// Desired pod count; unset means 1
    #[serde(default)]
    pub replicas: Option<u32>,
    pub template: PodTemplateSpec,
    #[serde(default)]
    pub strategy: DeploymentStrategy,
    /// Label selector for matching pods
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
}

// --- Deployment ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deployment {
    pub metadata: ObjectMeta,
    pub spec: DeploymentSpec,
    #[serde(default)]
    pub status: DeploymentStatus,
}

impl_resource!(Deployment, ResourceKind::Deployment);
