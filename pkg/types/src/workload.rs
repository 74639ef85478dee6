//! The scalable workload kinds whose pods a dev pod can replace.
//!
//! Code that needs to treat all kinds alike goes through [`Scalable`] (one
//! implementation per kind) or the [`Workload`] enum, never through a
//! per-kind match of its own.

use serde::Serialize;

use crate::deployment::Deployment;
use crate::meta::{ObjectMeta, Resource, ResourceKind};
use crate::pod::PodTemplateSpec;
use crate::replicaset::ReplicaSet;
use crate::statefulset::StatefulSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    ReplicaSet,
}

impl WorkloadKind {
    /// All kinds in target discovery order.
    pub const ALL: [WorkloadKind; 3] = [
        WorkloadKind::Deployment,
        WorkloadKind::StatefulSet,
        WorkloadKind::ReplicaSet,
    ];

    pub fn as_str(&self) -> &'static str {
        self.resource_kind().as_str()
    }

    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            WorkloadKind::Deployment => ResourceKind::Deployment,
            WorkloadKind::StatefulSet => ResourceKind::StatefulSet,
            WorkloadKind::ReplicaSet => ResourceKind::ReplicaSet,
        }
    }
}

impl std::str::FromStr for WorkloadKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkloadKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unsupported workload kind '{}'", s))
    }
}

impl std::fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Replica count and pod template access for a workload kind.
pub trait Scalable: Resource {
    const WORKLOAD_KIND: WorkloadKind;

    /// Desired replicas; `None` when the field is unset.
    fn replicas(&self) -> Option<u32>;
    fn set_replicas(&mut self, replicas: u32);
    fn template(&self) -> &PodTemplateSpec;

    /// Wrap into the kind-erased [`Workload`].
    fn into_workload(self) -> Workload;
}

impl Scalable for Deployment {
    const WORKLOAD_KIND: WorkloadKind = WorkloadKind::Deployment;

    fn replicas(&self) -> Option<u32> {
        self.spec.replicas
    }

    fn set_replicas(&mut self, replicas: u32) {
        self.spec.replicas = Some(replicas);
    }

    fn template(&self) -> &PodTemplateSpec {
        &self.spec.template
    }

    fn into_workload(self) -> Workload {
        Workload::Deployment(self)
    }
}

impl Scalable for StatefulSet {
    const WORKLOAD_KIND: WorkloadKind = WorkloadKind::StatefulSet;

    fn replicas(&self) -> Option<u32> {
        self.spec.replicas
    }

    fn set_replicas(&mut self, replicas: u32) {
        self.spec.replicas = Some(replicas);
    }

    fn template(&self) -> &PodTemplateSpec {
        &self.spec.template
    }

    fn into_workload(self) -> Workload {
        Workload::StatefulSet(self)
    }
}

impl Scalable for ReplicaSet {
    const WORKLOAD_KIND: WorkloadKind = WorkloadKind::ReplicaSet;

    fn replicas(&self) -> Option<u32> {
        self.spec.replicas
    }

    fn set_replicas(&mut self, replicas: u32) {
        self.spec.replicas = Some(replicas);
    }

    fn template(&self) -> &PodTemplateSpec {
        &self.spec.template
    }

    fn into_workload(self) -> Workload {
        Workload::ReplicaSet(self)
    }
}

/// One target workload of any supported kind.
///
/// Serializes as the wrapped object, so merge patches computed between two
/// `Workload` snapshots apply directly to the stored object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Workload {
    Deployment(Deployment),
    StatefulSet(StatefulSet),
    ReplicaSet(ReplicaSet),
}

macro_rules! dispatch {
    ($self:expr, $w:ident => $body:expr) => {
        match $self {
            Workload::Deployment($w) => $body,
            Workload::StatefulSet($w) => $body,
            Workload::ReplicaSet($w) => $body,
        }
    };
}

impl Workload {
    /// Decode a stored object of the given kind.
    pub fn from_value(kind: WorkloadKind, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            WorkloadKind::Deployment => Workload::Deployment(serde_json::from_value(value)?),
            WorkloadKind::StatefulSet => Workload::StatefulSet(serde_json::from_value(value)?),
            WorkloadKind::ReplicaSet => Workload::ReplicaSet(serde_json::from_value(value)?),
        })
    }

    pub fn kind(&self) -> WorkloadKind {
        match self {
            Workload::Deployment(_) => WorkloadKind::Deployment,
            Workload::StatefulSet(_) => WorkloadKind::StatefulSet,
            Workload::ReplicaSet(_) => WorkloadKind::ReplicaSet,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        dispatch!(self, w => w.meta())
    }

    pub fn meta_mut(&mut self) -> &mut ObjectMeta {
        dispatch!(self, w => w.meta_mut())
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }

    pub fn namespace(&self) -> &str {
        &self.meta().namespace
    }

    pub fn replicas(&self) -> Option<u32> {
        dispatch!(self, w => w.replicas())
    }

    pub fn set_replicas(&mut self, replicas: u32) {
        dispatch!(self, w => w.set_replicas(replicas))
    }

    pub fn template(&self) -> &PodTemplateSpec {
        dispatch!(self, w => w.template())
    }
}

impl std::fmt::Display for Workload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.kind(), self.namespace(), self.name())
    }
}
