//! Shared builders for the replacement tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use pkg_cluster::{ApiError, ClusterApi, MergePatch, RegistryClient, RemoteCache};
use pkg_state::MemoryStore;
use pkg_types::deployment::{Deployment, DeploymentSpec, DeploymentStatus, DeploymentStrategy};
use pkg_types::devpod::DevPod;
use pkg_types::meta::{ObjectMeta, ResourceKind};
use pkg_types::pod::{ContainerSpec, PodSpec, PodTemplateSpec, TemplateMeta};
use pkg_types::replicaset::{ReplicaSet, ReplicaSetSpec, ReplicaSetStatus};
use pkg_types::statefulset::{StatefulSet, StatefulSetSpec, StatefulSetStatus};

use super::ReplaceContext;

pub fn make_template(app: &str, image: &str) -> PodTemplateSpec {
    PodTemplateSpec {
        metadata: TemplateMeta {
            labels: BTreeMap::from([("app".to_string(), app.to_string())]),
            annotations: BTreeMap::new(),
        },
        spec: PodSpec {
            containers: vec![ContainerSpec {
                name: "app".to_string(),
                image: image.to_string(),
                ..Default::default()
            }],
            ..Default::default()
        },
    }
}

fn labels(app: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), app.to_string())])
}

pub fn make_deployment(name: &str, app: &str, replicas: Option<u32>) -> Deployment {
    let mut metadata = ObjectMeta::new(name, "default");
    metadata.labels = labels(app);
    Deployment {
        metadata,
        spec: DeploymentSpec {
            replicas,
            template: make_template(app, &format!("{}:1.0", app)),
            strategy: DeploymentStrategy::default(),
            selector: labels(app),
        },
        status: DeploymentStatus::default(),
    }
}

pub fn make_statefulset(name: &str, app: &str, replicas: Option<u32>) -> StatefulSet {
    StatefulSet {
        metadata: ObjectMeta::new(name, "default"),
        spec: StatefulSetSpec {
            replicas,
            selector: labels(app),
            template: make_template(app, &format!("{}:1.0", app)),
            service_name: name.to_string(),
        },
        status: StatefulSetStatus::default(),
    }
}

pub fn make_replicaset(name: &str, app: &str, replicas: Option<u32>) -> ReplicaSet {
    ReplicaSet {
        metadata: ObjectMeta::new(name, "default"),
        spec: ReplicaSetSpec {
            replicas,
            selector: labels(app),
            template: make_template(app, &format!("{}:1.0", app)),
        },
        status: ReplicaSetStatus::default(),
    }
}

/// A dev pod relying on the default `app=<name>` selector.
pub fn make_dev_pod(name: &str) -> DevPod {
    DevPod::new(name)
}

pub fn registry() -> RegistryClient<MemoryStore> {
    RegistryClient::new(MemoryStore::new(), "default")
}

pub fn context(client: Arc<dyn ClusterApi>) -> ReplaceContext {
    ReplaceContext::new(client, RemoteCache::new("default", "devspace-cache"))
}

/// Registry client with injectable misbehaviour.
pub struct FaultyClient {
    inner: RegistryClient<MemoryStore>,
    stuck_claims: bool,
    racing_replica_sets: bool,
}

impl FaultyClient {
    pub fn new(inner: RegistryClient<MemoryStore>) -> Self {
        Self {
            inner,
            stuck_claims: false,
            racing_replica_sets: false,
        }
    }

    /// Claim deletes are accepted but the claim never goes away.
    pub fn with_stuck_claims(mut self) -> Self {
        self.stuck_claims = true;
        self
    }

    /// Replica set creates always lose against an invisible writer.
    pub fn with_racing_replica_sets(mut self) -> Self {
        self.racing_replica_sets = true;
        self
    }
}

#[async_trait]
impl ClusterApi for FaultyClient {
    fn namespace(&self) -> &str {
        self.inner.namespace()
    }

    async fn get_raw(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<Value, ApiError> {
        self.inner.get_raw(kind, namespace, name).await
    }

    async fn list_raw(&self, kind: ResourceKind, namespace: &str) -> Result<Vec<Value>, ApiError> {
        self.inner.list_raw(kind, namespace).await
    }

    async fn create_raw(&self, kind: ResourceKind, namespace: &str, object: Value) -> Result<Value, ApiError> {
        if self.racing_replica_sets && kind == ResourceKind::ReplicaSet {
            let name = object["metadata"]["name"].as_str().unwrap_or_default().to_string();
            return Err(ApiError::AlreadyExists {
                kind,
                namespace: namespace.to_string(),
                name,
            });
        }
        self.inner.create_raw(kind, namespace, object).await
    }

    async fn patch_raw(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        patch: &MergePatch,
    ) -> Result<Value, ApiError> {
        self.inner.patch_raw(kind, namespace, name, patch).await
    }

    async fn delete_raw(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<(), ApiError> {
        if self.stuck_claims && kind == ResourceKind::PersistentVolumeClaim {
            return Ok(());
        }
        self.inner.delete_raw(kind, namespace, name).await
    }
}
