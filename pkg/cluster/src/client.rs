use async_trait::async_trait;
use serde_json::Value;

use pkg_types::meta::{Resource, ResourceKind};
use pkg_types::workload::{Workload, WorkloadKind};

use crate::error::ApiError;
use crate::patch::MergePatch;

/// Namespaced CRUD and merge-patch access to cluster objects.
///
/// Object-safe so controllers can hold an `Arc<dyn ClusterApi>`; typed
/// access lives in [`ClusterExt`].
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Namespace used when a request does not name one.
    fn namespace(&self) -> &str;

    async fn get_raw(&self, kind: ResourceKind, namespace: &str, name: &str)
    -> Result<Value, ApiError>;

    /// All objects of `kind` in `namespace`, ordered by name.
    async fn list_raw(&self, kind: ResourceKind, namespace: &str) -> Result<Vec<Value>, ApiError>;

    /// Create `object`; fails with [`ApiError::AlreadyExists`] if an object
    /// with the same name exists. Returns the stored object.
    async fn create_raw(
        &self,
        kind: ResourceKind,
        namespace: &str,
        object: Value,
    ) -> Result<Value, ApiError>;

    /// Apply a merge patch. Fails with [`ApiError::Conflict`] if the patch is
    /// locked to a resource version the stored object no longer has.
    async fn patch_raw(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        patch: &MergePatch,
    ) -> Result<Value, ApiError>;

    async fn delete_raw(&self, kind: ResourceKind, namespace: &str, name: &str)
    -> Result<(), ApiError>;
}

/// Typed helpers over [`ClusterApi`].
#[async_trait]
pub trait ClusterExt: ClusterApi {
    async fn get<T: Resource>(&self, namespace: &str, name: &str) -> Result<T, ApiError> {
        let value = self.get_raw(T::KIND, namespace, name).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn list<T: Resource>(&self, namespace: &str) -> Result<Vec<T>, ApiError> {
        self.list_raw(T::KIND, namespace)
            .await?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(ApiError::from))
            .collect()
    }

    async fn create<T: Resource>(&self, object: &T) -> Result<T, ApiError> {
        let value = serde_json::to_value(object)?;
        let created = self.create_raw(T::KIND, object.namespace(), value).await?;
        Ok(serde_json::from_value(created)?)
    }

    async fn patch<T: Resource>(
        &self,
        namespace: &str,
        name: &str,
        patch: &MergePatch,
    ) -> Result<T, ApiError> {
        let value = self.patch_raw(T::KIND, namespace, name, patch).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn delete<T: Resource>(&self, namespace: &str, name: &str) -> Result<(), ApiError> {
        self.delete_raw(T::KIND, namespace, name).await
    }

    async fn get_workload(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
    ) -> Result<Workload, ApiError> {
        let value = self.get_raw(kind.resource_kind(), namespace, name).await?;
        Ok(Workload::from_value(kind, value)?)
    }

    async fn list_workloads(
        &self,
        kind: WorkloadKind,
        namespace: &str,
    ) -> Result<Vec<Workload>, ApiError> {
        self.list_raw(kind.resource_kind(), namespace)
            .await?
            .into_iter()
            .map(|v| Workload::from_value(kind, v).map_err(ApiError::from))
            .collect()
    }

    /// Apply a merge patch to a workload of any kind.
    async fn patch_workload(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
        patch: &MergePatch,
    ) -> Result<Workload, ApiError> {
        let value = self
            .patch_raw(kind.resource_kind(), namespace, name, patch)
            .await?;
        Ok(Workload::from_value(kind, value)?)
    }
}

impl<C: ClusterApi + ?Sized> ClusterExt for C {}
