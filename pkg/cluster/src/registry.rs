use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use pkg_constants::state::REGISTRY_PREFIX;
use pkg_state::Store;
use pkg_types::meta::ResourceKind;

use crate::client::ClusterApi;
use crate::error::ApiError;
use crate::patch::MergePatch;

/// [`ClusterApi`] implemented directly on the registry store.
///
/// Objects live at `/registry/<plural>/<namespace>/<name>` as JSON. The
/// client assigns `uid`, `created_at` and a monotonically increasing
/// `resource_version`, and enforces create-uniqueness and optimistic locks.
#[derive(Clone)]
pub struct RegistryClient<S> {
    store: S,
    namespace: String,
}

impl<S: Store> RegistryClient<S> {
    pub fn new(store: S, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn key(kind: ResourceKind, namespace: &str, name: &str) -> String {
        format!("{}{}/{}/{}", REGISTRY_PREFIX, kind.plural(), namespace, name)
    }

    async fn load(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Value>, ApiError> {
        let key = Self::key(kind, namespace, name);
        match self.store.get(&key).await.map_err(ApiError::Store)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        object: &Value,
    ) -> Result<(), ApiError> {
        let key = Self::key(kind, namespace, name);
        let data = serde_json::to_vec(object)?;
        self.store.put(&key, &data).await.map_err(ApiError::Store)
    }
}

fn resource_version(object: &Value) -> u64 {
    object
        .get("metadata")
        .and_then(|m| m.get("resource_version"))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

fn metadata_mut(
    kind: ResourceKind,
    object: &mut Value,
) -> Result<&mut serde_json::Map<String, Value>, ApiError> {
    object
        .get_mut("metadata")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| ApiError::Invalid {
            kind,
            reason: "missing metadata".to_string(),
        })
}

#[async_trait]
impl<S: Store> ClusterApi for RegistryClient<S> {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get_raw(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Value, ApiError> {
        self.load(kind, namespace, name)
            .await?
            .ok_or_else(|| ApiError::not_found(kind, namespace, name))
    }

    async fn list_raw(&self, kind: ResourceKind, namespace: &str) -> Result<Vec<Value>, ApiError> {
        let prefix = format!("{}{}/{}/", REGISTRY_PREFIX, kind.plural(), namespace);
        let entries = self
            .store
            .list_prefix(&prefix)
            .await
            .map_err(ApiError::Store)?;
        entries
            .into_iter()
            .map(|(_, v)| serde_json::from_slice(&v).map_err(ApiError::from))
            .collect()
    }

    async fn create_raw(
        &self,
        kind: ResourceKind,
        namespace: &str,
        mut object: Value,
    ) -> Result<Value, ApiError> {
        let meta = metadata_mut(kind, &mut object)?;
        let name = match meta.get("name").and_then(Value::as_str) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => {
                return Err(ApiError::Invalid {
                    kind,
                    reason: "metadata.name must not be empty".to_string(),
                });
            }
        };

        if self.load(kind, namespace, &name).await?.is_some() {
            return Err(ApiError::already_exists(kind, namespace, &name));
        }

        meta.insert("namespace".to_string(), Value::from(namespace));
        meta.insert("uid".to_string(), Value::from(Uuid::new_v4().to_string()));
        meta.insert("resource_version".to_string(), Value::from(1u64));
        meta.insert("created_at".to_string(), serde_json::to_value(Utc::now())?);

        self.save(kind, namespace, &name, &object).await?;
        debug!("Created {} {}/{}", kind, namespace, name);
        Ok(object)
    }

    async fn patch_raw(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        patch: &MergePatch,
    ) -> Result<Value, ApiError> {
        let mut object = self.get_raw(kind, namespace, name).await?;
        let current = resource_version(&object);
        if let Some(expected) = patch.resource_version()
            && expected != current
        {
            return Err(ApiError::Conflict {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
                expected,
                actual: current,
            });
        }

        let uid = object.get("metadata").and_then(|m| m.get("uid")).cloned();
        patch.apply_to(&mut object);

        // identity fields are owned by the registry
        let meta = metadata_mut(kind, &mut object)?;
        meta.insert("name".to_string(), Value::from(name));
        meta.insert("namespace".to_string(), Value::from(namespace));
        if let Some(uid) = uid {
            meta.insert("uid".to_string(), uid);
        }
        meta.insert("resource_version".to_string(), Value::from(current + 1));

        self.save(kind, namespace, name, &object).await?;
        debug!("Patched {} {}/{}", kind, namespace, name);
        Ok(object)
    }

    async fn delete_raw(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), ApiError> {
        if self.load(kind, namespace, name).await?.is_none() {
            return Err(ApiError::not_found(kind, namespace, name));
        }
        let key = Self::key(kind, namespace, name);
        self.store.delete(&key).await.map_err(ApiError::Store)?;
        debug!("Deleted {} {}/{}", kind, namespace, name);
        Ok(())
    }
}
