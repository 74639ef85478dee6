use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use pkg_constants::state::CACHE_DATA_KEY;
use pkg_types::configmap::ConfigMap;
use pkg_types::devpod::DevPodCache;
use pkg_types::meta::ObjectMeta;

use crate::client::{ClusterApi, ClusterExt};
use crate::error::ApiError;
use crate::patch::MergePatch;

/// Dev pod cache persisted inside the cluster as a config map.
///
/// Entries are keyed by dev pod name. Reads and writes go to the in-memory
/// map and are safe from concurrent tasks; nothing reaches the cluster
/// until [`RemoteCache::save`] is called.
#[derive(Clone)]
pub struct RemoteCache {
    name: String,
    namespace: String,
    dev_pods: Arc<DashMap<String, DevPodCache>>,
}

impl RemoteCache {
    /// An empty cache that will be saved to config map `name` in `namespace`.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            dev_pods: Arc::new(DashMap::new()),
        }
    }

    /// Load the cache from the cluster. A missing config map yields an
    /// empty cache.
    pub async fn load<C: ClusterApi + ?Sized>(
        client: &C,
        namespace: &str,
        name: &str,
    ) -> Result<Self, ApiError> {
        let cache = Self::new(namespace, name);
        let cm = match client.get::<ConfigMap>(namespace, name).await {
            Ok(cm) => cm,
            Err(e) if e.is_not_found() => return Ok(cache),
            Err(e) => return Err(e),
        };

        if let Some(data) = cm.data.get(CACHE_DATA_KEY) {
            let entries: BTreeMap<String, DevPodCache> = serde_json::from_str(data)?;
            for (name, entry) in entries {
                cache.dev_pods.insert(name, entry);
            }
        }
        debug!(
            "Loaded {} dev pod cache entries from {}/{}",
            cache.dev_pods.len(),
            namespace,
            name
        );
        Ok(cache)
    }

    pub fn get_dev_pod(&self, name: &str) -> Option<DevPodCache> {
        self.dev_pods.get(name).map(|e| e.value().clone())
    }

    pub fn set_dev_pod(&self, name: &str, entry: DevPodCache) {
        self.dev_pods.insert(name.to_string(), entry);
    }

    pub fn delete_dev_pod(&self, name: &str) -> Option<DevPodCache> {
        self.dev_pods.remove(name).map(|(_, e)| e)
    }

    /// All entries, ordered by dev pod name.
    pub fn dev_pods(&self) -> Vec<DevPodCache> {
        self.snapshot().into_values().collect()
    }

    fn snapshot(&self) -> BTreeMap<String, DevPodCache> {
        self.dev_pods
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Persist the cache to the cluster, creating the config map if needed.
    /// Saving an unchanged cache performs no write.
    pub async fn save<C: ClusterApi + ?Sized>(&self, client: &C) -> Result<(), ApiError> {
        let encoded = serde_json::to_string(&self.snapshot())?;

        let existing = match client.get::<ConfigMap>(&self.namespace, &self.name).await {
            Ok(cm) => Some(cm),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        match existing {
            None => {
                let cm = ConfigMap {
                    metadata: ObjectMeta::new(&self.name, &self.namespace),
                    data: BTreeMap::from([(CACHE_DATA_KEY.to_string(), encoded)]),
                };
                match client.create(&cm).await {
                    Ok(_) => {}
                    // lost a race with another writer; fall back to a patch
                    Err(e) if e.is_already_exists() => {
                        let mut data = serde_json::Map::new();
                        data.insert(
                            CACHE_DATA_KEY.to_string(),
                            serde_json::Value::from(cm.data[CACHE_DATA_KEY].clone()),
                        );
                        let patch =
                            MergePatch::from_value(serde_json::json!({ "data": data }));
                        client
                            .patch::<ConfigMap>(&self.namespace, &self.name, &patch)
                            .await?;
                    }
                    Err(e) => return Err(e),
                }
            }
            Some(cm) => {
                if cm.data.get(CACHE_DATA_KEY) == Some(&encoded) {
                    return Ok(());
                }
                let mut updated = cm.clone();
                updated.data.insert(CACHE_DATA_KEY.to_string(), encoded);
                let patch = MergePatch::merge_from(&cm, &updated)?;
                client
                    .patch::<ConfigMap>(&self.namespace, &self.name, &patch)
                    .await?;
            }
        }

        debug!("Saved dev pod cache {}/{}", self.namespace, self.name);
        Ok(())
    }
}
