use async_trait::async_trait;
use tracing::{debug, info, warn};

use pkg_cluster::{ClusterExt, MergePatch};
use pkg_constants::devpod::{CONFIG_HASH_ANNOTATION, TARGET_KIND_ANNOTATION, TARGET_NAME_ANNOTATION};
use pkg_types::devpod::{ClaimRecord, DevPod, DevPodCache, ReplacePhase};
use pkg_types::replicaset::ReplicaSet;
use pkg_types::volume::PersistentVolumeClaim;

use super::builder::{build_replica_set, claim_name, replacement_name, semantically_equal};
use super::error::ReplaceError;
use super::pvc::ensure_pvc;
use super::scale::{scale_down_target, scale_up_target};
use super::target::{find_target_by_kind_name, find_target_by_selector};
use super::{PodReplacer, ReplaceContext, ReplaceOutcome, ReplacerOptions};

/// Result of reconciling an existing replacement.
enum Existing {
    UpToDate,
    Patched,
    /// The replacement was unusable and has been deleted.
    Deleted,
}

/// Result of one replacement attempt.
enum Attempt {
    Done(ReplaceOutcome),
    /// Someone else created the replacement between our lookup and create.
    Conflict,
}

#[derive(Default)]
pub struct Replacer {
    options: ReplacerOptions,
}

impl Replacer {
    pub fn new(options: ReplacerOptions) -> Self {
        Self { options }
    }

    async fn try_replace(
        &self,
        ctx: &ReplaceContext,
        dev_pod: &DevPod,
    ) -> Result<Attempt, ReplaceError> {
        if ctx.is_cancelled() {
            return Err(ReplaceError::Cancelled("replacing pods"));
        }

        let namespace = dev_pod.namespace_or(ctx.client.namespace()).to_string();
        let mut cache = ctx
            .cache
            .get_dev_pod(&dev_pod.name)
            .unwrap_or_else(|| DevPodCache::new(&dev_pod.name, &namespace));

        if cache.has_replacement() {
            debug!("Try to find replaced replica set {}/{}", cache.namespace, cache.replica_set);
            match ctx
                .client
                .get::<ReplicaSet>(&cache.namespace, &cache.replica_set)
                .await
            {
                Ok(replica_set) => match self
                    .update_existing(ctx, &mut cache, replica_set, dev_pod)
                    .await?
                {
                    Existing::UpToDate => return Ok(Attempt::Done(ReplaceOutcome::Unchanged)),
                    Existing::Patched => return Ok(Attempt::Done(ReplaceOutcome::Patched)),
                    Existing::Deleted => {}
                },
                Err(e) if e.is_not_found() => {
                    debug!("Replaced replica set {}/{} not found", cache.namespace, cache.replica_set);
                }
                Err(e) => {
                    return Err(ReplaceError::api(
                        "find replaced replica set",
                        &cache.replica_set,
                        e,
                    ));
                }
            }
        }

        let target = find_target_by_selector(ctx.client.as_ref(), &namespace, dev_pod)
            .await?
            .ok_or_else(|| ReplaceError::NoMatchingTarget {
                dev_pod: dev_pod.name.clone(),
                namespace: namespace.clone(),
            })?;

        let name = replacement_name(target.name());
        cache.namespace = namespace;
        cache.record_intent(target.kind().as_str(), target.name(), &name);
        persist(ctx, &cache).await?;

        info!("Replacing pods of {} with replica set {}", target, name);
        let replica_set = build_replica_set(&name, &target, dev_pod)?;
        scale_down_target(ctx.client.as_ref(), &target).await?;

        let created = match ctx.client.create(&replica_set).await {
            Ok(created) => created,
            Err(e) if e.is_already_exists() => return Ok(Attempt::Conflict),
            Err(e) => return Err(ReplaceError::api("create replica set", &name, e)),
        };

        if dev_pod.has_persist_paths() {
            cache.claim = Some(ClaimRecord {
                name: claim_name(&name, dev_pod),
                owned: dev_pod.explicit_claim_name().is_none(),
            });
        }
        cache.mark_replaced();
        persist(ctx, &cache).await?;

        if dev_pod.has_persist_paths() {
            ensure_pvc(ctx, &self.options, &created, dev_pod).await?;
        }

        info!("Successfully replaced pods of {}", target);
        Ok(Attempt::Done(ReplaceOutcome::Created))
    }

    /// Bring an existing replacement in line with `dev_pod`, or delete it if
    /// it no longer describes a live target.
    async fn update_existing(
        &self,
        ctx: &ReplaceContext,
        cache: &mut DevPodCache,
        replica_set: ReplicaSet,
        dev_pod: &DevPod,
    ) -> Result<Existing, ReplaceError> {
        let namespace = replica_set.metadata.namespace.clone();
        let name = replica_set.metadata.name.clone();

        let kind = replica_set.metadata.annotation(TARGET_KIND_ANNOTATION).unwrap_or_default();
        let target_name = replica_set.metadata.annotation(TARGET_NAME_ANNOTATION).unwrap_or_default();
        if kind.is_empty() || target_name.is_empty() {
            info!("Replica set {}/{} is not managed by dev pods, recreating it", namespace, name);
            delete_replica_set(ctx, &namespace, &name).await?;
            return Ok(Existing::Deleted);
        }

        let target = match find_target_by_kind_name(ctx.client.as_ref(), kind, &namespace, target_name).await {
            Ok(Some(target)) => target,
            Ok(None) => {
                info!("Target {} {}/{} of replica set {} is gone, recreating it", kind, namespace, target_name, name);
                delete_replica_set(ctx, &namespace, &name).await?;
                return Ok(Existing::Deleted);
            }
            Err(ReplaceError::UnsupportedKind(kind)) => {
                info!("Replica set {}/{} targets unsupported kind {}, recreating it", namespace, name, kind);
                delete_replica_set(ctx, &namespace, &name).await?;
                return Ok(Existing::Deleted);
            }
            Err(e) => {
                debug!("Error getting target of replica set {}/{}: {}", namespace, name, e);
                return Err(e);
            }
        };

        let desired = build_replica_set(&name, &target, dev_pod)?;
        let desired_hash = desired.metadata.annotation(CONFIG_HASH_ANNOTATION);
        let current_hash = replica_set.metadata.annotation(CONFIG_HASH_ANNOTATION);

        if desired_hash == current_hash
            && semantically_equal(&desired.spec.template, &replica_set.spec.template)?
        {
            if self.options.reassert_scale_down
                && let Err(e) = scale_down_target(ctx.client.as_ref(), &target).await
            {
                warn!("Error scaling down {}: {}", target, e);
            }
            self.finish_existing(ctx, cache, &replica_set, dev_pod).await?;
            debug!("No changes required in replica set {}/{}", namespace, name);
            return Ok(Existing::UpToDate);
        }

        let mut updated = replica_set.clone();
        updated.spec.template = desired.spec.template;
        updated.spec.selector = desired.spec.selector;
        if let Some(hash) = desired_hash {
            updated
                .metadata
                .annotations
                .insert(CONFIG_HASH_ANNOTATION.to_string(), hash.to_string());
        }
        let patch = MergePatch::merge_from(&replica_set, &updated)
            .map_err(|e| ReplaceError::serialization("replica set patch", e))?
            .with_optimistic_lock(replica_set.metadata.resource_version);
        let patched: ReplicaSet = ctx
            .client
            .patch(&namespace, &name, &patch)
            .await
            .map_err(|e| ReplaceError::api("patch replica set", &name, e))?;
        info!("Updated replica set {}/{} in place", namespace, name);

        self.finish_existing(ctx, cache, &patched, dev_pod).await?;
        Ok(Existing::Patched)
    }

    /// Complete bookkeeping a crashed run may have left undone for an
    /// existing replacement, and follow claim changes of `dev_pod`.
    async fn finish_existing(
        &self,
        ctx: &ReplaceContext,
        cache: &mut DevPodCache,
        replica_set: &ReplicaSet,
        dev_pod: &DevPod,
    ) -> Result<(), ReplaceError> {
        let desired_claim = dev_pod.has_persist_paths().then(|| ClaimRecord {
            name: claim_name(&replica_set.metadata.name, dev_pod),
            owned: dev_pod.explicit_claim_name().is_none(),
        });
        let claim_changed = cache.claim != desired_claim;
        if cache.phase == ReplacePhase::Replaced && !claim_changed {
            return Ok(());
        }

        if claim_changed {
            // release an owned claim the template no longer mounts
            if let Some(previous) = &cache.claim
                && previous.owned
                && desired_claim.as_ref().is_none_or(|c| c.name != previous.name)
            {
                delete_claim(ctx, &replica_set.metadata.namespace, &previous.name).await?;
            }
            cache.claim = desired_claim.clone();
        }
        cache.mark_replaced();
        persist(ctx, cache).await?;

        if claim_changed && desired_claim.is_some() {
            ensure_pvc(ctx, &self.options, replica_set, dev_pod).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PodReplacer for Replacer {
    async fn replace_pod(
        &self,
        ctx: &ReplaceContext,
        dev_pod: &DevPod,
    ) -> Result<ReplaceOutcome, ReplaceError> {
        for attempt in 1..=self.options.max_attempts {
            match self.try_replace(ctx, dev_pod).await? {
                Attempt::Done(outcome) => return Ok(outcome),
                Attempt::Conflict => {
                    info!(
                        "Pods of dev pod {} were replaced concurrently, retrying ({}/{})",
                        dev_pod.name, attempt, self.options.max_attempts
                    );
                }
            }
        }

        Err(ReplaceError::RetriesExhausted {
            dev_pod: dev_pod.name.clone(),
            attempts: self.options.max_attempts,
        })
    }

    async fn revert_replace_pod(
        &self,
        ctx: &ReplaceContext,
        dev_pod_cache: &DevPodCache,
    ) -> Result<bool, ReplaceError> {
        if dev_pod_cache.target_name.is_empty() && !dev_pod_cache.has_replacement() {
            if ctx.cache.delete_dev_pod(&dev_pod_cache.name).is_some() {
                save_cache(ctx).await?;
            }
            return Ok(false);
        }

        let namespace = &dev_pod_cache.namespace;
        if !dev_pod_cache.target_name.is_empty() {
            match find_target_by_kind_name(
                ctx.client.as_ref(),
                &dev_pod_cache.target_kind,
                namespace,
                &dev_pod_cache.target_name,
            )
            .await?
            {
                Some(target) => match scale_up_target(ctx.client.as_ref(), &target).await {
                    Ok(_) => {}
                    Err(ReplaceError::MissingReplicasAnnotation { .. }) => {
                        warn!(
                            "{} has no stored replica count, leaving it at {} replicas",
                            target,
                            target.replicas().unwrap_or(1)
                        );
                    }
                    Err(e) => return Err(e),
                },
                None => warn!(
                    "{} {}/{} no longer exists, skipping scale up",
                    dev_pod_cache.target_kind, namespace, dev_pod_cache.target_name
                ),
            }
        }

        if dev_pod_cache.has_replacement() {
            delete_replica_set(ctx, namespace, &dev_pod_cache.replica_set).await?;
        }

        if let Some(claim) = &dev_pod_cache.claim {
            if claim.owned {
                delete_claim(ctx, namespace, &claim.name).await?;
            } else {
                debug!("Keeping persistent volume claim {}/{}", namespace, claim.name);
            }
        }

        ctx.cache.delete_dev_pod(&dev_pod_cache.name);
        save_cache(ctx).await?;
        info!("Reverted replaced pods of dev pod {}", dev_pod_cache.name);
        Ok(true)
    }
}

async fn persist(ctx: &ReplaceContext, cache: &DevPodCache) -> Result<(), ReplaceError> {
    ctx.cache.set_dev_pod(&cache.name, cache.clone());
    save_cache(ctx).await
}

async fn save_cache(ctx: &ReplaceContext) -> Result<(), ReplaceError> {
    ctx.cache
        .save(ctx.client.as_ref())
        .await
        .map_err(|e| ReplaceError::api("save", "dev pod cache", e))
}

async fn delete_replica_set(
    ctx: &ReplaceContext,
    namespace: &str,
    name: &str,
) -> Result<(), ReplaceError> {
    match ctx.client.delete::<ReplicaSet>(namespace, name).await {
        Ok(()) => {
            info!("Deleted replica set {}/{}", namespace, name);
            Ok(())
        }
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(ReplaceError::api("delete replica set", name, e)),
    }
}

async fn delete_claim(ctx: &ReplaceContext, namespace: &str, name: &str) -> Result<(), ReplaceError> {
    match ctx
        .client
        .delete::<PersistentVolumeClaim>(namespace, name)
        .await
    {
        Ok(()) => {
            info!("Deleted persistent volume claim {}/{}", namespace, name);
            Ok(())
        }
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(ReplaceError::api("delete persistent volume claim", name, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::podreplace::fixtures::*;
    use pkg_cluster::{RegistryClient, RemoteCache};
    use pkg_constants::devpod::{REPLACED_LABEL, REPLICAS_ANNOTATION};
    use pkg_state::MemoryStore;
    use pkg_types::deployment::Deployment;
    use pkg_types::devpod::{DevContainer, PersistenceOptions, PersistentPath};
    use pkg_types::volume::VolumeSource;
    use std::sync::Arc;

    fn setup() -> (Arc<RegistryClient<MemoryStore>>, ReplaceContext) {
        let client = Arc::new(registry());
        let ctx = context(client.clone());
        (client, ctx)
    }

    fn named_claim(mut dev_pod: DevPod, name: &str) -> DevPod {
        dev_pod.persistence_options = Some(PersistenceOptions {
            name: Some(name.to_string()),
            ..Default::default()
        });
        dev_pod
    }

    fn mounted_claims(rs: &ReplicaSet) -> Vec<String> {
        rs.spec
            .template
            .spec
            .volumes
            .iter()
            .filter_map(|v| match &v.source {
                VolumeSource::PersistentVolumeClaim { claim_name } => Some(claim_name.clone()),
                _ => None,
            })
            .collect()
    }

    fn with_persisted_path(mut dev_pod: DevPod) -> DevPod {
        dev_pod.dev_containers.push(DevContainer {
            persist_paths: vec![PersistentPath {
                path: "/app/node_modules".to_string(),
                volume_path: None,
                read_only: false,
            }],
            ..Default::default()
        });
        dev_pod
    }

    async fn deployment(client: &RegistryClient<MemoryStore>, name: &str) -> Deployment {
        client.get("default", name).await.unwrap()
    }

    #[tokio::test]
    async fn test_replace_and_revert() {
        let (client, ctx) = setup();
        client
            .create(&make_deployment("api-deploy", "api", Some(3)))
            .await
            .unwrap();
        let replacer = Replacer::default();
        let dev_pod = make_dev_pod("api");

        let outcome = replacer.replace_pod(&ctx, &dev_pod).await.unwrap();
        assert_eq!(outcome, ReplaceOutcome::Created);

        let target = deployment(&client, "api-deploy").await;
        assert_eq!(target.spec.replicas, Some(0));
        assert_eq!(target.metadata.annotation(REPLICAS_ANNOTATION), Some("3"));

        let rs: ReplicaSet = client.get("default", "api-deploy-devspace").await.unwrap();
        assert_eq!(rs.spec.replicas, Some(1));
        assert_eq!(rs.metadata.annotation(TARGET_KIND_ANNOTATION), Some("Deployment"));
        assert_eq!(rs.metadata.annotation(TARGET_NAME_ANNOTATION), Some("api-deploy"));
        assert!(rs.spec.template.metadata.labels.contains_key(REPLACED_LABEL));

        // the cache survives a restart
        let reloaded = RemoteCache::load(client.as_ref(), "default", "devspace-cache")
            .await
            .unwrap();
        let entry = reloaded.get_dev_pod("api").unwrap();
        assert_eq!(entry.target_kind, "Deployment");
        assert_eq!(entry.target_name, "api-deploy");
        assert_eq!(entry.replica_set, "api-deploy-devspace");
        assert_eq!(entry.phase, ReplacePhase::Replaced);

        assert!(replacer.revert_replace_pod(&ctx, &entry).await.unwrap());

        let target = deployment(&client, "api-deploy").await;
        assert_eq!(target.spec.replicas, Some(3));
        assert!(target.metadata.annotation(REPLICAS_ANNOTATION).is_none());
        let err = client
            .get::<ReplicaSet>("default", "api-deploy-devspace")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(ctx.cache.get_dev_pod("api").is_none());
    }

    #[tokio::test]
    async fn test_second_replace_writes_nothing() {
        let (client, ctx) = setup();
        client
            .create(&make_deployment("api-deploy", "api", Some(3)))
            .await
            .unwrap();
        let replacer = Replacer::default();
        let dev_pod = with_persisted_path(make_dev_pod("api"));

        replacer.replace_pod(&ctx, &dev_pod).await.unwrap();
        let before = client.store().mutations();

        let outcome = replacer.replace_pod(&ctx, &dev_pod).await.unwrap();
        assert_eq!(outcome, ReplaceOutcome::Unchanged);
        assert_eq!(client.store().mutations(), before);
    }

    #[tokio::test]
    async fn test_changed_dev_pod_patches_in_place() {
        let (client, ctx) = setup();
        client
            .create(&make_deployment("api-deploy", "api", Some(2)))
            .await
            .unwrap();
        let replacer = Replacer::default();
        let mut dev_pod = make_dev_pod("api");

        replacer.replace_pod(&ctx, &dev_pod).await.unwrap();
        let created: ReplicaSet = client.get("default", "api-deploy-devspace").await.unwrap();

        dev_pod.dev_containers.push(DevContainer {
            dev_image: Some("node:20".to_string()),
            ..Default::default()
        });
        let outcome = replacer.replace_pod(&ctx, &dev_pod).await.unwrap();
        assert_eq!(outcome, ReplaceOutcome::Patched);

        let patched: ReplicaSet = client.get("default", "api-deploy-devspace").await.unwrap();
        assert_eq!(patched.metadata.uid, created.metadata.uid);
        assert_eq!(patched.spec.template.spec.containers[0].image, "node:20");
        assert_ne!(
            patched.metadata.annotation(CONFIG_HASH_ANNOTATION),
            created.metadata.annotation(CONFIG_HASH_ANNOTATION)
        );

        assert_eq!(
            replacer.replace_pod(&ctx, &dev_pod).await.unwrap(),
            ReplaceOutcome::Unchanged
        );
    }

    #[tokio::test]
    async fn test_stale_hash_is_patched_once() {
        let (client, ctx) = setup();
        client
            .create(&make_deployment("api-deploy", "api", Some(1)))
            .await
            .unwrap();
        let replacer = Replacer::default();
        let dev_pod = make_dev_pod("api");
        replacer.replace_pod(&ctx, &dev_pod).await.unwrap();

        let live: ReplicaSet = client.get("default", "api-deploy-devspace").await.unwrap();
        let mut tampered = live.clone();
        tampered
            .metadata
            .annotations
            .insert(CONFIG_HASH_ANNOTATION.to_string(), "stale".to_string());
        let patch = MergePatch::merge_from(&live, &tampered).unwrap();
        client
            .patch::<ReplicaSet>("default", "api-deploy-devspace", &patch)
            .await
            .unwrap();

        let before = client.store().mutations();
        let outcome = replacer.replace_pod(&ctx, &dev_pod).await.unwrap();
        assert_eq!(outcome, ReplaceOutcome::Patched);
        assert_eq!(client.store().mutations(), before + 1);

        let patched: ReplicaSet = client.get("default", "api-deploy-devspace").await.unwrap();
        assert_eq!(patched.metadata.uid, live.metadata.uid);
        assert_eq!(
            patched.metadata.annotation(CONFIG_HASH_ANNOTATION),
            live.metadata.annotation(CONFIG_HASH_ANNOTATION)
        );
    }

    #[tokio::test]
    async fn test_target_template_drift_is_patched() {
        let (client, ctx) = setup();
        client
            .create(&make_deployment("api-deploy", "api", Some(1)))
            .await
            .unwrap();
        let replacer = Replacer::default();
        let dev_pod = make_dev_pod("api");
        replacer.replace_pod(&ctx, &dev_pod).await.unwrap();
        let created: ReplicaSet = client.get("default", "api-deploy-devspace").await.unwrap();

        // the target is edited while the dev pod stays the same
        let live = deployment(&client, "api-deploy").await;
        let mut edited = live.clone();
        edited.spec.template.spec.containers[0].image = "api:2.0".to_string();
        edited
            .spec
            .template
            .metadata
            .labels
            .insert("tier".to_string(), "web".to_string());
        let patch = MergePatch::merge_from(&live, &edited).unwrap();
        client
            .patch::<Deployment>("default", "api-deploy", &patch)
            .await
            .unwrap();

        let before = client.store().mutations();
        let outcome = replacer.replace_pod(&ctx, &dev_pod).await.unwrap();
        assert_eq!(outcome, ReplaceOutcome::Patched);
        assert_eq!(client.store().mutations(), before + 1);

        let patched: ReplicaSet = client.get("default", "api-deploy-devspace").await.unwrap();
        assert_eq!(patched.metadata.uid, created.metadata.uid);
        assert_eq!(patched.spec.template.spec.containers[0].image, "api:2.0");
        assert_eq!(
            patched.metadata.annotation(CONFIG_HASH_ANNOTATION),
            created.metadata.annotation(CONFIG_HASH_ANNOTATION)
        );
        assert_eq!(patched.spec.selector, patched.spec.template.metadata.labels);
        assert_eq!(patched.spec.selector.get("tier").map(String::as_str), Some("web"));
    }

    #[tokio::test]
    async fn test_manual_scale_up_is_reverted() {
        let (client, ctx) = setup();
        client
            .create(&make_deployment("api-deploy", "api", Some(3)))
            .await
            .unwrap();
        let replacer = Replacer::default();
        let dev_pod = make_dev_pod("api");
        replacer.replace_pod(&ctx, &dev_pod).await.unwrap();

        let scaled = deployment(&client, "api-deploy").await;
        let mut bumped = scaled.clone();
        bumped.spec.replicas = Some(2);
        let patch = MergePatch::merge_from(&scaled, &bumped).unwrap();
        client
            .patch::<Deployment>("default", "api-deploy", &patch)
            .await
            .unwrap();

        let outcome = replacer.replace_pod(&ctx, &dev_pod).await.unwrap();
        assert_eq!(outcome, ReplaceOutcome::Unchanged);
        let target = deployment(&client, "api-deploy").await;
        assert_eq!(target.spec.replicas, Some(0));
        assert_eq!(target.metadata.annotation(REPLICAS_ANNOTATION), Some("3"));
    }

    #[tokio::test]
    async fn test_unmanaged_replacement_is_recreated() {
        let (client, ctx) = setup();
        client
            .create(&make_deployment("api-deploy", "api", Some(1)))
            .await
            .unwrap();
        // a replica set squatting on the replacement name without our annotations
        let squatter = client
            .create(&make_replicaset("api-deploy-devspace", "other", Some(4)))
            .await
            .unwrap();

        let mut entry = DevPodCache::new("api", "default");
        entry.record_intent("Deployment", "api-deploy", "api-deploy-devspace");
        ctx.cache.set_dev_pod("api", entry);

        let outcome = Replacer::default()
            .replace_pod(&ctx, &make_dev_pod("api"))
            .await
            .unwrap();
        assert_eq!(outcome, ReplaceOutcome::Created);

        let rs: ReplicaSet = client.get("default", "api-deploy-devspace").await.unwrap();
        assert_ne!(rs.metadata.uid, squatter.metadata.uid);
        assert_eq!(rs.spec.replicas, Some(1));
    }

    #[tokio::test]
    async fn test_create_race_retries() {
        let (client, ctx) = setup();
        client
            .create(&make_deployment("api-deploy", "api", Some(1)))
            .await
            .unwrap();
        // the replacement appears without the cache knowing about it
        client
            .create(&make_replicaset("api-deploy-devspace", "api", Some(1)))
            .await
            .unwrap();

        let outcome = Replacer::default()
            .replace_pod(&ctx, &make_dev_pod("api"))
            .await
            .unwrap();
        assert_eq!(outcome, ReplaceOutcome::Created);
        let rs: ReplicaSet = client.get("default", "api-deploy-devspace").await.unwrap();
        assert!(rs.metadata.annotation(CONFIG_HASH_ANNOTATION).is_some());
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let inner = registry();
        inner
            .create(&make_deployment("api-deploy", "api", Some(1)))
            .await
            .unwrap();
        let client = Arc::new(FaultyClient::new(inner).with_racing_replica_sets());
        let ctx = context(client);

        let err = Replacer::default()
            .replace_pod(&ctx, &make_dev_pod("api"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReplaceError::RetriesExhausted { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_no_matching_target() {
        let (client, ctx) = setup();
        client
            .create(&make_deployment("web", "web", Some(1)))
            .await
            .unwrap();

        let err = Replacer::default()
            .replace_pod(&ctx, &make_dev_pod("api"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReplaceError::NoMatchingTarget { .. }));
        assert!(err.to_string().contains("api"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let (client, ctx) = setup();
        client
            .create(&make_deployment("api-deploy", "api", Some(1)))
            .await
            .unwrap();
        let (tx, rx) = tokio::sync::watch::channel(false);
        let ctx = ctx.with_cancel(rx);
        tx.send(true).unwrap();

        let before = client.store().mutations();
        let err = Replacer::default()
            .replace_pod(&ctx, &make_dev_pod("api"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReplaceError::Cancelled(_)));
        assert_eq!(client.store().mutations(), before);
    }

    #[tokio::test]
    async fn test_persisted_paths_create_owned_claim() {
        let (client, ctx) = setup();
        client
            .create(&make_deployment("api-deploy", "api", Some(1)))
            .await
            .unwrap();
        let replacer = Replacer::default();
        let dev_pod = with_persisted_path(make_dev_pod("api"));

        replacer.replace_pod(&ctx, &dev_pod).await.unwrap();

        let rs: ReplicaSet = client.get("default", "api-deploy-devspace").await.unwrap();
        let claim: PersistentVolumeClaim = client.get("default", "api-deploy-devspace").await.unwrap();
        assert_eq!(claim.spec.storage, "10Gi");
        assert_eq!(claim.metadata.controller_ref().unwrap().uid, rs.metadata.uid);

        let entry = ctx.cache.get_dev_pod("api").unwrap();
        assert_eq!(
            entry.claim,
            Some(ClaimRecord {
                name: "api-deploy-devspace".to_string(),
                owned: true
            })
        );

        assert!(replacer.revert_replace_pod(&ctx, &entry).await.unwrap());
        let err = client
            .get::<PersistentVolumeClaim>("default", "api-deploy-devspace")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_explicit_claim_survives_revert() {
        let (client, ctx) = setup();
        client
            .create(&make_deployment("api-deploy", "api", Some(1)))
            .await
            .unwrap();
        let replacer = Replacer::default();
        let mut dev_pod = with_persisted_path(make_dev_pod("api"));
        dev_pod.persistence_options = Some(PersistenceOptions {
            name: Some("api-data".to_string()),
            ..Default::default()
        });

        replacer.replace_pod(&ctx, &dev_pod).await.unwrap();
        let entry = ctx.cache.get_dev_pod("api").unwrap();
        assert!(replacer.revert_replace_pod(&ctx, &entry).await.unwrap());

        let claim: PersistentVolumeClaim = client.get("default", "api-data").await.unwrap();
        assert!(claim.metadata.owner_references.is_empty());
    }

    #[tokio::test]
    async fn test_renamed_claim_is_created() {
        let (client, ctx) = setup();
        client
            .create(&make_deployment("api-deploy", "api", Some(1)))
            .await
            .unwrap();
        let replacer = Replacer::default();
        let dev_pod = with_persisted_path(make_dev_pod("api"));

        replacer
            .replace_pod(&ctx, &named_claim(dev_pod.clone(), "data-a"))
            .await
            .unwrap();
        let outcome = replacer
            .replace_pod(&ctx, &named_claim(dev_pod.clone(), "data-b"))
            .await
            .unwrap();
        assert_eq!(outcome, ReplaceOutcome::Patched);

        let rs: ReplicaSet = client.get("default", "api-deploy-devspace").await.unwrap();
        assert_eq!(mounted_claims(&rs), vec!["data-b".to_string()]);
        client
            .get::<PersistentVolumeClaim>("default", "data-b")
            .await
            .unwrap();
        // explicitly named claims are never ours to delete
        client
            .get::<PersistentVolumeClaim>("default", "data-a")
            .await
            .unwrap();

        let entry = ctx.cache.get_dev_pod("api").unwrap();
        assert_eq!(
            entry.claim,
            Some(ClaimRecord {
                name: "data-b".to_string(),
                owned: false
            })
        );
        assert_eq!(
            replacer
                .replace_pod(&ctx, &named_claim(dev_pod, "data-b"))
                .await
                .unwrap(),
            ReplaceOutcome::Unchanged
        );
    }

    #[tokio::test]
    async fn test_owned_claim_switches_with_dev_pod() {
        let (client, ctx) = setup();
        client
            .create(&make_deployment("api-deploy", "api", Some(1)))
            .await
            .unwrap();
        let replacer = Replacer::default();
        let dev_pod = with_persisted_path(make_dev_pod("api"));

        replacer.replace_pod(&ctx, &dev_pod).await.unwrap();
        client
            .get::<PersistentVolumeClaim>("default", "api-deploy-devspace")
            .await
            .unwrap();

        // owned claim gives way to an explicit one
        replacer
            .replace_pod(&ctx, &named_claim(dev_pod.clone(), "api-data"))
            .await
            .unwrap();
        let err = client
            .get::<PersistentVolumeClaim>("default", "api-deploy-devspace")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        client
            .get::<PersistentVolumeClaim>("default", "api-data")
            .await
            .unwrap();

        // and back again
        let outcome = replacer.replace_pod(&ctx, &dev_pod).await.unwrap();
        assert_eq!(outcome, ReplaceOutcome::Patched);
        let rs: ReplicaSet = client.get("default", "api-deploy-devspace").await.unwrap();
        let claim: PersistentVolumeClaim = client.get("default", "api-deploy-devspace").await.unwrap();
        assert_eq!(claim.metadata.controller_ref().unwrap().uid, rs.metadata.uid);
        assert_eq!(mounted_claims(&rs), vec!["api-deploy-devspace".to_string()]);

        let entry = ctx.cache.get_dev_pod("api").unwrap();
        assert_eq!(
            entry.claim,
            Some(ClaimRecord {
                name: "api-deploy-devspace".to_string(),
                owned: true
            })
        );

        // dropping persisted paths releases the owned claim
        replacer.replace_pod(&ctx, &make_dev_pod("api")).await.unwrap();
        let err = client
            .get::<PersistentVolumeClaim>("default", "api-deploy-devspace")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(ctx.cache.get_dev_pod("api").unwrap().claim.is_none());
    }

    #[tokio::test]
    async fn test_revert_without_cache() {
        let (client, ctx) = setup();
        let before = client.store().mutations();
        let reverted = Replacer::default()
            .revert_replace_pod(&ctx, &DevPodCache::new("api", "default"))
            .await
            .unwrap();
        assert!(!reverted);
        assert_eq!(client.store().mutations(), before);
    }

    #[tokio::test]
    async fn test_revert_tolerates_missing_state() {
        let (client, ctx) = setup();
        // target was idle when replaced, so no count was remembered
        client
            .create(&make_deployment("api-deploy", "api", Some(0)))
            .await
            .unwrap();
        let replacer = Replacer::default();
        replacer.replace_pod(&ctx, &make_dev_pod("api")).await.unwrap();
        let entry = ctx.cache.get_dev_pod("api").unwrap();

        assert!(replacer.revert_replace_pod(&ctx, &entry).await.unwrap());
        assert_eq!(deployment(&client, "api-deploy").await.spec.replicas, Some(0));

        // a target that vanished is skipped
        let mut gone = DevPodCache::new("worker", "default");
        gone.record_intent("StatefulSet", "worker", "worker-devspace");
        assert!(replacer.revert_replace_pod(&ctx, &gone).await.unwrap());
    }
}
