//! Replace the pods of a Deployment, StatefulSet or ReplicaSet with a
//! developer-controlled ReplicaSet, and put everything back on revert.
//!
//! Every cluster mutation is preceded by a cache write recording what is
//! about to happen, so a crashed or cancelled run can be resumed or
//! reverted from the cache alone.

mod builder;
mod devcontainer;
mod error;
mod hash;
mod pvc;
mod replacer;
mod scale;
mod target;

#[cfg(test)]
mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use pkg_cluster::{ClusterApi, RemoteCache};
use pkg_constants::devpod::{
    MAX_REPLACE_ATTEMPTS, PVC_TERMINATION_POLL_SECS, PVC_TERMINATION_TIMEOUT_SECS,
};
use pkg_types::devpod::{DevPod, DevPodCache};

pub use builder::{build_replica_set, replacement_name};
pub use error::ReplaceError;
pub use hash::hash_config;
pub use replacer::Replacer;
pub use scale::{scale_down_target, scale_up_target};
pub use target::{find_target_by_kind_name, find_target_by_selector};

/// Everything a replacement needs from its caller.
#[derive(Clone)]
pub struct ReplaceContext {
    pub client: Arc<dyn ClusterApi>,
    pub cache: RemoteCache,
    /// Flips to `true` when the caller wants in-flight work abandoned.
    pub cancel: watch::Receiver<bool>,
}

impl ReplaceContext {
    /// A context that is never cancelled.
    pub fn new(client: Arc<dyn ClusterApi>, cache: RemoteCache) -> Self {
        let (_tx, cancel) = watch::channel(false);
        Self {
            client,
            cache,
            cancel,
        }
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Resolves once cancellation is requested. Never resolves if the
    /// sending side went away without cancelling.
    pub(crate) async fn cancelled(&self) {
        let mut cancel = self.cancel.clone();
        loop {
            let cancelled = *cancel.borrow_and_update();
            if cancelled {
                return;
            }
            if cancel.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Tunables of the replacement engine.
#[derive(Debug, Clone)]
pub struct ReplacerOptions {
    /// Scale the target down again when the replacement is already up to
    /// date, undoing manual scale-ups.
    pub reassert_scale_down: bool,
    /// Attempts before giving up when the replacement keeps appearing
    /// concurrently.
    pub max_attempts: u32,
    /// How long to wait for a stale persistence claim to disappear.
    pub claim_termination_timeout: Duration,
    pub claim_termination_poll: Duration,
}

impl Default for ReplacerOptions {
    fn default() -> Self {
        Self {
            reassert_scale_down: true,
            max_attempts: MAX_REPLACE_ATTEMPTS,
            claim_termination_timeout: Duration::from_secs(PVC_TERMINATION_TIMEOUT_SECS),
            claim_termination_poll: Duration::from_secs(PVC_TERMINATION_POLL_SECS),
        }
    }
}

/// What a successful [`PodReplacer::replace_pod`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// The replacement already matched the declaration.
    Unchanged,
    /// The existing replacement was patched in place.
    Patched,
    /// A new replacement was created.
    Created,
}

impl std::fmt::Display for ReplaceOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplaceOutcome::Unchanged => write!(f, "unchanged"),
            ReplaceOutcome::Patched => write!(f, "patched"),
            ReplaceOutcome::Created => write!(f, "created"),
        }
    }
}

#[async_trait]
pub trait PodReplacer: Send + Sync {
    /// Make sure the pods selected by `dev_pod` are replaced by an up to
    /// date development replica set. Safe to call repeatedly.
    async fn replace_pod(
        &self,
        ctx: &ReplaceContext,
        dev_pod: &DevPod,
    ) -> Result<ReplaceOutcome, ReplaceError>;

    /// Undo a replacement recorded in `dev_pod_cache`. Returns `false` if
    /// nothing was recorded to revert.
    async fn revert_replace_pod(
        &self,
        ctx: &ReplaceContext,
        dev_pod_cache: &DevPodCache,
    ) -> Result<bool, ReplaceError>;
}

pub fn new_pod_replacer() -> Arc<dyn PodReplacer> {
    Arc::new(Replacer::default())
}
