use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use pkg_types::devpod::DevPod;

use crate::podreplace::{PodReplacer, ReplaceContext, ReplaceOutcome, Replacer, ReplacerOptions};

/// Controller that keeps the pods of every configured dev pod replaced.
///
/// Each tick runs [`PodReplacer::replace_pod`] for all dev pods; a failure
/// of one dev pod is logged and does not hold back the others. The loop
/// ends when the context is cancelled.
pub struct DevPodController {
    ctx: ReplaceContext,
    replacer: Arc<dyn PodReplacer>,
    dev_pods: Vec<DevPod>,
    check_interval: Duration,
}

impl DevPodController {
    pub fn new(ctx: ReplaceContext, dev_pods: Vec<DevPod>) -> Self {
        Self {
            ctx,
            replacer: Arc::new(Replacer::new(ReplacerOptions::default())),
            dev_pods,
            check_interval: Duration::from_secs(10),
        }
    }

    pub fn with_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }

    pub fn with_replacer(mut self, replacer: Arc<dyn PodReplacer>) -> Self {
        self.replacer = replacer;
        self
    }

    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "DevPodController started for {} dev pods (interval={}s)",
                self.dev_pods.len(),
                self.check_interval.as_secs()
            );
            let mut interval = tokio::time::interval(self.check_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = self.ctx.cancelled() => break,
                }
                if let Err(e) = self.reconcile().await {
                    warn!("DevPodController reconcile error: {}", e);
                }
            }
            info!("DevPodController stopped");
        })
    }

    /// Run one replacement pass over all dev pods.
    pub async fn reconcile(&self) -> anyhow::Result<()> {
        let mut failed = 0;
        for dev_pod in &self.dev_pods {
            if self.ctx.is_cancelled() {
                break;
            }
            match self.replacer.replace_pod(&self.ctx, dev_pod).await {
                Ok(ReplaceOutcome::Unchanged) => {}
                Ok(outcome) => info!("Dev pod {}: replacement {}", dev_pod.name, outcome),
                Err(e) => {
                    warn!("Error replacing pods of dev pod {}: {}", dev_pod.name, e);
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            anyhow::bail!("{} of {} dev pods failed", failed, self.dev_pods.len());
        }
        Ok(())
    }

    /// Revert every replacement recorded in the cache for the configured
    /// dev pods. Returns the number of reverted dev pods.
    pub async fn revert_all(&self) -> anyhow::Result<usize> {
        let mut reverted = 0;
        for dev_pod in &self.dev_pods {
            let Some(entry) = self.ctx.cache.get_dev_pod(&dev_pod.name) else {
                continue;
            };
            if self.replacer.revert_replace_pod(&self.ctx, &entry).await? {
                reverted += 1;
            }
        }
        Ok(reverted)
    }
}
