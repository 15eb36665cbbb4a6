//! Reconciliation of jobs abandoned in `pending` or `processing`.
//!
//! A job whose orchestration died with the process would otherwise stay
//! unfinished forever. At startup every unfinished job is failed; afterwards a
//! periodic sweep fails unfinished jobs that are not running here and have not
//! been touched for longer than the staleness threshold.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use vforge_models::{Job, JobPatch};
use vforge_store::{JobStore, StoreResult};

use crate::metrics;
use crate::scheduler::Scheduler;

pub const STALE_JOB_MESSAGE: &str =
    "Processing timed out. The worker may have crashed. Please try again.";

pub struct StaleJobSweeper {
    store: Arc<dyn JobStore>,
    scheduler: Scheduler,
    threshold: Duration,
    interval: Duration,
}

impl StaleJobSweeper {
    pub fn new(
        store: Arc<dyn JobStore>,
        scheduler: Scheduler,
        threshold: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            scheduler,
            threshold,
            interval,
        }
    }

    /// Fail every unfinished job not running in this process.
    pub async fn reconcile_startup(&self) -> StoreResult<usize> {
        let failed = self.fail_matching(|_| true).await?;
        if failed > 0 {
            info!("Startup reconciliation failed {} abandoned jobs", failed);
        }
        Ok(failed)
    }

    /// Fail unfinished jobs idle for longer than the threshold.
    pub async fn sweep_once(&self) -> StoreResult<usize> {
        let threshold = self.threshold;
        let now = Utc::now();
        self.fail_matching(|job| {
            (now - job.updated_at)
                .to_std()
                .map(|age| age > threshold)
                .unwrap_or(false)
        })
        .await
    }

    /// Sweep on an interval until `shutdown` flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting stale job sweeper (interval: {:?}, threshold: {:?})",
            self.interval, self.threshold
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self.sweep_once().await {
                        Ok(0) => {}
                        Ok(n) => info!("Stale job sweep failed {} jobs", n),
                        Err(e) => error!("Stale job sweep error: {}", e),
                    }
                }
            }
        }

        info!("Stale job sweeper stopped");
    }

    async fn fail_matching<F>(&self, is_stale: F) -> StoreResult<usize>
    where
        F: Fn(&Job) -> bool,
    {
        let running = self.scheduler.in_flight();
        let mut failed = 0;

        for job in self.store.list_all().await? {
            if job.is_terminal() || running.contains(&job.id) || !is_stale(&job) {
                continue;
            }

            warn!(
                job_id = %job.id,
                status = job.status.as_str(),
                progress = job.progress,
                updated_at = %job.updated_at,
                "Failing abandoned job"
            );

            match self.store.update(job.id, &JobPatch::fail(STALE_JOB_MESSAGE)).await {
                Ok(Some(_)) => {
                    metrics::record_job_failed("stale");
                    failed += 1;
                }
                Ok(None) => {}
                // Finished or changed between list and update
                Err(e) if e.is_rejection() => {}
                Err(e) => return Err(e),
            }
        }

        Ok(failed)
    }
}
