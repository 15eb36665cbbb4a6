//! Launches orchestrations without blocking the submitter.

use std::any::Any;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};
use vforge_models::{JobId, JobPatch};
use vforge_store::JobStore;

use crate::metrics;
use crate::orchestrator::Orchestrator;

/// Poll interval of `wait_idle`.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs each submitted job once, at most `max_concurrent_jobs` at a time.
///
/// Cheap to clone; clones share the same in-flight set and permits.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn JobStore>,
    job_semaphore: Arc<Semaphore>,
    in_flight: Mutex<HashSet<JobId>>,
}

impl Inner {
    fn in_flight(&self) -> MutexGuard<'_, HashSet<JobId>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Last-resort failure write for a run that escaped the orchestrator.
    ///
    /// Returns whether the job was marked failed; only then is it counted.
    async fn fail_unexpected(&self, id: JobId, reason: &str) -> bool {
        let message = format!("Internal error during processing: {}", reason);

        match self.store.get(id).await {
            Ok(Some(job)) if job.is_terminal() => {
                debug!(job_id = %id, "Job already terminal, safety net not needed");
                return false;
            }
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!(job_id = %id, "Job vanished before the safety net could run");
                return false;
            }
            Err(e) => {
                error!(job_id = %id, error = %e, "Safety net could not load job");
                return false;
            }
        }

        match self.store.update(id, &JobPatch::fail(message)).await {
            Ok(Some(_)) => {
                metrics::record_job_failed("internal");
                true
            }
            Ok(None) => {
                warn!(job_id = %id, "Job vanished before the safety net could run");
                false
            }
            Err(e) => {
                error!(job_id = %id, error = %e, "Safety net could not mark job failed");
                false
            }
        }
    }
}

/// Removes a job from the in-flight set when its task ends, however it ends.
struct InFlightGuard {
    inner: Arc<Inner>,
    id: JobId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight().remove(&self.id);
    }
}

impl Scheduler {
    pub fn new(orchestrator: Arc<Orchestrator>, max_concurrent_jobs: usize) -> Self {
        let store = Arc::clone(orchestrator.store());
        Self {
            inner: Arc::new(Inner {
                orchestrator,
                store,
                job_semaphore: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
                in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Schedule `id` and return immediately.
    ///
    /// Returns `false` when the job is already scheduled or running.
    pub fn submit(&self, id: JobId) -> bool {
        if !self.inner.in_flight().insert(id) {
            warn!(job_id = %id, "Job is already scheduled, ignoring duplicate submission");
            return false;
        }

        metrics::record_job_submitted();
        info!(job_id = %id, "Job submitted");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _guard = InFlightGuard {
                inner: Arc::clone(&inner),
                id,
            };

            let permit = match Arc::clone(&inner.job_semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    inner.fail_unexpected(id, "scheduler is shut down").await;
                    return;
                }
            };

            let orchestrator = Arc::clone(&inner.orchestrator);
            let run = tokio::spawn(async move {
                let _permit = permit;
                orchestrator.run(id).await;
            });

            if let Err(join_err) = run.await {
                let reason = describe_join_error(join_err);
                error!(job_id = %id, reason = %reason, "Job task ended abnormally");
                inner.fail_unexpected(id, &reason).await;
            }
        });

        true
    }

    pub fn is_in_flight(&self, id: JobId) -> bool {
        self.inner.in_flight().contains(&id)
    }

    pub fn in_flight(&self) -> HashSet<JobId> {
        self.inner.in_flight().clone()
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight().len()
    }

    /// Resolve once nothing is scheduled or running.
    pub async fn wait_idle(&self) {
        while self.in_flight_count() > 0 {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }

    /// Stop admitting queued jobs; running ones finish.
    pub fn close(&self) {
        self.inner.job_semaphore.close();
    }
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_cancelled() {
        return "task was cancelled".to_string();
    }
    match err.try_into_panic() {
        Ok(payload) => panic_message(payload.as_ref()),
        Err(_) => "task failed".to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
