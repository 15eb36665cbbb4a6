mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use vforge_models::{JobPatch, JobStatus, ProcessingOptions};
use vforge_store::JobStore;
use vforge_worker::{StaleJobSweeper, STALE_JOB_MESSAGE};

use common::{options, FakeTranscoder, Fakes, Harness};

fn sweeper(h: &Harness, threshold: Duration) -> StaleJobSweeper {
    StaleJobSweeper::new(
        h.store_dyn(),
        h.scheduler.clone(),
        threshold,
        Duration::from_millis(20),
    )
}

#[tokio::test]
async fn startup_reconciliation_fails_unfinished_jobs() {
    let h = Harness::new().await;
    let pending = h.upload_job(ProcessingOptions::default()).await;
    let processing = h.upload_job(ProcessingOptions::default()).await;
    h.store.update(processing, &JobPatch::start(10)).await.unwrap();
    let finished = h.upload_job(options(false, false)).await;
    h.orchestrator.run(finished).await;

    let failed = sweeper(&h, Duration::from_secs(3600))
        .reconcile_startup()
        .await
        .unwrap();

    assert_eq!(failed, 2);
    for id in [pending, processing] {
        let job = h.assert_status(id, JobStatus::Failed).await;
        assert_eq!(job.error_message.as_deref(), Some(STALE_JOB_MESSAGE));
    }
    h.assert_status(finished, JobStatus::Completed).await;
}

#[tokio::test]
async fn sweep_respects_the_threshold() {
    let h = Harness::new().await;
    let id = h.upload_job(ProcessingOptions::default()).await;
    h.store.update(id, &JobPatch::start(10)).await.unwrap();

    assert_eq!(sweeper(&h, Duration::from_secs(3600)).sweep_once().await.unwrap(), 0);
    h.assert_status(id, JobStatus::Processing).await;

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(sweeper(&h, Duration::from_millis(1)).sweep_once().await.unwrap(), 1);
    h.assert_status(id, JobStatus::Failed).await;

    // Already failed; nothing left to do
    assert_eq!(sweeper(&h, Duration::from_millis(1)).sweep_once().await.unwrap(), 0);
}

#[tokio::test]
async fn running_jobs_are_left_alone() {
    let gate = Arc::new(Semaphore::new(0));
    let h = Harness::with(Fakes {
        transcoder: FakeTranscoder {
            gate: Some(Arc::clone(&gate)),
            ..FakeTranscoder::default()
        },
        ..Fakes::default()
    })
    .await;
    let running = h.upload_job(options(false, false)).await;
    let abandoned = h.upload_job(options(false, false)).await;
    h.scheduler.submit(running);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let failed = sweeper(&h, Duration::ZERO).reconcile_startup().await.unwrap();

    assert_eq!(failed, 1);
    h.assert_status(abandoned, JobStatus::Failed).await;

    gate.add_permits(10);
    h.scheduler.wait_idle().await;
    h.assert_status(running, JobStatus::Completed).await;
}

#[tokio::test]
async fn periodic_loop_stops_on_shutdown() {
    let h = Harness::new().await;
    let id = h.upload_job(ProcessingOptions::default()).await;

    let sweeper = Arc::new(sweeper(&h, Duration::from_millis(1)));
    let (tx, rx) = watch::channel(false);
    let task = {
        let sweeper = Arc::clone(&sweeper);
        tokio::spawn(async move { sweeper.run(rx).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    h.assert_status(id, JobStatus::Failed).await;

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("sweeper should stop")
        .unwrap();
}
