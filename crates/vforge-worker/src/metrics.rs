//! Pipeline metrics.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::Stage;

/// Metric name constants.
pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "vforge_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "vforge_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vforge_jobs_failed_total";
    pub const STAGE_DURATION_SECONDS: &str = "vforge_stage_duration_seconds";
}

/// Install the Prometheus recorder with an HTTP listener on `port`.
pub fn install_prometheus(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    Ok(())
}

pub fn record_job_submitted() {
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
}

pub fn record_job_completed() {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
}

/// `stage` is "internal" for failures outside any stage.
pub fn record_job_failed(stage: &str) {
    counter!(names::JOBS_FAILED_TOTAL, "stage" => stage.to_string()).increment(1);
}

pub fn record_stage_duration(stage: Stage, elapsed: Duration) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage.as_str()).record(elapsed.as_secs_f64());
}
