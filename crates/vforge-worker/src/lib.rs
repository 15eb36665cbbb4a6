//! Asynchronous video job pipeline.
//!
//! - `Orchestrator`: runs one job through its stages to a terminal state
//! - `Scheduler`: launches orchestrations in the background with bounded concurrency
//! - `StaleJobSweeper`: fails jobs abandoned by a crashed run
//! - `JobService`: validated submit / poll / list / delete surface

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod scheduler;
pub mod service;
pub mod sweep;
pub mod workspace;

pub use config::WorkerConfig;
pub use error::{PipelineError, PipelineResult, ServiceError, ServiceResult, Stage};
pub use logging::JobLogger;
pub use orchestrator::{artifact_file_name, Capabilities, Orchestrator};
pub use scheduler::Scheduler;
pub use service::{JobService, REMOTE_DISABLED_MESSAGE};
pub use sweep::{StaleJobSweeper, STALE_JOB_MESSAGE};
pub use workspace::JobWorkspace;
