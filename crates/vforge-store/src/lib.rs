//! Job record persistence.
//!
//! The pipeline talks to a `JobStore`: create, get, merge-patch update,
//! delete, list. Two backends are provided:
//! - `MemoryJobStore`: process-local map
//! - `FileJobStore`: the same map, snapshotted to a JSON file after every write

pub mod error;
pub mod file;
pub mod memory;
mod table;

use async_trait::async_trait;
use vforge_models::{Job, JobId, JobPatch, NewJob};

pub use error::{StoreError, StoreResult};
pub use file::FileJobStore;
pub use memory::MemoryJobStore;

/// Key-value store of job records keyed by store-assigned ids.
///
/// Each call is atomic for the record it touches.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new `pending` job and assign its id.
    async fn create(&self, request: NewJob) -> StoreResult<Job>;

    async fn get(&self, id: JobId) -> StoreResult<Option<Job>>;

    /// Merge `patch` into the record. `Ok(None)` when the id is unknown.
    async fn update(&self, id: JobId, patch: &JobPatch) -> StoreResult<Option<Job>>;

    /// Remove the record, returning whether it existed.
    async fn delete(&self, id: JobId) -> StoreResult<bool>;

    /// All records, ordered by id.
    async fn list_all(&self) -> StoreResult<Vec<Job>>;
}
