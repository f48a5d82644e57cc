//! Errors raised by bulk lifecycle operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Organization {0} is already being deleted")]
    AlreadyRunning(i32),

    #[error("Organization {0} not found")]
    OrganizationNotFound(i32),

    /// One chunk unit failed; sibling chunks keep running
    #[error("Failed to delete {collection} chunk of {size} rows: {reason}")]
    ChunkDeleteFailure {
        collection: String,
        size: usize,
        reason: String,
    },

    /// A task unit panicked or was cancelled by the executor
    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("Progress store error: {0}")]
    ProgressStore(String),

    #[error("Organization directory error: {0}")]
    Directory(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}
