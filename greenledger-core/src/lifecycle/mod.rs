//! Bulk lifecycle operations and the collaborators they run on.

pub mod bulk_delete;
pub mod directory;
pub mod progress;
pub mod tasks;

pub use bulk_delete::{
    chunk_increment, plan_chunks, BulkDeleteManager, ChunkSummary, DeleteChunk, DeleteJob,
    InventoryCollection, CHUNK_PROGRESS_SHARE,
};
pub use directory::{OrganizationDirectory, SeaOrmDirectory};
pub use progress::{DeleteStage, InMemoryProgressStore, JobStatus, ProgressRecord, ProgressStore};
pub use tasks::{ChordCallback, Task, TaskExecutor, TaskHandle, TaskOutcome, TokioTaskExecutor};
