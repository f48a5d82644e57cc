use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::FutureExt;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use tracing::{debug, error, info, instrument, warn};

use crate::config::LedgerConfig;
use crate::database::entities::{inventory, inventory_states, InventoryKind};
use crate::errors::{LifecycleError, LifecycleResult};

use super::directory::OrganizationDirectory;
use super::progress::{DeleteStage, ProgressRecord, ProgressStore};
use super::tasks::{ChordCallback, Task, TaskExecutor, TaskHandle, TaskOutcome};

/// Share of the progress bar covered by chunk deletes. The remainder is
/// granted by finalization, so 100 is only ever reported once done.
pub const CHUNK_PROGRESS_SHARE: f64 = 0.99;

/// The four id lists an organization delete walks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InventoryCollection {
    Properties,
    PropertyStates,
    TaxLots,
    TaxLotStates,
}

impl InventoryCollection {
    pub const ALL: [InventoryCollection; 4] = [
        InventoryCollection::Properties,
        InventoryCollection::PropertyStates,
        InventoryCollection::TaxLots,
        InventoryCollection::TaxLotStates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryCollection::Properties => "properties",
            InventoryCollection::PropertyStates => "property_states",
            InventoryCollection::TaxLots => "tax_lots",
            InventoryCollection::TaxLotStates => "tax_lot_states",
        }
    }

    pub fn kind(&self) -> InventoryKind {
        match self {
            InventoryCollection::Properties | InventoryCollection::PropertyStates => {
                InventoryKind::Property
            }
            InventoryCollection::TaxLots | InventoryCollection::TaxLotStates => {
                InventoryKind::TaxLot
            }
        }
    }

    pub fn is_state(&self) -> bool {
        matches!(
            self,
            InventoryCollection::PropertyStates | InventoryCollection::TaxLotStates
        )
    }
}

impl fmt::Display for InventoryCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One chunk unit's worth of rows from a single collection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteChunk {
    pub collection: InventoryCollection,
    pub index: usize,
    pub ids: Vec<i32>,
}

impl DeleteChunk {
    pub fn label(&self) -> String {
        format!("{}-chunk-{}", self.collection, self.index)
    }
}

pub fn plan_chunks(
    collection: InventoryCollection,
    ids: &[i32],
    chunk_size: usize,
) -> Vec<DeleteChunk> {
    ids.chunks(chunk_size.max(1))
        .enumerate()
        .map(|(index, ids)| DeleteChunk {
            collection,
            index,
            ids: ids.to_vec(),
        })
        .collect()
}

/// Progress granted when a chunk of `chunk_len` rows out of `total` completes
pub fn chunk_increment(chunk_len: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    chunk_len as f64 / total as f64 * 100.0 * CHUNK_PROGRESS_SHARE
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkSummary {
    pub collection: InventoryCollection,
    pub index: usize,
    pub size: usize,
}

enum Completion {
    Finished(TaskOutcome),
    Running(TaskHandle),
}

/// A scheduled (or already completed) organization delete
pub struct DeleteJob {
    pub organization_id: i32,
    pub progress_key: String,
    pub chunks: Vec<ChunkSummary>,
    completion: Completion,
}

impl DeleteJob {
    pub fn chunk_sizes(&self, collection: InventoryCollection) -> Vec<usize> {
        self.chunks
            .iter()
            .filter(|chunk| chunk.collection == collection)
            .map(|chunk| chunk.size)
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        match &self.completion {
            Completion::Finished(_) => true,
            Completion::Running(handle) => handle.is_finished(),
        }
    }

    /// Wait for finalization to run
    pub async fn wait(self) -> TaskOutcome {
        match self.completion {
            Completion::Finished(outcome) => outcome,
            Completion::Running(handle) => handle.join().await,
        }
    }
}

/// Releases the per-organization lock when dropped
struct RunningGuard {
    running: Arc<DashMap<i32, ()>>,
    organization_id: i32,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.running.remove(&self.organization_id);
    }
}

#[derive(Clone)]
struct FinalizeContext {
    organization_id: i32,
    progress_key: String,
    directory: Arc<dyn OrganizationDirectory>,
    progress: Arc<dyn ProgressStore>,
}

/// Chunked, progress-tracked teardown of everything an organization owns.
///
/// Pending -> Enumerating -> ChunkDeleting -> Finalizing -> Done, or Failed.
/// Chunk units run as one chord; finalization is its fan-in step.
pub struct BulkDeleteManager {
    db: DatabaseConnection,
    config: LedgerConfig,
    executor: Arc<dyn TaskExecutor>,
    progress: Arc<dyn ProgressStore>,
    directory: Arc<dyn OrganizationDirectory>,
    running: Arc<DashMap<i32, ()>>,
}

impl BulkDeleteManager {
    pub fn new(
        db: DatabaseConnection,
        config: LedgerConfig,
        executor: Arc<dyn TaskExecutor>,
        progress: Arc<dyn ProgressStore>,
        directory: Arc<dyn OrganizationDirectory>,
    ) -> Self {
        Self {
            db,
            config,
            executor,
            progress,
            directory,
            running: Arc::new(DashMap::new()),
        }
    }

    pub fn progress_key(&self, organization_id: i32) -> String {
        self.config.progress_key(organization_id)
    }

    pub async fn progress(&self, organization_id: i32) -> LifecycleResult<Option<ProgressRecord>> {
        self.progress
            .get(&self.progress_key(organization_id))
            .await
            .map_err(|e| LifecycleError::ProgressStore(e.to_string()))
    }

    fn acquire(&self, organization_id: i32) -> LifecycleResult<RunningGuard> {
        match self.running.entry(organization_id) {
            Entry::Occupied(_) => Err(LifecycleError::AlreadyRunning(organization_id)),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(RunningGuard {
                    running: self.running.clone(),
                    organization_id,
                })
            }
        }
    }

    async fn report(&self, record: ProgressRecord) -> LifecycleResult<()> {
        let key = record.progress_key.clone();
        self.progress
            .set(&key, record)
            .await
            .map_err(|e| LifecycleError::ProgressStore(e.to_string()))
    }

    /// Start deleting an organization.
    ///
    /// Returns once chunk units are scheduled. An organization with nothing
    /// to delete is finalized before this returns.
    #[instrument(skip(self))]
    pub async fn delete_organization(&self, organization_id: i32) -> LifecycleResult<DeleteJob> {
        let guard = self.acquire(organization_id)?;
        let key = self.progress_key(organization_id);
        let record = ProgressRecord::new(&key, DeleteStage::Pending);
        self.report(record.clone()).await?;

        let exists = self
            .directory
            .organization_exists(organization_id)
            .await
            .map_err(|e| LifecycleError::Directory(e.to_string()))?;
        if !exists {
            self.report(record.failed(format!("Organization {} not found", organization_id)))
                .await?;
            return Err(LifecycleError::OrganizationNotFound(organization_id));
        }

        self.report(record.clone().with_stage(DeleteStage::Enumerating))
            .await?;
        let (plan, total) = match self.enumerate(organization_id).await {
            Ok(enumerated) => enumerated,
            Err(err) => {
                error!(organization_id, error = %err, "Enumeration failed");
                self.report(record.failed(err.to_string())).await?;
                return Err(err);
            }
        };

        let chunks: Vec<ChunkSummary> = plan
            .iter()
            .map(|chunk| ChunkSummary {
                collection: chunk.collection,
                index: chunk.index,
                size: chunk.ids.len(),
            })
            .collect();
        let context = FinalizeContext {
            organization_id,
            progress_key: key.clone(),
            directory: self.directory.clone(),
            progress: self.progress.clone(),
        };

        if total == 0 {
            info!(organization_id, "Organization has no inventory; finalizing inline");
            let outcome = match finalize(context, Vec::new()).await {
                Ok(()) => TaskOutcome::success(format!("delete-org-{}", organization_id)),
                Err(err) => {
                    TaskOutcome::failure(format!("delete-org-{}", organization_id), err.to_string())
                }
            };
            drop(guard);
            return Ok(DeleteJob {
                organization_id,
                progress_key: key,
                chunks,
                completion: Completion::Finished(outcome),
            });
        }

        self.report(record.with_stage(DeleteStage::ChunkDeleting))
            .await?;

        let tasks: Vec<Task> = plan
            .into_iter()
            .map(|chunk| {
                let db = self.db.clone();
                let progress = self.progress.clone();
                let key = key.clone();
                let amount = chunk_increment(chunk.ids.len(), total);
                Task::new(chunk.label(), async move {
                    let deleted = delete_chunk(&db, organization_id, &chunk).await?;
                    progress.increment(&key, amount).await?;
                    debug!(chunk = %chunk.label(), deleted, "Chunk deleted");
                    Ok(())
                })
            })
            .collect();

        info!(
            organization_id,
            total,
            units = tasks.len(),
            "Scheduling chunk deletes"
        );

        let on_complete: ChordCallback = Box::new(move |outcomes: Vec<TaskOutcome>| {
            async move {
                let _guard = guard;
                finalize(context, outcomes).await
            }
            .boxed()
        });
        let handle = self.executor.chord(
            &format!("delete-org-{}", organization_id),
            tasks,
            on_complete,
        );

        Ok(DeleteJob {
            organization_id,
            progress_key: key,
            chunks,
            completion: Completion::Running(handle),
        })
    }

    async fn enumerate(&self, organization_id: i32) -> LifecycleResult<(Vec<DeleteChunk>, usize)> {
        let mut plan = Vec::new();
        let mut total = 0;

        for collection in InventoryCollection::ALL {
            let ids = self.collect_ids(organization_id, collection).await?;
            total += ids.len();
            plan.extend(plan_chunks(collection, &ids, self.config.delete_chunk_size));
        }

        debug!(organization_id, total, chunks = plan.len(), "Enumerated inventory");
        Ok((plan, total))
    }

    async fn collect_ids(
        &self,
        organization_id: i32,
        collection: InventoryCollection,
    ) -> LifecycleResult<Vec<i32>> {
        let kind = collection.kind().as_str();
        let ids = if collection.is_state() {
            inventory_states::Entity::find()
                .select_only()
                .column(inventory_states::Column::Id)
                .filter(inventory_states::Column::OrganizationId.eq(organization_id))
                .filter(inventory_states::Column::Kind.eq(kind))
                .order_by_asc(inventory_states::Column::Id)
                .into_tuple::<i32>()
                .all(&self.db)
                .await?
        } else {
            inventory::Entity::find()
                .select_only()
                .column(inventory::Column::Id)
                .filter(inventory::Column::OrganizationId.eq(organization_id))
                .filter(inventory::Column::Kind.eq(kind))
                .order_by_asc(inventory::Column::Id)
                .into_tuple::<i32>()
                .all(&self.db)
                .await?
        };
        Ok(ids)
    }
}

async fn delete_chunk(
    db: &DatabaseConnection,
    organization_id: i32,
    chunk: &DeleteChunk,
) -> LifecycleResult<u64> {
    let ids = chunk.ids.clone();
    let result = if chunk.collection.is_state() {
        inventory_states::Entity::delete_many()
            .filter(inventory_states::Column::Id.is_in(ids))
            .filter(inventory_states::Column::OrganizationId.eq(organization_id))
            .exec(db)
            .await
    } else {
        inventory::Entity::delete_many()
            .filter(inventory::Column::Id.is_in(ids))
            .filter(inventory::Column::OrganizationId.eq(organization_id))
            .exec(db)
            .await
    };

    result
        .map(|deleted| deleted.rows_affected)
        .map_err(|e| {
            warn!(chunk = %chunk.label(), error = %e, "Chunk delete failed");
            LifecycleError::ChunkDeleteFailure {
                collection: chunk.collection.to_string(),
                size: chunk.ids.len(),
                reason: e.to_string(),
            }
        })
}

/// Fan-in step: runs after every chunk unit has terminated
async fn finalize(context: FinalizeContext, outcomes: Vec<TaskOutcome>) -> anyhow::Result<()> {
    let key = context.progress_key.as_str();
    let current = context
        .progress
        .get(key)
        .await?
        .unwrap_or_else(|| ProgressRecord::new(key, DeleteStage::ChunkDeleting));

    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|outcome| !outcome.is_success())
        .map(|outcome| outcome.label.as_str())
        .collect();
    if !failed.is_empty() {
        let message = format!(
            "{} of {} chunk deletes failed: {}",
            failed.len(),
            outcomes.len(),
            failed.join(", ")
        );
        error!(organization_id = context.organization_id, "{}", message);
        context.progress.set(key, current.failed(message.clone())).await?;
        anyhow::bail!(message);
    }

    context
        .progress
        .set(key, current.clone().with_stage(DeleteStage::Finalizing))
        .await?;

    match remove_organization(&context).await {
        Ok(removed_users) => {
            context.progress.set(key, current.succeeded()).await?;
            info!(
                organization_id = context.organization_id,
                removed_users, "Organization deleted"
            );
            Ok(())
        }
        Err(err) => {
            error!(organization_id = context.organization_id, error = %err, "Finalization failed");
            context.progress.set(key, current.failed(err.to_string())).await?;
            Err(err)
        }
    }
}

/// Deletes the organization, then every former member left without one
async fn remove_organization(context: &FinalizeContext) -> anyhow::Result<usize> {
    let directory = &context.directory;
    let user_ids = directory.list_user_ids(context.organization_id).await?;
    directory.delete(context.organization_id).await?;

    let mut removed = 0;
    for user_id in user_ids {
        if !directory.user_has_other_orgs(user_id).await? {
            directory.delete_user(user_id).await?;
            removed += 1;
        }
    }
    Ok(removed)
}
