mod common;

use std::sync::Arc;

use greenledger::config::LedgerConfig;
use greenledger::database::entities::{
    inventory, inventory_states, organizations, users, InventoryKind,
};
use async_trait::async_trait;
use greenledger::lifecycle::{
    BulkDeleteManager, DeleteStage, InMemoryProgressStore, InventoryCollection, JobStatus,
    ProgressRecord, ProgressStore, SeaOrmDirectory, TokioTaskExecutor,
};
use greenledger::AppContext;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use tokio::sync::Mutex;

/// Progress store that remembers every value it was left holding
#[derive(Default)]
struct RecordingProgressStore {
    inner: InMemoryProgressStore,
    history: Mutex<Vec<(DeleteStage, f64)>>,
}

#[async_trait]
impl ProgressStore for RecordingProgressStore {
    async fn set(&self, key: &str, record: ProgressRecord) -> anyhow::Result<()> {
        let mut history = self.history.lock().await;
        history.push((record.stage, record.progress));
        self.inner.set(key, record).await
    }

    async fn increment(&self, key: &str, amount: f64) -> anyhow::Result<ProgressRecord> {
        let mut history = self.history.lock().await;
        let record = self.inner.increment(key, amount).await?;
        history.push((record.stage, record.progress));
        Ok(record)
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<ProgressRecord>> {
        self.inner.get(key).await
    }
}

fn manager(db: &DatabaseConnection, chunk_size: usize) -> BulkDeleteManager {
    BulkDeleteManager::new(
        db.clone(),
        LedgerConfig::default().with_delete_chunk_size(chunk_size),
        Arc::new(TokioTaskExecutor::new()),
        Arc::new(InMemoryProgressStore::new()),
        Arc::new(SeaOrmDirectory::new(db.clone())),
    )
}

async fn owned_rows(db: &DatabaseConnection, organization_id: i32) -> (u64, u64) {
    let entities = inventory::Entity::find()
        .filter(inventory::Column::OrganizationId.eq(organization_id))
        .count(db)
        .await
        .unwrap();
    let states = inventory_states::Entity::find()
        .filter(inventory_states::Column::OrganizationId.eq(organization_id))
        .count(db)
        .await
        .unwrap();
    (entities, states)
}

#[tokio::test]
async fn deletes_organization_in_chunks() {
    let db = common::migrated_db().await;
    let org = common::organization(&db, "Doomed").await;
    let bystander = common::organization(&db, "Bystander").await;
    common::bulk_inventory(&db, org.id, InventoryKind::Property, 250).await;
    common::bulk_inventory(&db, bystander.id, InventoryKind::Property, 3).await;

    let manager = manager(&db, 100);
    let job = manager.delete_organization(org.id).await.unwrap();

    assert_eq!(
        job.chunk_sizes(InventoryCollection::Properties),
        vec![100, 100, 50]
    );
    assert_eq!(
        job.chunk_sizes(InventoryCollection::PropertyStates),
        vec![100, 100, 50]
    );
    assert!(job.chunk_sizes(InventoryCollection::TaxLots).is_empty());
    assert_eq!(job.chunks.len(), 6);

    let outcome = job.wait().await;
    assert!(outcome.is_success(), "{:?}", outcome.error);

    let record = manager.progress(org.id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Success);
    assert_eq!(record.stage, DeleteStage::Done);
    assert_eq!(record.progress, 100.0);

    assert_eq!(owned_rows(&db, org.id).await, (0, 0));
    assert!(organizations::Entity::find_by_id(org.id)
        .one(&db)
        .await
        .unwrap()
        .is_none());

    assert_eq!(owned_rows(&db, bystander.id).await, (3, 3));
    assert!(organizations::Entity::find_by_id(bystander.id)
        .one(&db)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn empty_organization_finishes_immediately() {
    let db = common::migrated_db().await;
    let org = common::organization(&db, "Empty").await;
    let manager = manager(&db, 100);

    let job = manager.delete_organization(org.id).await.unwrap();
    assert!(job.chunks.is_empty());
    assert!(job.is_finished());

    let record = manager.progress(org.id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Success);
    assert_eq!(record.progress, 100.0);
    assert!(job.wait().await.is_success());
}

#[tokio::test]
async fn removes_members_left_without_an_organization() {
    let db = common::migrated_db().await;
    let org = common::organization(&db, "Closing").await;
    let other = common::organization(&db, "Staying").await;
    common::bulk_inventory(&db, org.id, InventoryKind::TaxLot, 5).await;

    let orphan = common::member(&db, "orphan@example.org", &[org.id]).await;
    let shared = common::member(&db, "shared@example.org", &[org.id, other.id]).await;

    let ctx = AppContext::new(db.clone(), LedgerConfig::default().with_delete_chunk_size(2));
    let job = ctx.delete_organization(org.id).await.unwrap();
    assert_eq!(job.chunk_sizes(InventoryCollection::TaxLots), vec![2, 2, 1]);
    assert!(job.wait().await.is_success());

    assert!(users::Entity::find_by_id(orphan.id)
        .one(&db)
        .await
        .unwrap()
        .is_none());
    assert!(users::Entity::find_by_id(shared.id)
        .one(&db)
        .await
        .unwrap()
        .is_some());

    let record = ctx.delete_progress(org.id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Success);
}

#[tokio::test]
async fn delete_of_promoted_inventory_cascades() {
    let db = common::migrated_db().await;
    let org = common::organization(&db, "Promoted").await;
    let cycle = common::cycle(&db, org.id, 2024).await;
    let ctx = AppContext::new(db.clone(), LedgerConfig::default());

    for _ in 0..3 {
        let state = common::property_state(&db, org.id, None).await;
        ctx.promote(state.id, cycle.id).await.unwrap();
    }

    let job = ctx.delete_organization(org.id).await.unwrap();
    assert!(job.wait().await.is_success());
    assert_eq!(owned_rows(&db, org.id).await, (0, 0));
    assert_eq!(
        greenledger::database::entities::inventory_views::Entity::find()
            .count(&db)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn progress_never_moves_backwards() {
    let db = common::migrated_db().await;
    let org = common::organization(&db, "Watched").await;
    common::bulk_inventory(&db, org.id, InventoryKind::Property, 250).await;
    common::bulk_inventory(&db, org.id, InventoryKind::TaxLot, 40).await;

    let store = Arc::new(RecordingProgressStore::default());
    let manager = BulkDeleteManager::new(
        db.clone(),
        LedgerConfig::default().with_delete_chunk_size(100),
        Arc::new(TokioTaskExecutor::new()),
        store.clone(),
        Arc::new(SeaOrmDirectory::new(db.clone())),
    );

    let job = manager.delete_organization(org.id).await.unwrap();
    let chunk_count = job.chunks.len();
    assert_eq!(chunk_count, 8);
    assert!(job.wait().await.is_success());

    let history = store.history.lock().await.clone();
    // pending, enumerating, chunk deleting, one per chunk, finalizing, done
    assert_eq!(history.len(), 3 + chunk_count + 2);
    for pair in history.windows(2) {
        assert!(
            pair[1].1 >= pair[0].1,
            "progress dropped from {} ({}) to {} ({})",
            pair[0].1,
            pair[0].0,
            pair[1].1,
            pair[1].0
        );
    }

    let below_done: Vec<f64> = history
        .iter()
        .filter(|(stage, _)| *stage != DeleteStage::Done)
        .map(|(_, progress)| *progress)
        .collect();
    assert!(below_done.iter().all(|progress| *progress < 100.0));
    assert_eq!(history.last(), Some(&(DeleteStage::Done, 100.0)));
}
