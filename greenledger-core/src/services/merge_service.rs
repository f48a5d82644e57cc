use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use tracing::{info, instrument, warn};

use crate::database::entities::{
    inventory, inventory_audit_logs as audit_logs, inventory_states, inventory_views,
    AuditRecordType, MergeState,
};
use crate::errors::{InventoryError, InventoryResult};

use super::audit_log_service::{
    current_entry_or_root, first_entry_for_state, update_state_in, AuditMetadata, StateUpdate,
};

/// The two views an unmerge leaves behind
#[derive(Clone, Debug)]
pub struct UnmergeOutcome {
    /// The original view, rebound to its pre-merge state
    pub view: inventory_views::Model,
    /// A fresh view for the lineage that had been folded in
    pub restored_view: inventory_views::Model,
}

/// Folds two views' lineages into one and splits them back apart.
pub struct MergeService {
    db: DatabaseConnection,
}

impl MergeService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Merge `source_view_id` into `target_view_id`.
    ///
    /// The target is rebound to `merged_state_id` with a two-parent audit
    /// entry (target lineage first, source lineage second). The source view
    /// is removed, along with its entity when that entity has no other views.
    #[instrument(skip(self, metadata))]
    pub async fn merge_views(
        &self,
        target_view_id: i32,
        source_view_id: i32,
        merged_state_id: i32,
        metadata: Option<AuditMetadata>,
    ) -> InventoryResult<StateUpdate> {
        if target_view_id == source_view_id {
            return Err(InventoryError::validation("Cannot merge a view into itself"));
        }

        let txn = self.db.begin().await?;

        let target = load_view(&txn, target_view_id).await?;
        let source = load_view(&txn, source_view_id).await?;
        if target.cycle_id != source.cycle_id {
            return Err(InventoryError::validation(format!(
                "Views {} and {} belong to different cycles",
                target.id, source.id
            )));
        }

        let source_entry = current_entry_or_root(&txn, &source).await?;
        let metadata = metadata.unwrap_or_else(|| {
            AuditMetadata::new(AuditRecordType::Merge)
                .with_name("Merged")
                .with_description(format!("Merged view {} into view {}", source.id, target.id))
        });

        let update =
            update_state_in(&txn, &target, merged_state_id, Some(source_entry.id), metadata)
                .await?;
        set_merge_state(&txn, merged_state_id, MergeState::Merged).await?;

        inventory_views::Entity::delete_by_id(source.id)
            .exec(&txn)
            .await?;
        let remaining = inventory_views::Entity::find()
            .filter(inventory_views::Column::InventoryId.eq(source.inventory_id))
            .count(&txn)
            .await?;
        if remaining == 0 && source.inventory_id != target.inventory_id {
            inventory::Entity::delete_by_id(source.inventory_id)
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;

        info!(
            target_view = target.id,
            source_view = source.id,
            merged_state = merged_state_id,
            entry_id = update.entry.id,
            "Merged views"
        );
        Ok(update)
    }

    /// Undo the most recent merge recorded on `view_id`.
    ///
    /// The view goes back to the first parent's state and a new entity and
    /// view are created for the second parent's state. Both get an `Unmerge`
    /// entry chained off the merge entry.
    #[instrument(skip(self))]
    pub async fn unmerge_view(&self, view_id: i32) -> InventoryResult<UnmergeOutcome> {
        let txn = self.db.begin().await?;

        let view = load_view(&txn, view_id).await?;
        let merge_entry = first_entry_for_state(&txn, view.state_id)
            .await?
            .filter(|entry| entry.is_merge())
            .ok_or_else(|| {
                InventoryError::validation(format!("View {} has no merge to undo", view_id))
            })?;

        let (Some(parent1_id), Some(parent2_id)) = (merge_entry.parent1_id, merge_entry.parent2_id)
        else {
            return Err(InventoryError::LineageGap { view_id });
        };
        let parent1 = load_entry(&txn, parent1_id).await?;
        let parent2 = load_entry(&txn, parent2_id).await?;
        let merged_state_id = view.state_id;

        let metadata = AuditMetadata::new(AuditRecordType::Unmerge)
            .with_name("Unmerged")
            .with_description(format!("Unmerged view {}", view.id));
        let update = update_state_in(&txn, &view, parent1.state_id, None, metadata.clone()).await?;

        let entity = inventory::Entity::find_by_id(view.inventory_id)
            .one(&txn)
            .await?
            .ok_or_else(|| InventoryError::not_found("Inventory", view.inventory_id))?;
        let kind = entity.get_kind().ok_or_else(|| {
            InventoryError::validation(format!("Inventory {} has unknown kind", entity.id))
        })?;
        let restored_entity = inventory::ActiveModel::new(entity.organization_id, kind)
            .insert(&txn)
            .await?;

        let now = chrono::Utc::now();
        let restored_view = inventory_views::ActiveModel {
            inventory_id: Set(restored_entity.id),
            cycle_id: Set(view.cycle_id),
            state_id: Set(parent2.state_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut entry = audit_logs::ActiveModel::new(
            merge_entry.organization_id,
            parent2.state_id,
            AuditRecordType::Unmerge,
        );
        entry.view_id = Set(Some(restored_view.id));
        entry.parent1_id = Set(Some(merge_entry.id));
        entry.name = Set(metadata.name);
        entry.description = Set(metadata.description);
        entry.insert(&txn).await?;

        set_merge_state(&txn, merged_state_id, MergeState::Deleted).await?;

        txn.commit().await?;

        info!(
            view_id = view.id,
            restored_view = restored_view.id,
            merged_state = merged_state_id,
            "Unmerged view"
        );
        Ok(UnmergeOutcome {
            view: update.view,
            restored_view,
        })
    }
}

async fn load_view<C: ConnectionTrait>(
    conn: &C,
    view_id: i32,
) -> InventoryResult<inventory_views::Model> {
    inventory_views::Entity::find_by_id(view_id)
        .one(conn)
        .await?
        .ok_or_else(|| InventoryError::not_found("View", view_id))
}

async fn load_entry<C: ConnectionTrait>(
    conn: &C,
    entry_id: i32,
) -> InventoryResult<audit_logs::Model> {
    audit_logs::Entity::find_by_id(entry_id)
        .one(conn)
        .await?
        .ok_or_else(|| InventoryError::not_found("AuditLog", entry_id))
}

async fn set_merge_state<C: ConnectionTrait>(
    conn: &C,
    state_id: i32,
    merge_state: MergeState,
) -> InventoryResult<()> {
    let Some(state) = inventory_states::Entity::find_by_id(state_id)
        .one(conn)
        .await?
    else {
        warn!(state_id, "State vanished before merge state could be recorded");
        return Ok(());
    };

    let mut active: inventory_states::ActiveModel = state.into();
    active.merge_state = Set(merge_state.as_str().to_string());
    active.update(conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entities::SourceType;
    use crate::database::test_utils::{seed_cycle, seed_organization, seed_state, setup_test_db};
    use crate::services::PromotionService;

    #[tokio::test]
    async fn test_merge_records_two_parents_and_drops_source() {
        let db = setup_test_db().await;
        let org = seed_organization(&db, "Merge Org").await;
        let cycle = seed_cycle(&db, org.id, 2024).await;
        let left = seed_state(&db, org.id, None, SourceType::PortfolioFinal).await;
        let right = seed_state(&db, org.id, None, SourceType::AssessedFinal).await;
        let merged = seed_state(&db, org.id, None, SourceType::Composite).await;

        let promotion = PromotionService::new(db.clone());
        let target = promotion.promote(left.id, cycle.id).await.unwrap();
        let source = promotion.promote(right.id, cycle.id).await.unwrap();

        let update = MergeService::new(db.clone())
            .merge_views(target.id, source.id, merged.id, None)
            .await
            .unwrap();

        assert!(update.entry.is_merge());
        assert_eq!(update.view.state_id, merged.id);

        let parent1 = load_entry(&db, update.entry.parent1_id.unwrap()).await.unwrap();
        let parent2 = load_entry(&db, update.entry.parent2_id.unwrap()).await.unwrap();
        assert_eq!(parent1.state_id, left.id);
        assert_eq!(parent2.state_id, right.id);
        assert_eq!(parent2.view_id, None);

        assert!(inventory_views::Entity::find_by_id(source.id)
            .one(&db)
            .await
            .unwrap()
            .is_none());
        assert!(inventory::Entity::find_by_id(source.inventory_id)
            .one(&db)
            .await
            .unwrap()
            .is_none());

        let merged = inventory_states::Entity::find_by_id(merged.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(merged.get_merge_state(), Some(MergeState::Merged));
    }

    #[tokio::test]
    async fn test_unmerge_restores_both_lineages() {
        let db = setup_test_db().await;
        let org = seed_organization(&db, "Unmerge Org").await;
        let cycle = seed_cycle(&db, org.id, 2024).await;
        let left = seed_state(&db, org.id, None, SourceType::PortfolioFinal).await;
        let right = seed_state(&db, org.id, None, SourceType::AssessedFinal).await;
        let merged = seed_state(&db, org.id, None, SourceType::Composite).await;

        let promotion = PromotionService::new(db.clone());
        let target = promotion.promote(left.id, cycle.id).await.unwrap();
        let source = promotion.promote(right.id, cycle.id).await.unwrap();
        let service = MergeService::new(db.clone());
        let merge = service
            .merge_views(target.id, source.id, merged.id, None)
            .await
            .unwrap();

        let outcome = service.unmerge_view(target.id).await.unwrap();
        assert_eq!(outcome.view.state_id, left.id);
        assert_eq!(outcome.restored_view.state_id, right.id);
        assert_eq!(outcome.restored_view.cycle_id, cycle.id);
        assert_ne!(outcome.restored_view.inventory_id, target.inventory_id);

        let unmerge_entries = audit_logs::Entity::find()
            .filter(audit_logs::Column::RecordType.eq(AuditRecordType::Unmerge.as_str()))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(unmerge_entries.len(), 2);
        assert!(unmerge_entries
            .iter()
            .all(|entry| entry.parent1_id == Some(merge.entry.id)));

        let merged = inventory_states::Entity::find_by_id(merged.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(merged.get_merge_state(), Some(MergeState::Deleted));

        let err = service.unmerge_view(outcome.restored_view.id).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn test_merge_across_cycles_is_rejected() {
        let db = setup_test_db().await;
        let org = seed_organization(&db, "Cross Cycle Org").await;
        let first_cycle = seed_cycle(&db, org.id, 2023).await;
        let second_cycle = seed_cycle(&db, org.id, 2024).await;
        let left = seed_state(&db, org.id, None, SourceType::PortfolioFinal).await;
        let right = seed_state(&db, org.id, None, SourceType::PortfolioFinal).await;
        let merged = seed_state(&db, org.id, None, SourceType::Composite).await;

        let promotion = PromotionService::new(db.clone());
        let target = promotion.promote(left.id, first_cycle.id).await.unwrap();
        let source = promotion.promote(right.id, second_cycle.id).await.unwrap();

        let err = MergeService::new(db.clone())
            .merge_views(target.id, source.id, merged.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
        assert_eq!(
            inventory_views::Entity::find().count(&db).await.unwrap(),
            2
        );
    }
}
