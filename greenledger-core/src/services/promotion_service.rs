use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::{debug, error, info, instrument};

use crate::database::entities::{
    cycles, import_files, inventory, inventory_states, inventory_views, AuditRecordType,
    InventoryKind, MergeState,
};
use crate::errors::{InventoryError, InventoryResult};

use super::audit_log_service::{insert_root_entry, AuditMetadata, ROOT_ON_CREATE_DESCRIPTION};

/// Binds imported states to per-cycle views.
pub struct PromotionService {
    db: DatabaseConnection,
}

impl PromotionService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Bind `state_id` to a view in `cycle_id`.
    ///
    /// - no view binds the state in the cycle: a new entity and view are
    ///   created along with a parentless `ImportCreate` audit entry
    /// - exactly one does: it is returned untouched
    /// - more than one: `IntegrityViolation`, nothing is written
    #[instrument(skip(self))]
    pub async fn promote(
        &self,
        state_id: i32,
        cycle_id: i32,
    ) -> InventoryResult<inventory_views::Model> {
        let txn = self.db.begin().await?;

        let state = inventory_states::Entity::find_by_id(state_id)
            .one(&txn)
            .await?
            .ok_or_else(|| InventoryError::not_found("State", state_id))?;
        cycles::Entity::find_by_id(cycle_id)
            .one(&txn)
            .await?
            .ok_or_else(|| InventoryError::not_found("Cycle", cycle_id))?;

        let mut existing = inventory_views::Entity::find()
            .filter(inventory_views::Column::StateId.eq(state_id))
            .filter(inventory_views::Column::CycleId.eq(cycle_id))
            .all(&txn)
            .await?;

        match existing.len() {
            0 => {}
            1 => {
                let view = existing.remove(0);
                debug!(view_id = view.id, "State already promoted in cycle");
                return Ok(view);
            }
            view_count => {
                error!(
                    state_id,
                    cycle_id, view_count, "Multiple views bind one state in a cycle"
                );
                return Err(InventoryError::IntegrityViolation {
                    state_id,
                    cycle_id,
                    view_count,
                });
            }
        }

        let kind = state.get_kind().ok_or_else(|| {
            InventoryError::validation(format!(
                "State {} has unknown kind '{}'",
                state.id, state.kind
            ))
        })?;
        let entity = inventory::ActiveModel::new(state.organization_id, kind)
            .insert(&txn)
            .await?;

        let now = chrono::Utc::now();
        let view = inventory_views::ActiveModel {
            inventory_id: Set(entity.id),
            cycle_id: Set(cycle_id),
            state_id: Set(state.id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let import_filename = match state.import_file_id {
            Some(file_id) => import_files::Entity::find_by_id(file_id)
                .one(&txn)
                .await?
                .map(|file| file.filename),
            None => None,
        };

        let mut metadata = AuditMetadata::new(AuditRecordType::ImportCreate)
            .with_name("Import Creation")
            .with_description(ROOT_ON_CREATE_DESCRIPTION);
        metadata.import_filename = import_filename;
        let root = insert_root_entry(&txn, entity.organization_id, state.id, view.id, metadata)
            .await?;

        if state.get_merge_state() == Some(MergeState::Unknown) {
            let mut active: inventory_states::ActiveModel = state.into();
            active.merge_state = Set(MergeState::New.as_str().to_string());
            active.update(&txn).await?;
        }

        txn.commit().await?;

        info!(
            view_id = view.id,
            entity_id = entity.id,
            kind = %kind,
            root_entry = root.id,
            "Promoted state to new view"
        );
        Ok(view)
    }

    /// Promote every state of `kind` from one import file into `cycle_id`
    pub async fn promote_import_file(
        &self,
        import_file_id: i32,
        kind: InventoryKind,
        cycle_id: i32,
    ) -> InventoryResult<Vec<inventory_views::Model>> {
        let states = inventory_states::Entity::find()
            .filter(inventory_states::Column::ImportFileId.eq(import_file_id))
            .filter(inventory_states::Column::Kind.eq(kind.as_str()))
            .all(&self.db)
            .await?;

        let mut views = Vec::with_capacity(states.len());
        for state in states {
            views.push(self.promote(state.id, cycle_id).await?);
        }
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entities::{inventory_audit_logs as audit_logs, SourceType};
    use crate::database::test_utils::{
        seed_cycle, seed_import_file, seed_organization, seed_state, setup_test_db,
    };
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_promote_creates_entity_view_and_root_entry() {
        let db = setup_test_db().await;
        let org = seed_organization(&db, "Promotion Org").await;
        let cycle = seed_cycle(&db, org.id, 2024).await;
        let file = seed_import_file(&db, org.id, "portfolio.xlsx").await;
        let state = seed_state(&db, org.id, Some(file.id), SourceType::PortfolioFinal).await;

        let view = PromotionService::new(db.clone())
            .promote(state.id, cycle.id)
            .await
            .unwrap();

        assert_eq!(view.state_id, state.id);
        assert_eq!(view.cycle_id, cycle.id);

        let entity = inventory::Entity::find_by_id(view.inventory_id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entity.organization_id, org.id);
        assert_eq!(entity.get_kind(), Some(InventoryKind::Property));

        let entries = audit_logs::Entity::find().all(&db).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_root());
        assert_eq!(entries[0].view_id, Some(view.id));
        assert_eq!(entries[0].import_filename.as_deref(), Some("portfolio.xlsx"));
        assert_eq!(entries[0].get_record_type(), Some(AuditRecordType::ImportCreate));

        let state = inventory_states::Entity::find_by_id(state.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.get_merge_state(), Some(MergeState::New));
    }

    #[tokio::test]
    async fn test_promote_is_idempotent() {
        let db = setup_test_db().await;
        let org = seed_organization(&db, "Idempotent Org").await;
        let cycle = seed_cycle(&db, org.id, 2024).await;
        let state = seed_state(&db, org.id, None, SourceType::AssessedFinal).await;
        let service = PromotionService::new(db.clone());

        let first = service.promote(state.id, cycle.id).await.unwrap();
        let second = service.promote(state.id, cycle.id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inventory::Entity::find().count(&db).await.unwrap(), 1);
        assert_eq!(inventory_views::Entity::find().count(&db).await.unwrap(), 1);
        assert_eq!(audit_logs::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_promote_unknown_cycle_is_not_found() {
        let db = setup_test_db().await;
        let org = seed_organization(&db, "Missing Cycle Org").await;
        let state = seed_state(&db, org.id, None, SourceType::AssessedFinal).await;

        let err = PromotionService::new(db.clone())
            .promote(state.id, 404)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::NotFound { entity: "Cycle", id: 404 }));
        assert_eq!(inventory::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_promote_import_file_promotes_each_state() {
        let db = setup_test_db().await;
        let org = seed_organization(&db, "Batch Org").await;
        let cycle = seed_cycle(&db, org.id, 2021).await;
        let file = seed_import_file(&db, org.id, "batch.csv").await;
        for _ in 0..3 {
            seed_state(&db, org.id, Some(file.id), SourceType::AssessedFinal).await;
        }
        seed_state(&db, org.id, None, SourceType::AssessedFinal).await;

        let views = PromotionService::new(db.clone())
            .promote_import_file(file.id, InventoryKind::Property, cycle.id)
            .await
            .unwrap();
        assert_eq!(views.len(), 3);
        assert_eq!(inventory_views::Entity::find().count(&db).await.unwrap(), 3);
    }
}
