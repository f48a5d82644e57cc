mod common;

use greenledger::database::entities::{inventory_audit_logs, inventory_views, AuditRecordType};
use greenledger::database::{establish_connection, setup_database};
use greenledger::services::{AuditLogService, AuditMetadata, MergeService, PromotionService};
use greenledger_test_utils::TempDir;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

fn manual_edit() -> AuditMetadata {
    AuditMetadata::new(AuditRecordType::UserEdit).with_name("Manual Edit")
}

#[tokio::test]
async fn successive_updates_form_a_single_chain() {
    let db = common::migrated_db().await;
    let org = common::organization(&db, "Lineage").await;
    let cycle = common::cycle(&db, org.id, 2023).await;
    let file = common::import_file(&db, org.id, "covered-buildings.xlsx").await;
    let original = common::property_state(&db, org.id, Some(file.id)).await;

    let view = PromotionService::new(db.clone())
        .promote(original.id, cycle.id)
        .await
        .unwrap();
    let audit = AuditLogService::new(db.clone());

    let mut last_state = original.id;
    for _ in 0..5 {
        let next = common::property_state(&db, org.id, None).await;
        let update = audit
            .update_state(view.id, next.id, manual_edit())
            .await
            .unwrap();
        assert_eq!(update.view.state_id, next.id);
        last_state = next.id;
    }

    let entries = inventory_audit_logs::Entity::find()
        .filter(inventory_audit_logs::Column::ViewId.eq(view.id))
        .order_by_asc(inventory_audit_logs::Column::Id)
        .all(&db)
        .await
        .unwrap();
    assert_eq!(entries.len(), 6);
    assert!(entries[0].is_root());
    for pair in entries.windows(2) {
        assert_eq!(pair[1].parent1_id, Some(pair[0].id));
        assert_eq!(pair[1].parent2_id, None);
    }
    assert_eq!(entries[5].state_id, last_state);

    let history = audit.history(view.id).await.unwrap();
    assert_eq!(history.len(), 6);
    assert_eq!(history[0].id, entries[5].id);

    assert_eq!(
        audit.import_filename(view.id).await.unwrap().as_deref(),
        Some("covered-buildings.xlsx")
    );
}

#[tokio::test]
async fn merge_entry_points_at_both_prior_states() {
    let db = common::migrated_db().await;
    let org = common::organization(&db, "Merging").await;
    let cycle = common::cycle(&db, org.id, 2024).await;
    let file = common::import_file(&db, org.id, "first-upload.csv").await;
    let left = common::property_state(&db, org.id, Some(file.id)).await;
    let right = common::property_state(&db, org.id, None).await;
    let merged = common::property_state(&db, org.id, None).await;

    let promotion = PromotionService::new(db.clone());
    let target = promotion.promote(left.id, cycle.id).await.unwrap();
    let source = promotion.promote(right.id, cycle.id).await.unwrap();

    let update = MergeService::new(db.clone())
        .merge_views(target.id, source.id, merged.id, None)
        .await
        .unwrap();

    let parent1 = inventory_audit_logs::Entity::find_by_id(update.entry.parent1_id.unwrap())
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    let parent2 = inventory_audit_logs::Entity::find_by_id(update.entry.parent2_id.unwrap())
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(parent1.state_id, left.id);
    assert_eq!(parent2.state_id, right.id);

    // The source view is gone but its lineage is still reachable
    let audit = AuditLogService::new(db.clone());
    let history = audit.history(target.id).await.unwrap();
    assert!(history.iter().any(|entry| entry.id == parent2.id));
    assert_eq!(
        audit.import_filename(target.id).await.unwrap().as_deref(),
        Some("first-upload.csv")
    );
}

#[tokio::test]
async fn lineage_survives_reconnect_to_file_database() {
    let dir = TempDir::new().unwrap();
    let url = dir.sqlite_url("ledger.db");

    let view_id = {
        let db = establish_connection(&url).await.unwrap();
        setup_database(&db).await.unwrap();
        let org = common::organization(&db, "On Disk").await;
        let cycle = common::cycle(&db, org.id, 2022).await;
        let file = common::import_file(&db, org.id, "disk-import.csv").await;
        let state = common::property_state(&db, org.id, Some(file.id)).await;

        let view = PromotionService::new(db.clone())
            .promote(state.id, cycle.id)
            .await
            .unwrap();
        let next = common::property_state(&db, org.id, None).await;
        AuditLogService::new(db.clone())
            .update_state(view.id, next.id, manual_edit())
            .await
            .unwrap();
        drop(db);
        view.id
    };

    let db = establish_connection(&url).await.unwrap();
    let audit = AuditLogService::new(db.clone());
    let view = inventory_views::Entity::find_by_id(view_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    let handle = audit.handle(view);
    assert_eq!(
        handle.import_filename(&audit).await.unwrap().as_deref(),
        Some("disk-import.csv")
    );
    assert_eq!(audit.history(view_id).await.unwrap().len(), 2);
}
