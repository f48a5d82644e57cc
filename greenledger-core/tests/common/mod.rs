#![allow(dead_code)]

use greenledger::database::entities::{
    cycles, import_files, inventory, inventory_states, organization_users, organizations, users,
    InventoryKind, SourceType,
};
use greenledger::database::setup_database;
use greenledger_test_utils::TestDb;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

pub async fn migrated_db() -> DatabaseConnection {
    let db = TestDb::new_in_memory()
        .connect()
        .await
        .expect("Failed to connect to test database");
    setup_database(&db).await.expect("Failed to run migrations");
    db
}

pub async fn organization(db: &DatabaseConnection, name: &str) -> organizations::Model {
    organizations::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert organization")
}

pub async fn cycle(db: &DatabaseConnection, organization_id: i32, year: i32) -> cycles::Model {
    cycles::ActiveModel {
        organization_id: Set(organization_id),
        name: Set(format!("{} Calendar Year", year)),
        start_date: Set(chrono::NaiveDate::from_ymd_opt(year, 1, 1).unwrap()),
        end_date: Set(chrono::NaiveDate::from_ymd_opt(year, 12, 31).unwrap()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert cycle")
}

pub async fn import_file(
    db: &DatabaseConnection,
    organization_id: i32,
    filename: &str,
) -> import_files::Model {
    import_files::ActiveModel {
        organization_id: Set(organization_id),
        filename: Set(filename.to_string()),
        source_type: Set(SourceType::PortfolioRaw.as_str().to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert import file")
}

pub async fn property_state(
    db: &DatabaseConnection,
    organization_id: i32,
    import_file_id: Option<i32>,
) -> inventory_states::Model {
    let mut state = inventory_states::ActiveModel::new(
        organization_id,
        InventoryKind::Property,
        SourceType::PortfolioFinal,
    );
    state.import_file_id = Set(import_file_id);
    state.insert(db).await.expect("Failed to insert state")
}

/// Insert `count` bare entities and `count` bare states of `kind`
pub async fn bulk_inventory(
    db: &DatabaseConnection,
    organization_id: i32,
    kind: InventoryKind,
    count: usize,
) {
    let entities: Vec<inventory::ActiveModel> = (0..count)
        .map(|_| inventory::ActiveModel::new(organization_id, kind))
        .collect();
    inventory::Entity::insert_many(entities)
        .exec(db)
        .await
        .expect("Failed to insert entities");

    let states: Vec<inventory_states::ActiveModel> = (0..count)
        .map(|_| {
            inventory_states::ActiveModel::new(organization_id, kind, SourceType::PortfolioRaw)
        })
        .collect();
    inventory_states::Entity::insert_many(states)
        .exec(db)
        .await
        .expect("Failed to insert states");
}

pub async fn member(
    db: &DatabaseConnection,
    email: &str,
    organization_ids: &[i32],
) -> users::Model {
    let user = users::ActiveModel {
        email: Set(email.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert user");

    for organization_id in organization_ids {
        organization_users::ActiveModel {
            organization_id: Set(*organization_id),
            user_id: Set(user.id),
            role: Set("member".to_string()),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to insert membership");
    }
    user
}
