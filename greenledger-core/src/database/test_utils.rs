#[cfg(test)]
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

#[cfg(test)]
use super::entities::{
    cycles, import_files, inventory_states, organizations, InventoryKind, SourceType,
};

#[cfg(test)]
pub async fn setup_test_db() -> DatabaseConnection {
    // Create an in-memory SQLite database for testing
    let db = super::establish_connection("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");

    super::setup_database(&db)
        .await
        .expect("Failed to run migrations");

    db
}

#[cfg(test)]
pub async fn seed_organization(db: &DatabaseConnection, name: &str) -> organizations::Model {
    organizations::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert organization")
}

#[cfg(test)]
pub async fn seed_cycle(db: &DatabaseConnection, organization_id: i32, year: i32) -> cycles::Model {
    cycles::ActiveModel {
        organization_id: Set(organization_id),
        name: Set(format!("{} Calendar Year", year)),
        start_date: Set(chrono::NaiveDate::from_ymd_opt(year, 1, 1).expect("valid date")),
        end_date: Set(chrono::NaiveDate::from_ymd_opt(year, 12, 31).expect("valid date")),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert cycle")
}

#[cfg(test)]
pub async fn seed_import_file(
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

#[cfg(test)]
pub async fn seed_state(
    db: &DatabaseConnection,
    organization_id: i32,
    import_file_id: Option<i32>,
    source_type: SourceType,
) -> inventory_states::Model {
    let mut state =
        inventory_states::ActiveModel::new(organization_id, InventoryKind::Property, source_type);
    state.import_file_id = Set(import_file_id);
    state.insert(db).await.expect("Failed to insert state")
}
