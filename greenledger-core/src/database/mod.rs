pub mod connection;
pub mod entities;
pub mod migrations;
pub mod test_utils;

pub use connection::{establish_connection, get_database_url};

use sea_orm::{DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

/// Bring the schema up to date.
pub async fn setup_database(db: &DatabaseConnection) -> Result<(), DbErr> {
    migrations::Migrator::up(db, None).await
}
