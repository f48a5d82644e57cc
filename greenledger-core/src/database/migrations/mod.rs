pub use sea_orm_migration::prelude::*;

mod m20260901_000001_create_organizations;
mod m20260901_000002_create_inventory;
mod m20260902_000003_create_status_labels;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260901_000001_create_organizations::Migration),
            Box::new(m20260901_000002_create_inventory::Migration),
            Box::new(m20260902_000003_create_status_labels::Migration),
        ]
    }
}
