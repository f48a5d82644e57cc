use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::common_types::SourceType;

/// An uploaded file the external import pipeline turned into states.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "import_files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub organization_id: i32,
    pub filename: String,
    pub source_type: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organizations::Entity",
        from = "Column::OrganizationId",
        to = "super::organizations::Column::Id"
    )]
    Organizations,
    #[sea_orm(has_many = "super::inventory_states::Entity")]
    InventoryStates,
}

impl Related<super::organizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizations.def()
    }
}

impl Related<super::inventory_states::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryStates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn get_source_type(&self) -> Option<SourceType> {
        self.source_type.parse().ok()
    }
}
