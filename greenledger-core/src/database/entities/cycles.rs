use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A named reporting period. Views are scoped to exactly one cycle.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cycles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub organization_id: i32,
    pub name: String,
    pub start_date: Date,
    pub end_date: Date,
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
    #[sea_orm(has_many = "super::inventory_views::Entity")]
    InventoryViews,
}

impl Related<super::organizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizations.def()
    }
}

impl Related<super::inventory_views::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryViews.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn contains(&self, date: Date) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}
