use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Binds one inventory record to one state within one cycle.
///
/// `(inventory_id, cycle_id)` is unique. `state_id` is the only column that
/// moves after creation, and every move is paired with an audit log append.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_views")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub inventory_id: i32,
    pub cycle_id: i32,
    pub state_id: i32,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory::Entity",
        from = "Column::InventoryId",
        to = "super::inventory::Column::Id"
    )]
    Inventory,
    #[sea_orm(
        belongs_to = "super::cycles::Entity",
        from = "Column::CycleId",
        to = "super::cycles::Column::Id"
    )]
    Cycles,
    #[sea_orm(
        belongs_to = "super::inventory_states::Entity",
        from = "Column::StateId",
        to = "super::inventory_states::Column::Id"
    )]
    InventoryStates,
    #[sea_orm(has_many = "super::view_labels::Entity")]
    ViewLabels,
}

impl Related<super::inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventory.def()
    }
}

impl Related<super::cycles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cycles.def()
    }
}

impl Related<super::inventory_states::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryStates.def()
    }
}

impl Related<super::view_labels::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ViewLabels.def()
    }
}

impl Related<super::status_labels::Entity> for Entity {
    fn to() -> RelationDef {
        super::view_labels::Relation::StatusLabels.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::view_labels::Relation::InventoryViews.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
