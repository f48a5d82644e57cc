use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "view_labels")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub view_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub label_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_views::Entity",
        from = "Column::ViewId",
        to = "super::inventory_views::Column::Id"
    )]
    InventoryViews,
    #[sea_orm(
        belongs_to = "super::status_labels::Entity",
        from = "Column::LabelId",
        to = "super::status_labels::Column::Id"
    )]
    StatusLabels,
}

impl Related<super::inventory_views::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryViews.def()
    }
}

impl Related<super::status_labels::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusLabels.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
