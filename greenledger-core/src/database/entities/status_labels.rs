use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::common_types::LabelColor;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "status_labels")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub organization_id: i32,
    pub name: String,
    pub color: String,
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
    #[sea_orm(has_many = "super::view_labels::Entity")]
    ViewLabels,
}

impl Related<super::organizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizations.def()
    }
}

impl Related<super::view_labels::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ViewLabels.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn get_color(&self) -> LabelColor {
        self.color.parse().unwrap_or_default()
    }
}
