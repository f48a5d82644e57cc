use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

use super::common_types::InventoryKind;

/// The long-lived identity of a property or tax lot.
///
/// Everything measured about the record lives in `inventory_states`; this row
/// only carries ownership and the optional campus/building grouping. A group
/// (`is_group = true`) may have members pointing at it through `parent_id`.
///
/// Related entities:
/// - `inventory_views`: one view per cycle binding this record to a state
/// - `inventory` (self): parent group
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub organization_id: i32,
    pub kind: String, // 'property', 'tax_lot'
    pub is_group: bool,
    pub parent_id: Option<i32>,
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
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id"
    )]
    Parent,
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

impl ActiveModel {
    pub fn new(organization_id: i32, kind: InventoryKind) -> Self {
        Self {
            id: ActiveValue::NotSet,
            organization_id: Set(organization_id),
            kind: Set(kind.as_str().to_string()),
            is_group: Set(false),
            parent_id: Set(None),
            created_at: Set(chrono::Utc::now()),
        }
    }
}

impl Model {
    pub fn get_kind(&self) -> Option<InventoryKind> {
        self.kind.parse().ok()
    }
}
