use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

use super::common_types::AuditRecordType;

/// One node of the audit lineage DAG.
///
/// Each entry records the state a view moved to and the entry (or two
/// entries, for a merge) it descends from. Roots have no parents. `view_id`
/// is NULL once the view the entry was written for has been deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_audit_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub organization_id: i32,
    pub state_id: i32,
    pub view_id: Option<i32>,
    pub parent1_id: Option<i32>,
    pub parent2_id: Option<i32>,
    pub name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub import_filename: Option<String>,
    pub record_type: String,
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
        belongs_to = "super::inventory_states::Entity",
        from = "Column::StateId",
        to = "super::inventory_states::Column::Id"
    )]
    InventoryStates,
    #[sea_orm(
        belongs_to = "super::inventory_views::Entity",
        from = "Column::ViewId",
        to = "super::inventory_views::Column::Id"
    )]
    InventoryViews,
    #[sea_orm(belongs_to = "Entity", from = "Column::Parent1Id", to = "Column::Id")]
    Parent1,
    #[sea_orm(belongs_to = "Entity", from = "Column::Parent2Id", to = "Column::Id")]
    Parent2,
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

impl Related<super::inventory_views::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryViews.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn new(organization_id: i32, state_id: i32, record_type: AuditRecordType) -> Self {
        Self {
            id: ActiveValue::NotSet,
            organization_id: Set(organization_id),
            state_id: Set(state_id),
            view_id: Set(None),
            parent1_id: Set(None),
            parent2_id: Set(None),
            name: Set(None),
            description: Set(None),
            import_filename: Set(None),
            record_type: Set(record_type.as_str().to_string()),
            created_at: Set(chrono::Utc::now()),
        }
    }
}

impl Model {
    pub fn get_record_type(&self) -> Option<AuditRecordType> {
        self.record_type.parse().ok()
    }

    pub fn is_root(&self) -> bool {
        self.parent1_id.is_none() && self.parent2_id.is_none()
    }

    pub fn is_merge(&self) -> bool {
        self.parent1_id.is_some() && self.parent2_id.is_some()
    }

    pub fn parent_ids(&self) -> impl Iterator<Item = i32> {
        self.parent1_id.into_iter().chain(self.parent2_id)
    }
}
