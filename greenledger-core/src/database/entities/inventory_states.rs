use sea_orm::entity::prelude::*;
use sea_orm::{IdenStatic, Iterable, Set};
use serde::{Deserialize, Serialize};

use super::common_types::{DataState, InventoryKind, MergeState, SourceType};

/// A point-in-time snapshot of a property or tax lot as reported by one import.
///
/// The fixed columns cover the well-known benchmarking attributes. Anything
/// else an import carries lives in `extra_data`, keyed by name. A key in
/// `extra_data` must never shadow one of the fixed columns.
///
/// Once an audit log entry references a state, its attributes are frozen;
/// later changes produce a new state instead. Only the `data_state` and
/// `merge_state` status flags keep moving after that.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_states")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub organization_id: i32,
    pub kind: String,
    pub import_file_id: Option<i32>,
    pub source_type: String,
    pub data_state: String,
    pub merge_state: String,
    pub confidence: Option<f64>,

    // Identifiers
    pub jurisdiction_property_id: Option<String>,
    pub jurisdiction_tax_lot_id: Option<String>,
    pub custom_id_1: Option<String>,
    pub pm_parent_property_id: Option<String>,
    pub pm_property_id: Option<String>,
    pub lot_number: Option<String>,
    pub block_number: Option<String>,
    pub district: Option<String>,

    // Address
    pub property_name: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub state_province: Option<String>,
    pub postal_code: Option<String>,

    // Building characteristics
    pub building_count: Option<i32>,
    pub number_properties: Option<i32>,
    pub use_description: Option<String>,
    pub year_built: Option<i32>,
    pub gross_floor_area: Option<f64>,
    pub conditioned_floor_area: Option<f64>,
    pub occupied_floor_area: Option<f64>,
    pub recent_sale_date: Option<ChronoDateTimeUtc>,
    pub owner: Option<String>,
    pub owner_email: Option<String>,
    pub owner_telephone: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub property_notes: Option<String>,

    // Energy metrics
    pub year_ending: Option<Date>,
    pub energy_score: Option<i32>,
    pub site_eui: Option<f64>,
    pub source_eui: Option<f64>,
    pub site_eui_weather_normalized: Option<f64>,
    pub source_eui_weather_normalized: Option<f64>,
    pub generation_date: Option<ChronoDateTimeUtc>,
    pub release_date: Option<ChronoDateTimeUtc>,
    #[sea_orm(column_type = "Text", nullable)]
    pub energy_alerts: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub space_alerts: Option<String>,
    pub building_certification: Option<String>,

    pub extra_data: Json,
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
        belongs_to = "super::import_files::Entity",
        from = "Column::ImportFileId",
        to = "super::import_files::Column::Id"
    )]
    ImportFiles,
    #[sea_orm(has_many = "super::inventory_views::Entity")]
    InventoryViews,
    #[sea_orm(has_many = "super::inventory_audit_logs::Entity")]
    InventoryAuditLogs,
}

impl Related<super::organizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizations.def()
    }
}

impl Related<super::import_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ImportFiles.def()
    }
}

impl Related<super::inventory_views::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryViews.def()
    }
}

impl Related<super::inventory_audit_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryAuditLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    /// A freshly imported state with an empty extension map. Fixed fields are
    /// left unset and default to NULL on insert.
    pub fn new(organization_id: i32, kind: InventoryKind, source_type: SourceType) -> Self {
        Self {
            organization_id: Set(organization_id),
            kind: Set(kind.as_str().to_string()),
            source_type: Set(source_type.as_str().to_string()),
            data_state: Set(DataState::Imported.as_str().to_string()),
            merge_state: Set(MergeState::Unknown.as_str().to_string()),
            confidence: Set(Some(0.0)),
            extra_data: Set(serde_json::json!({})),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
    }
}

/// Whether `name` is one of the fixed columns of `inventory_states`.
pub fn is_fixed_field(name: &str) -> bool {
    Column::iter().any(|column| column.as_str() == name)
}

/// Names of every fixed column, in declaration order.
pub fn fixed_field_names() -> Vec<String> {
    Column::iter()
        .map(|column| column.as_str().to_string())
        .collect()
}

impl Model {
    pub fn get_kind(&self) -> Option<InventoryKind> {
        self.kind.parse().ok()
    }

    pub fn get_source_type(&self) -> Option<SourceType> {
        self.source_type.parse().ok()
    }

    pub fn get_data_state(&self) -> Option<DataState> {
        self.data_state.parse().ok()
    }

    pub fn get_merge_state(&self) -> Option<MergeState> {
        self.merge_state.parse().ok()
    }

    pub fn extra_field(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra_data.as_object().and_then(|map| map.get(key))
    }
}
