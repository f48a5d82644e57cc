pub mod common_types;
pub mod cycles;
pub mod import_files;
pub mod organization_users;
pub mod organizations;
pub mod users;

// Inventory lineage: identity, snapshots, per-cycle bindings and the audit DAG
pub mod inventory;
pub mod inventory_audit_logs;
pub mod inventory_states;
pub mod inventory_views;

pub mod status_labels;
pub mod view_labels;

pub use common_types::{
    AuditRecordType, DataState, InventoryKind, LabelColor, MergeState, SourceType,
};
