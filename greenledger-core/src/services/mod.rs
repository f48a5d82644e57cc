pub mod audit_log_service;
pub mod hierarchy_service;
pub mod label_service;
pub mod merge_service;
pub mod promotion_service;
pub mod state_service;

pub use audit_log_service::{AuditLogService, AuditMetadata, StateUpdate, ViewHandle};
pub use hierarchy_service::HierarchyService;
pub use label_service::{LabelService, DEFAULT_LABELS};
pub use merge_service::{MergeService, UnmergeOutcome};
pub use promotion_service::PromotionService;
pub use state_service::StateService;
