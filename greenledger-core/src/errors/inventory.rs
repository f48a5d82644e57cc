//! Errors raised by promotion, audit lineage, merge, hierarchy and state services.

use thiserror::Error;

/// Inventory domain errors
#[derive(Error, Debug)]
pub enum InventoryError {
    /// More than one view binds the same state within one cycle. The
    /// per-cycle uniqueness invariant was broken upstream; never resolved
    /// silently.
    #[error(
        "Integrity violation: {view_count} views bind state {state_id} in cycle {cycle_id}"
    )]
    IntegrityViolation {
        state_id: i32,
        cycle_id: i32,
        view_count: usize,
    },

    /// No audit log entry is reachable for a view
    #[error("Lineage gap: view {view_id} has no audit log entries")]
    LineageGap { view_id: i32 },

    /// Re-parenting would make a group contain itself
    #[error("Hierarchy cycle: {entity_id} cannot be placed under {parent_id}")]
    HierarchyCycle { entity_id: i32, parent_id: i32 },

    /// Ancestor walk exceeded the configured depth bound
    #[error("Hierarchy deeper than {max_depth} levels above {entity_id}")]
    HierarchyTooDeep { entity_id: i32, max_depth: usize },

    /// An extension field shadows a fixed column
    #[error("Extra data key '{0}' collides with a fixed field")]
    ExtraDataCollision(String),

    /// Attribute write to a state already referenced by audit history
    #[error("State {0} is bound to audit history and cannot be modified")]
    StateFrozen(i32),

    #[error("Invalid data state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The view moved to another state between read and write
    #[error("View {view_id} no longer points at state {expected_state_id}")]
    StaleView { view_id: i32, expected_state_id: i32 },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl InventoryError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        InventoryError::NotFound { entity, id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        InventoryError::Validation(message.into())
    }

    /// Faults that indicate bad data rather than bad input
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            InventoryError::IntegrityViolation { .. } | InventoryError::LineageGap { .. }
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            InventoryError::IntegrityViolation { .. } => "INTEGRITY_VIOLATION",
            InventoryError::LineageGap { .. } => "LINEAGE_GAP",
            InventoryError::HierarchyCycle { .. } => "HIERARCHY_CYCLE",
            InventoryError::HierarchyTooDeep { .. } => "RECURSION_DEPTH_EXCEEDED",
            InventoryError::ExtraDataCollision(_) => "EXTRA_DATA_COLLISION",
            InventoryError::StateFrozen(_) => "STATE_FROZEN",
            InventoryError::InvalidTransition { .. } => "INVALID_TRANSITION",
            InventoryError::StaleView { .. } => "STALE_VIEW",
            InventoryError::NotFound { .. } => "NOT_FOUND",
            InventoryError::Validation(_) => "VALIDATION_FAILED",
            InventoryError::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_violation_message() {
        let err = InventoryError::IntegrityViolation {
            state_id: 12,
            cycle_id: 3,
            view_count: 2,
        };
        assert_eq!(
            err.to_string(),
            "Integrity violation: 2 views bind state 12 in cycle 3"
        );
        assert!(err.is_integrity_error());
        assert_eq!(err.error_code(), "INTEGRITY_VIOLATION");
    }

    #[test]
    fn test_depth_error_uses_recursion_code() {
        let err = InventoryError::HierarchyTooDeep {
            entity_id: 1,
            max_depth: 64,
        };
        assert_eq!(err.error_code(), "RECURSION_DEPTH_EXCEEDED");
        assert!(!err.is_integrity_error());
    }
}
