use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use super::{InventoryError, LifecycleError};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CoreErrorKind {
    NotFound,
    Validation,
    Conflict,
    Unavailable,
    Internal,
}

/// Caller-facing error envelope.
///
/// Domain errors from the inventory and lifecycle services convert into this
/// so the outer layers only need to branch on `kind`.
#[derive(Debug)]
pub struct CoreError {
    kind: CoreErrorKind,
    message: String,
    fields: Option<BTreeMap<String, String>>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: None,
            source: None,
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("entity".to_string(), entity.into());
        fields.insert("id".to_string(), id.into());

        Self {
            kind: CoreErrorKind::NotFound,
            message: "Resource not found".to_string(),
            fields: Some(fields),
            source: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Conflict, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Internal, message)
    }

    pub fn with_fields(mut self, fields: BTreeMap<String, String>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> CoreErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> Option<&BTreeMap<String, String>> {
        self.fields.as_ref()
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl StdError for CoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        let mut wrapped = CoreError::internal("Unhandled error");
        wrapped.source = Some(err.into());
        wrapped
    }
}

impl From<InventoryError> for CoreError {
    fn from(err: InventoryError) -> Self {
        match &err {
            InventoryError::NotFound { entity, id } => {
                let (entity, id) = (entity.to_string(), id.to_string());
                CoreError::not_found(entity, id).with_source(err)
            }
            InventoryError::ExtraDataCollision(_)
            | InventoryError::StateFrozen(_)
            | InventoryError::InvalidTransition { .. }
            | InventoryError::HierarchyCycle { .. }
            | InventoryError::HierarchyTooDeep { .. }
            | InventoryError::Validation(_) => {
                CoreError::validation(err.to_string()).with_source(err)
            }
            InventoryError::StaleView { .. } => {
                CoreError::conflict(err.to_string()).with_source(err)
            }
            InventoryError::IntegrityViolation { .. }
            | InventoryError::LineageGap { .. }
            | InventoryError::Database(_) => CoreError::internal(err.to_string()).with_source(err),
        }
    }
}

impl From<LifecycleError> for CoreError {
    fn from(err: LifecycleError) -> Self {
        match &err {
            LifecycleError::AlreadyRunning(_) => {
                CoreError::conflict(err.to_string()).with_source(err)
            }
            LifecycleError::OrganizationNotFound(id) => {
                let id = id.to_string();
                CoreError::not_found("Organization", id).with_source(err)
            }
            LifecycleError::TaskFailed(_)
            | LifecycleError::ProgressStore(_)
            | LifecycleError::Directory(_) => {
                CoreError::unavailable(err.to_string()).with_source(err)
            }
            LifecycleError::ChunkDeleteFailure { .. } | LifecycleError::Database(_) => {
                CoreError::internal(err.to_string()).with_source(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_carries_fields() {
        let err = CoreError::not_found("Cycle", "7");
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
        let fields = err.fields().expect("fields");
        assert_eq!(fields.get("entity").map(String::as_str), Some("Cycle"));
        assert_eq!(fields.get("id").map(String::as_str), Some("7"));
    }

    #[test]
    fn test_inventory_errors_map_to_kinds() {
        let err: CoreError = InventoryError::IntegrityViolation {
            state_id: 1,
            cycle_id: 2,
            view_count: 2,
        }
        .into();
        assert_eq!(err.kind(), CoreErrorKind::Internal);

        let err: CoreError = InventoryError::ExtraDataCollision("city".to_string()).into();
        assert_eq!(err.kind(), CoreErrorKind::Validation);

        let err: CoreError = InventoryError::StaleView {
            view_id: 3,
            expected_state_id: 4,
        }
        .into();
        assert_eq!(err.kind(), CoreErrorKind::Conflict);

        let err: CoreError = InventoryError::not_found("View", 9).into();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_anyhow_errors_become_internal() {
        let err: CoreError = anyhow::anyhow!("progress backend unreachable").into();
        assert_eq!(err.kind(), CoreErrorKind::Internal);
        assert_eq!(err.message(), "Unhandled error");
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "progress backend unreachable");
    }

    #[test]
    fn test_lifecycle_errors_map_to_kinds() {
        let err: CoreError = LifecycleError::AlreadyRunning(5).into();
        assert_eq!(err.kind(), CoreErrorKind::Conflict);
        assert_eq!(err.to_string(), "Conflict: Organization 5 is already being deleted");
    }
}
