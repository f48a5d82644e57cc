//! Domain-specific error types for greenledger-core
//!
//! - **InventoryError**: promotion, audit lineage, merge, hierarchy and state
//!   operations
//! - **LifecycleError**: bulk organization deletion
//! - **CoreError**: kind-classified envelope both convert into
//!
//! ```rust
//! use greenledger::errors::{CoreError, CoreErrorKind, InventoryError};
//!
//! let err: CoreError = InventoryError::not_found("Cycle", 4).into();
//! assert_eq!(err.kind(), CoreErrorKind::NotFound);
//! ```

pub mod core_error;
pub mod inventory;
pub mod lifecycle;

pub use core_error::{CoreError, CoreErrorKind};
pub use inventory::InventoryError;
pub use lifecycle::LifecycleError;

/// Result type alias for inventory operations
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Result type alias for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;
