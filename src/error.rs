//! Error types for caller contract violations.
//!
//! Expected outcomes of interactive use (a rejected move or rotation, a
//! restore without free space) are not errors and are reported through the
//! return values of the respective operations.

use thiserror::Error;

use crate::model::{PackageId, ValidationError};

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised when the engine is driven in a way its contract forbids.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// No package with this id exists in the session.
    #[error("Unknown package id {0}")]
    UnknownPackage(PackageId),

    /// The operation needs an active package.
    #[error("Package {0} is not active")]
    NotActive(PackageId),

    /// The operation needs a removed package.
    #[error("Package {0} is not removed")]
    NotRemoved(PackageId),

    /// A drag operation was issued without a drag in progress.
    #[error("No drag in progress")]
    NoActiveDrag,

    /// A drag was started while another one is in progress.
    #[error("Package {0} is already being dragged")]
    DragInProgress(PackageId),

    /// Container dimensions are missing or invalid.
    #[error("Invalid container: {0}")]
    InvalidContainer(#[from] ValidationError),
}

impl EngineError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::UnknownPackage(_) => "unknown_package",
            EngineError::NotActive(_) => "not_active",
            EngineError::NotRemoved(_) => "not_removed",
            EngineError::NoActiveDrag => "no_active_drag",
            EngineError::DragInProgress(_) => "drag_in_progress",
            EngineError::InvalidContainer(_) => "invalid_container",
        }
    }
}
