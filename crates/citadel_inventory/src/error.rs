//! # Inventory Error Types
//!
//! All errors that can occur while resolving, validating or mutating containers.

use thiserror::Error;

/// Errors returned by inventory operations.
///
/// Every variant is produced before any mutation starts, except
/// [`InventoryError::Internal`], which aborts only the current command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// Unknown container, item, definition or world object.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller may not touch this container.
    #[error("access to container denied")]
    Forbidden,

    /// Optimistic-concurrency precondition failed.
    #[error("version mismatch: expected {expected}, actual {actual}")]
    VersionMismatch {
        /// Version declared by the caller.
        expected: u64,
        /// Live version of the container.
        actual: u64,
    },

    /// Collision, capacity or content-rule violation.
    #[error("invalid placement: {0}")]
    InvalidPlacement(String),

    /// Malformed request or a container kind the operation does not handle.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The target is too far away from the character.
    #[error("target out of range")]
    OutOfRange,

    /// Store inconsistency detected mid-operation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl InventoryError {
    /// Protocol-level code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::EntityNotFound,
            Self::Forbidden => ErrorCode::CannotInteract,
            Self::VersionMismatch { .. } => ErrorCode::VersionMismatch,
            Self::InvalidPlacement(_) => ErrorCode::InventoryFull,
            Self::Unsupported(_) => ErrorCode::InvalidRequest,
            Self::OutOfRange => ErrorCode::OutOfRange,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }
}

/// Stable error codes sent to clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    /// Malformed or unsupported request.
    InvalidRequest = 1,
    /// Referenced entity does not exist.
    EntityNotFound = 2,
    /// Caller may not interact with the target.
    CannotInteract = 3,
    /// Expected version did not match.
    VersionMismatch = 4,
    /// Destination cannot accept the item.
    InventoryFull = 5,
    /// Target is outside interaction range.
    OutOfRange = 6,
    /// Server-side failure.
    InternalError = 7,
}

/// Result type for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Errors raised while loading item or recipe definitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// Definition file could not be read.
    #[error("failed to read {path}: {reason}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        reason: String,
    },

    /// Definition file is not valid TOML for the expected schema.
    #[error("failed to parse definitions: {0}")]
    Parse(String),

    /// File declares an unsupported schema version.
    #[error("unsupported definitions version {0}, expected 1")]
    UnsupportedVersion(u32),

    /// Two definitions share a numeric id.
    #[error("duplicate def_id {0}")]
    DuplicateId(u32),

    /// Two definitions share a key.
    #[error("duplicate key {0}")]
    DuplicateKey(String),

    /// A definition field is out of range.
    #[error("{key}: {reason}")]
    Invalid {
        /// Key of the offending definition.
        key: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Result type for definition loading.
pub type DefinitionResult<T> = Result<T, DefinitionError>;

/// Failure reported by a persistence collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("persistence failed: {0}")]
pub struct PersistError(pub String);
