//! Error types for admission, configuration and server startup.

use citadel_inventory::DefinitionError;
use thiserror::Error;

/// Reasons a command or job is refused at the door.
///
/// Every rejection is synchronous and leaves no trace: no timestamp is
/// recorded and nothing is queued.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    /// The write buffer already holds `max_queue_size` entries.
    #[error("command queue overflow")]
    Overflow,
    /// The client exceeded its packets-per-second ceiling.
    #[error("rate limit exceeded")]
    RateLimited,
    /// The command id is at or below the client's processed watermark.
    #[error("duplicate command")]
    Duplicate,
}

/// Result type for admission.
pub type AdmissionResult<T> = Result<T, AdmissionError>;

/// Errors loading the server configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config {path}: {reason}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        reason: String,
    },
    /// File is not valid TOML for the schema.
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// A value is out of its allowed range.
    #[error("invalid config value {key}: {reason}")]
    Invalid {
        /// Dotted key.
        key: &'static str,
        /// What is wrong.
        reason: String,
    },
}

/// Errors building a server from its configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// Configuration problem.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Item or recipe definitions failed to load.
    #[error(transparent)]
    Definitions(#[from] DefinitionError),
}
