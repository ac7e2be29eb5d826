//! Registry error types.

use std::path::PathBuf;

use abireg_core::{ContentHash, ValidationErrors, VersionError};
use uuid::Uuid;

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The submitted ABI failed structural or business-rule validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Another entity already holds this content hash.
    #[error("ABI already registered as {existing_id} (hash {hash})")]
    DuplicateAbi { hash: ContentHash, existing_id: Uuid },

    /// Unknown or soft-deleted entity.
    #[error("ABI not found: {id}")]
    NotFound { id: Uuid },

    /// Requested version number not found.
    #[error("version {number} not found for ABI {id}")]
    VersionNotFound { id: Uuid, number: u64 },

    /// A version record with this number already exists.
    #[error("version number {number} already exists for ABI {id}")]
    VersionConflict { id: Uuid, number: u64 },

    /// A newer version record landed before the entity was advanced to
    /// `number`; the entity keeps the newer state.
    #[error("version {number} of ABI {id} was superseded by version {latest}")]
    VersionSuperseded { id: Uuid, number: u64, latest: u64 },

    /// An explicit version does not advance past the latest one.
    #[error("version {version} is not newer than latest version {latest}")]
    VersionNotNewer { version: String, latest: String },

    /// Version string could not be parsed or bumped.
    #[error(transparent)]
    InvalidVersion(#[from] VersionError),

    /// Backup store failure.
    #[error("backup failed: {detail}")]
    Backup { detail: String },

    /// Malformed data found in a storage backend.
    #[error("storage error at {path}: {detail}")]
    Storage { path: PathBuf, detail: String },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
