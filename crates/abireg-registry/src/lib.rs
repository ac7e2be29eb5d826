//! ABI registry: entity records, version history and the use cases that
//! drive them.
//!
//! Storage and backup are collaborators behind async traits:
//!
//! - **repository**: [`AbiRepository`] with in-memory and filesystem backends
//! - **backup**: [`BackupStore`], content-addressed copies of canonical ABIs
//! - **service**: [`AbiRegistry`], create/update/delete and version queries

pub mod backup;
pub mod config;
pub mod entity;
pub mod error;
pub mod local;
pub mod repository;
pub mod service;

// Re-exports for convenience.
pub use backup::{BackupStore, LocalBackupStore};
pub use config::RegistrySettings;
pub use entity::{AbiEntity, AbiPatch, AbiVersion};
pub use error::{RegistryError, Result};
pub use local::LocalRepository;
pub use repository::{AbiRepository, MemoryRepository};
pub use service::{AbiRegistry, CreateAbi, UpdateAbi, UpdateOutcome};
