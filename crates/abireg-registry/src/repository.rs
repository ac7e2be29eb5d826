//! Persistence port for entities and version records.
//!
//! The registry use cases never touch storage directly. They go through
//! [`AbiRepository`], whose implementations must enforce uniqueness of
//! `(abi_id, version_number)` so concurrent updates cannot mint the same
//! version twice.

use std::collections::{BTreeMap, HashMap};

use abireg_core::ContentHash;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::entity::{AbiEntity, AbiPatch, AbiVersion};
use crate::error::{RegistryError, Result};

/// Storage of ABI entities and their version history.
#[async_trait]
pub trait AbiRepository: Send + Sync {
    /// Entity holding `hash`, including soft-deleted ones.
    async fn find_by_hash(&self, hash: &ContentHash) -> Result<Option<AbiEntity>>;

    /// Entity by id, including soft-deleted ones.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AbiEntity>>;

    /// Persist a new entity together with its first version record. Nothing
    /// is stored when either the hash or the version number is taken.
    async fn create(&self, entity: AbiEntity, initial: AbiVersion) -> Result<AbiEntity>;

    /// Apply `patch` to an entity. `None` when the id is unknown. Fails with
    /// [`RegistryError::VersionSuperseded`] when `patch.expected_latest` is
    /// set and another record has become the latest.
    async fn update(&self, id: Uuid, patch: AbiPatch) -> Result<Option<AbiEntity>>;

    /// Version history ordered by `version_number`.
    async fn list_versions(&self, abi_id: Uuid) -> Result<Vec<AbiVersion>>;

    async fn find_version_by_number(&self, abi_id: Uuid, number: u64)
        -> Result<Option<AbiVersion>>;

    /// Persist a version record. Fails with
    /// [`RegistryError::VersionConflict`] when the number is taken.
    async fn create_version(&self, version: AbiVersion) -> Result<AbiVersion>;

    /// Record with the highest `version_number`.
    async fn latest_version(&self, abi_id: Uuid) -> Result<Option<AbiVersion>>;
}

#[derive(Default)]
struct MemoryState {
    entities: HashMap<Uuid, AbiEntity>,
    by_hash: HashMap<ContentHash, Uuid>,
    versions: HashMap<Uuid, BTreeMap<u64, AbiVersion>>,
}

/// In-process repository backed by hash maps under a `tokio` lock.
#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AbiRepository for MemoryRepository {
    async fn find_by_hash(&self, hash: &ContentHash) -> Result<Option<AbiEntity>> {
        let state = self.state.read().await;
        Ok(state
            .by_hash
            .get(hash)
            .and_then(|id| state.entities.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AbiEntity>> {
        Ok(self.state.read().await.entities.get(&id).cloned())
    }

    async fn create(&self, entity: AbiEntity, initial: AbiVersion) -> Result<AbiEntity> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.by_hash.get(&entity.abi_hash) {
            return Err(RegistryError::DuplicateAbi {
                hash: entity.abi_hash.clone(),
                existing_id: *existing,
            });
        }
        let history = state.versions.entry(entity.id).or_default();
        if history.contains_key(&initial.version_number) {
            return Err(RegistryError::VersionConflict {
                id: entity.id,
                number: initial.version_number,
            });
        }
        history.insert(initial.version_number, initial);
        state.by_hash.insert(entity.abi_hash.clone(), entity.id);
        state.entities.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn update(&self, id: Uuid, patch: AbiPatch) -> Result<Option<AbiEntity>> {
        let mut state = self.state.write().await;
        let MemoryState {
            entities,
            by_hash,
            versions,
        } = &mut *state;
        let Some(entity) = entities.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(expected) = patch.expected_latest {
            let latest = versions
                .get(&id)
                .and_then(|history| history.keys().next_back().copied())
                .unwrap_or(0);
            if latest != expected {
                return Err(RegistryError::VersionSuperseded {
                    id,
                    number: expected,
                    latest,
                });
            }
        }

        if let Some(hash) = &patch.abi_hash {
            if let Some(other) = by_hash.get(hash).filter(|other| **other != id) {
                return Err(RegistryError::DuplicateAbi {
                    hash: hash.clone(),
                    existing_id: *other,
                });
            }
            by_hash.remove(&entity.abi_hash);
            by_hash.insert(hash.clone(), id);
        }

        patch.apply(entity, Utc::now());
        Ok(Some(entity.clone()))
    }

    async fn list_versions(&self, abi_id: Uuid) -> Result<Vec<AbiVersion>> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .get(&abi_id)
            .map(|history| history.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find_version_by_number(
        &self,
        abi_id: Uuid,
        number: u64,
    ) -> Result<Option<AbiVersion>> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .get(&abi_id)
            .and_then(|history| history.get(&number))
            .cloned())
    }

    async fn create_version(&self, version: AbiVersion) -> Result<AbiVersion> {
        let mut state = self.state.write().await;
        let history = state.versions.entry(version.abi_id).or_default();
        if history.contains_key(&version.version_number) {
            return Err(RegistryError::VersionConflict {
                id: version.abi_id,
                number: version.version_number,
            });
        }
        history.insert(version.version_number, version.clone());
        Ok(version)
    }

    async fn latest_version(&self, abi_id: Uuid) -> Result<Option<AbiVersion>> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .get(&abi_id)
            .and_then(|history| history.values().next_back())
            .cloned())
    }
}
