//! Filesystem repository for development and single-host deployments.
//!
//! Layout:
//! ```text
//! <root>/
//!   entities/
//!     <id>.json
//!   versions/
//!     <id>/
//!       <version_number>.json
//! ```
//!
//! Version files are opened with `create_new`, so two writers racing for the
//! same number see a [`RegistryError::VersionConflict`] instead of silently
//! overwriting each other. A new entity's first version file is written
//! before its entity file and removed again if the entity write fails.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use abireg_core::ContentHash;
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::entity::{AbiEntity, AbiPatch, AbiVersion};
use crate::error::{RegistryError, Result};
use crate::repository::AbiRepository;

/// JSON-file repository rooted at a directory.
pub struct LocalRepository {
    root: PathBuf,
    /// Serializes entity and version writes within this process.
    write_lock: Mutex<()>,
}

impl LocalRepository {
    /// Create a repository rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalRepository {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entities_dir(&self) -> PathBuf {
        self.root.join("entities")
    }

    fn entity_path(&self, id: Uuid) -> PathBuf {
        self.entities_dir().join(format!("{id}.json"))
    }

    fn versions_dir(&self, abi_id: Uuid) -> PathBuf {
        self.root.join("versions").join(abi_id.to_string())
    }

    fn version_path(&self, abi_id: Uuid, number: u64) -> PathBuf {
        self.versions_dir(abi_id).join(format!("{number}.json"))
    }

    async fn load_entities(&self) -> Result<Vec<AbiEntity>> {
        let dir = self.entities_dir();
        let mut entities = Vec::new();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(entities),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                if let Some(entity) = read_json::<AbiEntity>(&path).await? {
                    entities.push(entity);
                }
            }
        }
        Ok(entities)
    }

    async fn write_entity(&self, entity: &AbiEntity) -> Result<()> {
        fs::create_dir_all(self.entities_dir()).await?;
        let data = serde_json::to_vec_pretty(entity)?;
        fs::write(self.entity_path(entity.id), data).await?;
        Ok(())
    }

    async fn write_version(&self, version: &AbiVersion) -> Result<()> {
        fs::create_dir_all(self.versions_dir(version.abi_id)).await?;
        let path = self.version_path(version.abi_id, version.version_number);
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(RegistryError::VersionConflict {
                    id: version.abi_id,
                    number: version.version_number,
                });
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&serde_json::to_vec_pretty(version)?).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Read and parse a JSON file. `None` when the file does not exist.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let data = match fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|e| RegistryError::Storage {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
}

#[async_trait]
impl AbiRepository for LocalRepository {
    async fn find_by_hash(&self, hash: &ContentHash) -> Result<Option<AbiEntity>> {
        Ok(self
            .load_entities()
            .await?
            .into_iter()
            .find(|entity| entity.abi_hash == *hash))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AbiEntity>> {
        read_json(&self.entity_path(id)).await
    }

    async fn create(&self, entity: AbiEntity, initial: AbiVersion) -> Result<AbiEntity> {
        let _guard = self.write_lock.lock().await;
        if let Some(existing) = self.find_by_hash(&entity.abi_hash).await? {
            return Err(RegistryError::DuplicateAbi {
                hash: entity.abi_hash.clone(),
                existing_id: existing.id,
            });
        }
        self.write_version(&initial).await?;
        if let Err(e) = self.write_entity(&entity).await {
            let orphan = self.version_path(initial.abi_id, initial.version_number);
            if let Err(cleanup) = fs::remove_file(&orphan).await {
                warn!(path = %orphan.display(), error = %cleanup, "could not remove version file");
            }
            return Err(e);
        }
        Ok(entity)
    }

    async fn update(&self, id: Uuid, patch: AbiPatch) -> Result<Option<AbiEntity>> {
        let _guard = self.write_lock.lock().await;
        let Some(mut entity) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        if let Some(expected) = patch.expected_latest {
            let latest = self
                .latest_version(id)
                .await?
                .map_or(0, |v| v.version_number);
            if latest != expected {
                return Err(RegistryError::VersionSuperseded {
                    id,
                    number: expected,
                    latest,
                });
            }
        }
        if let Some(hash) = &patch.abi_hash {
            if let Some(other) = self.find_by_hash(hash).await?.filter(|other| other.id != id) {
                return Err(RegistryError::DuplicateAbi {
                    hash: hash.clone(),
                    existing_id: other.id,
                });
            }
        }
        patch.apply(&mut entity, Utc::now());
        self.write_entity(&entity).await?;
        Ok(Some(entity))
    }

    async fn list_versions(&self, abi_id: Uuid) -> Result<Vec<AbiVersion>> {
        let dir = self.versions_dir(abi_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let numbered = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.parse::<u64>().is_ok());
            if numbered {
                if let Some(version) = read_json::<AbiVersion>(&path).await? {
                    versions.push(version);
                }
            }
        }
        versions.sort_by_key(|v| v.version_number);
        Ok(versions)
    }

    async fn find_version_by_number(
        &self,
        abi_id: Uuid,
        number: u64,
    ) -> Result<Option<AbiVersion>> {
        read_json(&self.version_path(abi_id, number)).await
    }

    async fn create_version(&self, version: AbiVersion) -> Result<AbiVersion> {
        let _guard = self.write_lock.lock().await;
        self.write_version(&version).await?;
        Ok(version)
    }

    async fn latest_version(&self, abi_id: Uuid) -> Result<Option<AbiVersion>> {
        Ok(self.list_versions(abi_id).await?.pop())
    }
}
