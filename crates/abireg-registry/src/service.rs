//! Registry use cases: create, update, delete and version history.
//!
//! An update that changes the content hash mints a new version record.
//! Deriving the next `version_number` is a read-modify-write over the
//! repository; the repository rejects a taken number and the update retries
//! the whole read-recompute-write cycle. The entity only advances to a
//! minted record while that record is still the latest.

use std::cmp::Ordering;
use std::sync::Arc;

use abireg_core::version::{next_version, next_version_number, NextVersionOptions};
use abireg_core::{
    abi_section, compare_versions, detect, normalize, AbiItem, AbiValidator, BumpKind,
    CanonicalAbi, ContentHash, Standard, VersionComparison,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::backup::BackupStore;
use crate::config::RegistrySettings;
use crate::entity::{AbiEntity, AbiPatch, AbiVersion};
use crate::error::{RegistryError, Result};
use crate::repository::AbiRepository;

/// Request to register a new ABI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAbi {
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Item array, or an artifact object with an `abi` field.
    pub abi: Value,
    /// Explicit initial version; `1.0.0` when absent.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Claimed standard, checked against the items. Detected when absent.
    #[serde(default)]
    pub standard: Option<Standard>,
    #[serde(default)]
    pub network: Option<String>,
}

/// Request to change an entity. Absent fields stay as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAbi {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub abi: Option<Value>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub standard: Option<Standard>,
    #[serde(default)]
    pub network: Option<String>,
    /// Explicit version for the new record; must be newer than the latest.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub bump: Option<BumpKind>,
    /// Changelog for the new record; generated from the diff when absent.
    #[serde(default)]
    pub changelog: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
}

/// Result of an update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub entity: AbiEntity,
    /// New version record, when the content hash changed.
    pub version: Option<AbiVersion>,
    /// Diff against the previous version, when the content hash changed.
    pub comparison: Option<VersionComparison>,
}

/// ABI registry over a repository and an optional backup store.
pub struct AbiRegistry<R> {
    repository: R,
    backup: Option<Arc<dyn BackupStore>>,
    settings: RegistrySettings,
    validator: AbiValidator,
}

impl<R: AbiRepository> AbiRegistry<R> {
    pub fn new(repository: R, settings: RegistrySettings) -> Self {
        let validator = AbiValidator::new(settings.validation);
        AbiRegistry {
            repository,
            backup: None,
            settings,
            validator,
        }
    }

    /// Back up every newly registered ABI to `store`.
    pub fn with_backup(mut self, store: Arc<dyn BackupStore>) -> Self {
        self.backup = Some(store);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Validate, deduplicate and persist a new ABI with its first version
    /// record.
    #[instrument(skip(self, request), fields(name = %request.name, owner = %request.owner_id))]
    pub async fn create(&self, request: CreateAbi) -> Result<AbiEntity> {
        let items = self
            .validator
            .validate_business_rules(abi_section(&request.abi))?;
        let canonical = normalize(&items);
        let hash = ContentHash::of_canonical(&canonical);
        debug!(%hash, items = items.len(), "computed content hash");

        if let Some(existing) = self.repository.find_by_hash(&hash).await? {
            return Err(RegistryError::DuplicateAbi {
                hash,
                existing_id: existing.id,
            });
        }

        let standard = self.resolve_standard(&items, request.standard)?;
        let backup_pointer = self.backup(&hash, &canonical).await;
        let version = next_version(&NextVersionOptions {
            explicit: request.version.as_deref(),
            is_new: true,
            ..Default::default()
        })?;

        let now = Utc::now();
        let entity = AbiEntity {
            id: Uuid::new_v4(),
            owner_id: request.owner_id,
            name: request.name,
            description: request.description,
            abi: items,
            abi_hash: hash,
            backup_pointer,
            version,
            tags: request.tags,
            standard,
            network: request.network,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        let initial = AbiVersion {
            id: Uuid::new_v4(),
            abi_id: entity.id,
            version: entity.version.clone(),
            version_number: next_version_number(None),
            abi: entity.abi.clone(),
            abi_hash: entity.abi_hash.clone(),
            changelog: None,
            breaking: false,
            deprecated: false,
            created_at: now,
        };
        let entity = self.repository.create(entity, initial).await?;

        info!(
            abi_id = %entity.id,
            hash = %entity.abi_hash,
            version = %entity.version,
            standard = ?entity.standard,
            "registered ABI"
        );
        Ok(entity)
    }

    /// Update metadata and, when the content hash changes, mint a new
    /// version record.
    #[instrument(skip(self, request), fields(abi_id = %id))]
    pub async fn update(&self, id: Uuid, request: UpdateAbi) -> Result<UpdateOutcome> {
        let current = self.get(id).await?;
        let mut patch = AbiPatch {
            name: request.name.clone(),
            description: request.description.clone(),
            tags: request.tags.clone(),
            network: request.network.clone(),
            ..Default::default()
        };

        let Some(raw) = &request.abi else {
            if let Some(standard) = request.standard {
                self.validator.validate_standard(&current.abi, standard)?;
                patch.standard = Some(Some(standard));
            }
            return self.update_metadata(id, patch).await;
        };

        let items = self.validator.validate_business_rules(abi_section(raw))?;
        let canonical = normalize(&items);
        let hash = ContentHash::of_canonical(&canonical);
        if hash == current.abi_hash {
            debug!(%hash, "content hash unchanged, updating metadata only");
            if let Some(standard) = request.standard {
                self.validator.validate_standard(&items, standard)?;
                patch.standard = Some(Some(standard));
            }
            return self.update_metadata(id, patch).await;
        }

        if let Some(other) = self.repository.find_by_hash(&hash).await? {
            return Err(RegistryError::DuplicateAbi {
                hash,
                existing_id: other.id,
            });
        }

        let standard = self.resolve_standard(&items, request.standard)?;
        let backup_pointer = self.backup(&hash, &canonical).await;
        let (record, comparison) = self
            .mint_version(&current, &items, &hash, &request)
            .await?;

        patch.abi = Some(items);
        patch.abi_hash = Some(hash);
        patch.version = Some(record.version.clone());
        patch.standard = Some(standard);
        patch.backup_pointer = backup_pointer;
        patch.expected_latest = Some(record.version_number);

        let entity = self
            .repository
            .update(id, patch)
            .await?
            .ok_or(RegistryError::NotFound { id })?;

        info!(
            abi_id = %entity.id,
            version = %record.version,
            version_number = record.version_number,
            breaking = record.breaking,
            "minted new ABI version"
        );
        Ok(UpdateOutcome {
            entity,
            version: Some(record),
            comparison: Some(comparison),
        })
    }

    /// Read the latest version, derive the next one and persist it, retrying
    /// when another writer takes the number first.
    async fn mint_version(
        &self,
        current: &AbiEntity,
        items: &[AbiItem],
        hash: &ContentHash,
        request: &UpdateAbi,
    ) -> Result<(AbiVersion, VersionComparison)> {
        let mut retries = 0;
        loop {
            let latest = self.repository.latest_version(current.id).await?;
            let previous = latest.as_ref().map_or(current.abi.as_slice(), |v| v.abi.as_slice());
            let comparison = compare_versions(previous, items);

            let bump = self.bump_for(request.bump, &comparison);
            let latest_version = latest.as_ref().map(|v| v.version.as_str());
            let version = next_version(&NextVersionOptions {
                explicit: request.version.as_deref(),
                is_new: false,
                latest: latest_version,
                bump: Some(bump),
            })?;
            if let (Some(_), Some(latest)) = (&request.version, latest_version) {
                if abireg_core::version::compare(&version, latest)? != Ordering::Greater {
                    return Err(RegistryError::VersionNotNewer {
                        version,
                        latest: latest.to_string(),
                    });
                }
            }

            let number = next_version_number(latest.as_ref().map(|v| v.version_number));
            debug!(%version, number, %bump, "derived next version");

            let record = AbiVersion {
                id: Uuid::new_v4(),
                abi_id: current.id,
                version,
                version_number: number,
                abi: items.to_vec(),
                abi_hash: hash.clone(),
                changelog: Some(
                    request
                        .changelog
                        .clone()
                        .unwrap_or_else(|| comparison.changelog()),
                ),
                breaking: comparison.breaking,
                deprecated: request.deprecated,
                created_at: Utc::now(),
            };

            match self.repository.create_version(record).await {
                Ok(record) => return Ok((record, comparison)),
                Err(RegistryError::VersionConflict { number, .. })
                    if retries < self.settings.max_version_retries =>
                {
                    retries += 1;
                    warn!(number, retries, "version number taken concurrently, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn update_metadata(&self, id: Uuid, patch: AbiPatch) -> Result<UpdateOutcome> {
        let entity = self
            .repository
            .update(id, patch)
            .await?
            .ok_or(RegistryError::NotFound { id })?;
        info!(abi_id = %id, "updated ABI metadata");
        Ok(UpdateOutcome {
            entity,
            version: None,
            comparison: None,
        })
    }

    /// Flag an entity as deleted. Its records stay in the repository.
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, id: Uuid) -> Result<AbiEntity> {
        self.get(id).await?;
        let patch = AbiPatch {
            is_deleted: Some(true),
            deleted_at: Some(Utc::now()),
            ..Default::default()
        };
        let entity = self
            .repository
            .update(id, patch)
            .await?
            .ok_or(RegistryError::NotFound { id })?;
        info!(abi_id = %id, "soft-deleted ABI");
        Ok(entity)
    }

    /// Active entity by id.
    pub async fn get(&self, id: Uuid) -> Result<AbiEntity> {
        self.repository
            .find_by_id(id)
            .await?
            .filter(AbiEntity::is_active)
            .ok_or(RegistryError::NotFound { id })
    }

    /// Entity by id as seen by `owner`, including when soft-deleted.
    pub async fn get_for_owner(&self, id: Uuid, owner: &str) -> Result<AbiEntity> {
        self.repository
            .find_by_id(id)
            .await?
            .filter(|entity| entity.is_owned_by(owner))
            .ok_or(RegistryError::NotFound { id })
    }

    pub async fn list_versions(&self, id: Uuid) -> Result<Vec<AbiVersion>> {
        self.get(id).await?;
        self.repository.list_versions(id).await
    }

    pub async fn get_version(&self, id: Uuid, number: u64) -> Result<AbiVersion> {
        self.get(id).await?;
        self.repository
            .find_version_by_number(id, number)
            .await?
            .ok_or(RegistryError::VersionNotFound { id, number })
    }

    /// Diff two recorded versions of an entity.
    pub async fn compare(&self, id: Uuid, from: u64, to: u64) -> Result<VersionComparison> {
        let old = self.get_version(id, from).await?;
        let new = self.get_version(id, to).await?;
        Ok(compare_versions(&old.abi, &new.abi))
    }

    fn resolve_standard(
        &self,
        items: &[AbiItem],
        claimed: Option<Standard>,
    ) -> Result<Option<Standard>> {
        match claimed {
            Some(standard) => {
                self.validator.validate_standard(items, standard)?;
                Ok(Some(standard))
            }
            None => Ok(detect(items)),
        }
    }

    fn bump_for(&self, requested: Option<BumpKind>, comparison: &VersionComparison) -> BumpKind {
        requested
            .or_else(|| {
                self.settings
                    .bump_from_diff
                    .then(|| comparison.suggested_bump())
                    .flatten()
            })
            .unwrap_or(self.settings.default_bump)
    }

    /// Best effort: a failed backup is logged and leaves the pointer unset.
    async fn backup(&self, hash: &ContentHash, canonical: &CanonicalAbi) -> Option<String> {
        let store = self.backup.as_ref()?;
        match store.put(hash, &canonical.to_json()).await {
            Ok(pointer) => {
                debug!(%hash, %pointer, "backed up canonical ABI");
                Some(pointer)
            }
            Err(e) => {
                warn!(%hash, error = %e, "backup failed, continuing without pointer");
                None
            }
        }
    }
}
