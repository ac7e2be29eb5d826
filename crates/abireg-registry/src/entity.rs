//! Registry records: ABI entities and their immutable version snapshots.

use abireg_core::{AbiItem, ContentHash, Standard};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered contract interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiEntity {
    pub id: Uuid,
    /// Principal that registered the ABI.
    pub owner_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Item list as submitted for the current version.
    pub abi: Vec<AbiItem>,
    pub abi_hash: ContentHash,
    /// Pointer into the backup store, when a backup was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_pointer: Option<String>,
    pub version: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard: Option<Standard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AbiEntity {
    /// Whether normal (non-owner) access may see this entity.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Whether `principal` registered this entity.
    pub fn is_owned_by(&self, principal: &str) -> bool {
        self.owner_id == principal
    }
}

/// An immutable snapshot of an entity's item list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiVersion {
    pub id: Uuid,
    pub abi_id: Uuid,
    pub version: String,
    /// Per-entity sequence number: 1, 2, 3, ...
    pub version_number: u64,
    pub abi: Vec<AbiItem>,
    pub abi_hash: ContentHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
    #[serde(default)]
    pub breaking: bool,
    #[serde(default)]
    pub deprecated: bool,
    pub created_at: DateTime<Utc>,
}

/// Partial update of an entity. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbiPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub abi: Option<Vec<AbiItem>>,
    pub abi_hash: Option<ContentHash>,
    pub backup_pointer: Option<String>,
    pub version: Option<String>,
    pub tags: Option<Vec<String>>,
    /// `Some(None)` clears the standard label.
    pub standard: Option<Option<Standard>>,
    pub network: Option<String>,
    pub is_deleted: Option<bool>,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Precondition checked by the repository, never applied: the entity's
    /// latest version record must carry this number.
    pub expected_latest: Option<u64>,
}

impl AbiPatch {
    pub fn is_empty(&self) -> bool {
        *self == AbiPatch::default()
    }

    /// Apply the patch in place and stamp `updated_at`.
    pub fn apply(self, entity: &mut AbiEntity, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            entity.name = name;
        }
        if let Some(description) = self.description {
            entity.description = Some(description);
        }
        if let Some(abi) = self.abi {
            entity.abi = abi;
        }
        if let Some(hash) = self.abi_hash {
            entity.abi_hash = hash;
        }
        if let Some(pointer) = self.backup_pointer {
            entity.backup_pointer = Some(pointer);
        }
        if let Some(version) = self.version {
            entity.version = version;
        }
        if let Some(tags) = self.tags {
            entity.tags = tags;
        }
        if let Some(standard) = self.standard {
            entity.standard = standard;
        }
        if let Some(network) = self.network {
            entity.network = Some(network);
        }
        if let Some(deleted) = self.is_deleted {
            entity.is_deleted = deleted;
        }
        if let Some(at) = self.deleted_at {
            entity.deleted_at = Some(at);
        }
        entity.updated_at = now;
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use abireg_core::Parameter;

    pub fn transfer() -> AbiItem {
        AbiItem::function(
            "transfer",
            vec![Parameter::new("to", "address"), Parameter::new("value", "uint256")],
        )
        .with_outputs(vec![Parameter::new("ok", "bool")])
    }

    pub fn entity(abi: Vec<AbiItem>) -> AbiEntity {
        let now = Utc::now();
        AbiEntity {
            id: Uuid::new_v4(),
            owner_id: "alice".into(),
            name: "Token".into(),
            description: None,
            abi_hash: ContentHash::of_items(&abi),
            abi,
            backup_pointer: None,
            version: "1.0.0".into(),
            tags: Vec::new(),
            standard: None,
            network: None,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A fresh entity paired with its first version record.
    pub fn registered(abi: Vec<AbiItem>) -> (AbiEntity, AbiVersion) {
        let e = entity(abi);
        let first = version_of(&e, 1);
        (e, first)
    }

    pub fn version_of(entity: &AbiEntity, number: u64) -> AbiVersion {
        AbiVersion {
            id: Uuid::new_v4(),
            abi_id: entity.id,
            version: entity.version.clone(),
            version_number: number,
            abi: entity.abi.clone(),
            abi_hash: entity.abi_hash.clone(),
            changelog: None,
            breaking: false,
            deprecated: false,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn patch_applies_only_set_fields() {
        let mut e = entity(vec![transfer()]);
        let before = e.clone();
        let later = before.updated_at + chrono::Duration::seconds(5);

        AbiPatch {
            description: Some("fungible".into()),
            tags: Some(vec!["erc20".into()]),
            ..Default::default()
        }
        .apply(&mut e, later);

        assert_eq!(e.description.as_deref(), Some("fungible"));
        assert_eq!(e.tags, vec!["erc20".to_string()]);
        assert_eq!(e.name, before.name);
        assert_eq!(e.abi_hash, before.abi_hash);
        assert_eq!(e.updated_at, later);
        assert_eq!(e.created_at, before.created_at);
    }

    #[test]
    fn empty_patch() {
        assert!(AbiPatch::default().is_empty());
        let patch = AbiPatch {
            is_deleted: Some(true),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn expected_latest_is_not_applied() {
        let mut e = entity(vec![transfer()]);
        let before = e.clone();
        AbiPatch {
            expected_latest: Some(7),
            ..Default::default()
        }
        .apply(&mut e, before.updated_at);
        assert_eq!(e, before);
    }

    #[test]
    fn entity_json_uses_camel_case() {
        let e = entity(vec![transfer()]);
        let json = serde_json::to_value(&e).unwrap();
        assert!(json.get("abiHash").is_some());
        assert!(json.get("ownerId").is_some());
        assert_eq!(json["isDeleted"], false);
        let back: AbiEntity = serde_json::from_value(json).unwrap();
        assert_eq!(back, e);
        assert!(back.is_active());
        assert!(back.is_owned_by("alice"));
    }
}
