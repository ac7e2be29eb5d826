//! Off-box backup of canonical ABIs.
//!
//! A backup store is content addressed: the key is the ABI hash and the
//! payload is the canonical JSON, so writing the same ABI twice is a no-op.

use std::path::{Path, PathBuf};

use abireg_core::ContentHash;
use async_trait::async_trait;
use tokio::fs;

use crate::error::{RegistryError, Result};

/// Content-addressed object store for canonical ABIs.
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// Store `canonical_json` under `hash` and return a pointer to it.
    async fn put(&self, hash: &ContentHash, canonical_json: &str) -> Result<String>;
}

/// Pointer scheme used by [`LocalBackupStore`].
pub const LOCAL_SCHEME: &str = "local://";

/// Backup store writing `<root>/<hash>.json`.
pub struct LocalBackupStore {
    root: PathBuf,
}

impl LocalBackupStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalBackupStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a `local://<hash>` pointer to its file path.
    pub fn resolve(&self, pointer: &str) -> Option<PathBuf> {
        let hash = ContentHash::parse(pointer.strip_prefix(LOCAL_SCHEME)?)?;
        Some(self.root.join(format!("{hash}.json")))
    }
}

#[async_trait]
impl BackupStore for LocalBackupStore {
    async fn put(&self, hash: &ContentHash, canonical_json: &str) -> Result<String> {
        if ContentHash::compute(canonical_json.as_bytes()) != *hash {
            return Err(RegistryError::Backup {
                detail: format!("payload does not match hash {hash}"),
            });
        }
        fs::create_dir_all(&self.root).await?;
        let path = self.root.join(format!("{hash}.json"));
        if !fs::try_exists(&path).await? {
            fs::write(&path, canonical_json).await?;
        }
        Ok(format!("{LOCAL_SCHEME}{hash}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abireg_core::{normalize, AbiItem};

    #[tokio::test]
    async fn put_writes_content_addressed_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBackupStore::new(dir.path().join("backups"));
        let canonical = normalize(&[AbiItem::function("ping", vec![])]);
        let hash = ContentHash::of_canonical(&canonical);

        let pointer = store.put(&hash, &canonical.to_json()).await.unwrap();
        assert_eq!(pointer, format!("local://{hash}"));

        let path = store.resolve(&pointer).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), canonical.to_json());

        // Idempotent.
        assert_eq!(store.put(&hash, &canonical.to_json()).await.unwrap(), pointer);
    }

    #[tokio::test]
    async fn mismatched_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBackupStore::new(dir.path());
        let hash = ContentHash::compute(b"[]");
        let err = store.put(&hash, "[{}]").await.unwrap_err();
        assert!(matches!(err, RegistryError::Backup { .. }));
    }

    #[test]
    fn resolve_rejects_foreign_pointers() {
        let store = LocalBackupStore::new("/tmp/backups");
        assert!(store.resolve("ipfs://Qm123").is_none());
        assert!(store.resolve("local://nothex").is_none());
    }
}
