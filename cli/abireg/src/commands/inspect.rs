//! Offline inspection: `abireg hash`, `abireg normalize`, `abireg detect`.

use std::path::Path;

use abireg_core::{detect, hash, normalize};
use anyhow::{Context, Result};

use super::read_items;

/// Content hash of the ABI in `path`, optionally shortened.
pub fn hash_line(path: &Path, short: Option<usize>) -> Result<String> {
    let items = read_items(path)?;
    let hash = hash(&items);
    Ok(match short {
        Some(n) => hash.short(n).to_string(),
        None => hash.to_string(),
    })
}

/// Canonical JSON of the ABI in `path`.
pub fn canonical_json(path: &Path, pretty: bool) -> Result<String> {
    let canonical = normalize(&read_items(path)?);
    if pretty {
        serde_json::to_string_pretty(&canonical).context("serializing canonical ABI")
    } else {
        Ok(canonical.to_json())
    }
}

/// Standard label of the ABI in `path`, or `none`.
pub fn standard_label(path: &Path) -> Result<String> {
    let items = read_items(path)?;
    Ok(detect(&items).map_or_else(|| "none".to_string(), |s| s.to_string()))
}

pub fn hash_cmd(path: &Path, short: Option<usize>) -> Result<()> {
    println!("{}", hash_line(path, short)?);
    Ok(())
}

pub fn normalize_cmd(path: &Path, pretty: bool) -> Result<()> {
    println!("{}", canonical_json(path, pretty)?);
    Ok(())
}

pub fn detect_cmd(path: &Path) -> Result<()> {
    println!("{}", standard_label(path)?);
    Ok(())
}
