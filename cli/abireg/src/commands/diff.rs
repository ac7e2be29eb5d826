//! `abireg diff`: compare two ABI files.

use std::path::Path;

use abireg_core::{compare_versions, VersionComparison};
use anyhow::{Context, Result};

use super::read_items;

pub fn comparison(old: &Path, new: &Path) -> Result<VersionComparison> {
    Ok(compare_versions(&read_items(old)?, &read_items(new)?))
}

/// Render a comparison as text: the changelog plus the suggested bump.
pub fn format_text(comparison: &VersionComparison) -> String {
    let mut out = comparison.changelog();
    if let Some(bump) = comparison.suggested_bump() {
        let summary = comparison.summary();
        out.push_str(&format!(
            "\n{} added, {} removed, {} modified; suggested bump: {bump}\n",
            summary.added, summary.removed, summary.modified
        ));
    }
    out
}

pub fn run(old: &Path, new: &Path, json: bool) -> Result<()> {
    let comparison = comparison(old, new)?;
    if json {
        let rendered =
            serde_json::to_string_pretty(&comparison).context("serializing comparison")?;
        println!("{rendered}");
    } else {
        print!("{}", format_text(&comparison));
    }
    Ok(())
}
