//! Version comparison and breaking-change classification.
//!
//! Removing or altering a function or event breaks existing callers and
//! indexers. Additions, and changes to errors, constructors, receive and
//! fallback handlers, never do.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::canonical::{diff, AbiDiff};
use crate::item::{AbiItem, ItemKind, Parameter};
use crate::version::BumpKind;

/// How a member changed between two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeType::Added => "added",
            ChangeType::Removed => "removed",
            ChangeType::Modified => "modified",
        };
        f.write_str(label)
    }
}

/// One changed member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difference {
    #[serde(rename = "type")]
    pub change: ChangeType,
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Signature key of the member.
    pub key: String,
    pub detail: String,
}

impl Difference {
    /// Whether this change alone breaks existing integrations.
    pub fn is_breaking(&self) -> bool {
        matches!(self.change, ChangeType::Removed | ChangeType::Modified)
            && matches!(self.kind, ItemKind::Function | ItemKind::Event)
    }
}

/// Counts per change type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

/// Result of comparing two ABI versions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionComparison {
    pub differences: Vec<Difference>,
    pub breaking: bool,
}

impl VersionComparison {
    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }

    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for d in &self.differences {
            match d.change {
                ChangeType::Added => summary.added += 1,
                ChangeType::Removed => summary.removed += 1,
                ChangeType::Modified => summary.modified += 1,
            }
        }
        summary
    }

    /// Smallest version bump that describes this change set.
    pub fn suggested_bump(&self) -> Option<BumpKind> {
        if self.breaking {
            Some(BumpKind::Major)
        } else if self.differences.iter().any(|d| d.change == ChangeType::Added) {
            Some(BumpKind::Minor)
        } else if self.differences.is_empty() {
            None
        } else {
            Some(BumpKind::Patch)
        }
    }

    /// Render the comparison as a human-readable changelog.
    pub fn changelog(&self) -> String {
        if self.differences.is_empty() {
            return "No interface changes.\n".to_string();
        }

        let mut out = String::new();
        if self.breaking {
            out.push_str("BREAKING CHANGES\n");
        }
        for change in [ChangeType::Added, ChangeType::Removed, ChangeType::Modified] {
            let entries: Vec<&Difference> = self
                .differences
                .iter()
                .filter(|d| d.change == change)
                .collect();
            if entries.is_empty() {
                continue;
            }
            let heading = match change {
                ChangeType::Added => "Added",
                ChangeType::Removed => "Removed",
                ChangeType::Modified => "Modified",
            };
            out.push_str(&format!("\n{heading}:\n"));
            for d in entries {
                let marker = if d.is_breaking() { "!" } else { "-" };
                out.push_str(&format!("  {marker} {}\n", d.detail));
            }
        }
        out
    }
}

fn signature(item: &AbiItem) -> String {
    let inputs: Vec<String> = item.inputs.iter().map(render_param).collect();
    let head = match item.kind {
        ItemKind::Function | ItemKind::Event | ItemKind::Error => {
            format!("{} {}", item.kind, item.name_or_empty())
        }
        ItemKind::Constructor | ItemKind::Receive | ItemKind::Fallback => item.kind.to_string(),
    };
    let mut out = format!("{head}({})", inputs.join(", "));
    if !item.outputs.is_empty() {
        let outputs: Vec<String> = item.outputs.iter().map(render_param).collect();
        out.push_str(&format!(" returns ({})", outputs.join(", ")));
    }
    if let Some(mutability) = item.state_mutability {
        out.push_str(&format!(" {mutability}"));
    }
    out
}

fn render_param(param: &Parameter) -> String {
    let ty = if param.components.is_empty() {
        param.ty.clone()
    } else {
        let inner: Vec<String> = param.components.iter().map(render_param).collect();
        format!("({}){}", inner.join(", "), param.ty.trim_start_matches("tuple"))
    };
    let indexed = if param.indexed == Some(true) { " indexed" } else { "" };
    if param.name.is_empty() {
        format!("{ty}{indexed}")
    } else {
        format!("{ty}{indexed} {}", param.name)
    }
}

fn difference(change: ChangeType, key: &str, item: &AbiItem, detail: String) -> Difference {
    Difference {
        change,
        kind: item.kind,
        name: item.name.clone(),
        key: key.to_string(),
        detail,
    }
}

/// Flatten a structural diff into classified differences.
pub fn classify(abi_diff: &AbiDiff) -> VersionComparison {
    let mut differences = Vec::new();

    for added in &abi_diff.added {
        differences.push(difference(
            ChangeType::Added,
            &added.key,
            &added.item,
            format!("added {}", signature(&added.item)),
        ));
    }
    for removed in &abi_diff.removed {
        differences.push(difference(
            ChangeType::Removed,
            &removed.key,
            &removed.item,
            format!("removed {}", signature(&removed.item)),
        ));
    }
    for modified in &abi_diff.modified {
        differences.push(difference(
            ChangeType::Modified,
            &modified.key,
            &modified.new,
            format!(
                "changed {} -> {}",
                signature(&modified.old),
                signature(&modified.new)
            ),
        ));
    }

    let breaking = differences.iter().any(Difference::is_breaking);
    VersionComparison {
        differences,
        breaking,
    }
}

/// Compare two ABI versions.
pub fn compare_versions(old: &[AbiItem], new: &[AbiItem]) -> VersionComparison {
    classify(&diff(old, new))
}
