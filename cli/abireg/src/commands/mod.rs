//! CLI command implementations.

pub mod diff;
pub mod init;
pub mod inspect;
pub mod registry;
pub mod validate;

use std::path::Path;

use abireg_core::{abi_section, AbiItem, AbiValidator, ValidationErrors};
use anyhow::{anyhow, Context, Result};
use serde_json::Value;

/// Read a JSON document: a bare item array or an artifact with an `abi` field.
pub(crate) fn read_document(path: &Path) -> Result<Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Read a document and check its structure.
pub(crate) fn read_items(path: &Path) -> Result<Vec<AbiItem>> {
    let document = read_document(path)?;
    AbiValidator::default()
        .validate_structure(abi_section(&document))
        .map_err(|errors| invalid(path, &errors))
}

/// Turn validation findings into an error listing every one of them.
pub(crate) fn invalid(path: &Path, errors: &ValidationErrors) -> anyhow::Error {
    anyhow!("{}: {errors}\n{}", path.display(), format_errors(errors))
}

pub(crate) fn format_errors(errors: &ValidationErrors) -> String {
    errors
        .errors()
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::{Path, PathBuf};

    use serde_json::{json, Value};

    pub fn transfer(output: &str) -> Value {
        json!([{
            "type": "function",
            "name": "transfer",
            "inputs": [
                {"name": "to", "type": "address"},
                {"name": "value", "type": "uint256"}
            ],
            "outputs": [{"name": "ok", "type": output}],
            "stateMutability": "nonpayable"
        }])
    }

    pub fn write(dir: &Path, name: &str, value: &Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path
    }
}
