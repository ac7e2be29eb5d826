//! `abireg validate`: structural and business-rule checks.

use std::path::Path;

use abireg_core::{abi_section, detect, AbiValidator, Standard, ValidationRules};
use anyhow::{anyhow, Result};

use super::{invalid, read_document};

/// Validate the ABI in `path`, optionally against a claimed standard, and
/// describe it.
pub fn check(path: &Path, standard: Option<&str>, rules: ValidationRules) -> Result<String> {
    let standard = standard
        .map(|label| label.parse::<Standard>().map_err(|e| anyhow!(e)))
        .transpose()?;

    let validator = AbiValidator::new(rules);
    let document = read_document(path)?;
    let items = validator
        .validate_business_rules(abi_section(&document))
        .map_err(|errors| invalid(path, &errors))?;
    if let Some(standard) = standard {
        validator
            .validate_standard(&items, standard)
            .map_err(|errors| invalid(path, &errors))?;
    }

    let detected = detect(&items).map_or_else(|| "none".to_string(), |s| s.to_string());
    Ok(format!(
        "{}: valid ({} items, standard: {detected})",
        path.display(),
        items.len()
    ))
}

pub fn run(path: &Path, standard: Option<&str>, rules: ValidationRules) -> Result<()> {
    println!("{}", check(path, standard, rules)?);
    Ok(())
}
