//! Runtime settings for the registry use cases.

use abireg_core::{BumpKind, ValidationRules};
use serde::{Deserialize, Serialize};

/// Settings consumed by [`crate::AbiRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Bump applied on update when the caller asks for none.
    pub default_bump: BumpKind,
    /// Derive the bump from the diff (breaking → major, additions → minor)
    /// instead of using `default_bump`.
    pub bump_from_diff: bool,
    /// Attempts at the read-recompute-write cycle when a version number is
    /// taken concurrently.
    pub max_version_retries: u32,
    pub validation: ValidationRules,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        RegistrySettings {
            default_bump: BumpKind::Patch,
            bump_from_diff: false,
            max_version_retries: 3,
            validation: ValidationRules::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = RegistrySettings::default();
        assert_eq!(settings.default_bump, BumpKind::Patch);
        assert!(!settings.bump_from_diff);
        assert_eq!(settings.max_version_retries, 3);
        assert!(settings.validation.require_parameter_names);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: RegistrySettings =
            serde_json::from_str(r#"{"default_bump": "minor"}"#).unwrap();
        assert_eq!(settings.default_bump, BumpKind::Minor);
        assert_eq!(settings.max_version_retries, 3);
    }
}
