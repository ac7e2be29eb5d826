//! `abireg.toml` configuration.

use std::path::{Path, PathBuf};

use abireg_core::{BumpKind, ValidationRules};
use abireg_registry::RegistrySettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// File name searched for from the working directory upward.
pub const CONFIG_FILE: &str = "abireg.toml";

/// The top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AbiregConfig {
    pub registry: RegistryConfig,
    pub validation: ValidationRules,
    pub logging: LoggingConfig,
}

/// Registry section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Repository directory, relative to the config file.
    pub root: PathBuf,
    /// Backup directory, relative to the config file. No backups when unset.
    pub backup_dir: Option<PathBuf>,
    pub default_bump: BumpKind,
    pub bump_from_diff: bool,
    pub max_version_retries: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let settings = RegistrySettings::default();
        RegistryConfig {
            root: PathBuf::from(".abireg"),
            backup_dir: None,
            default_bump: settings.default_bump,
            bump_from_diff: settings.bump_from_diff,
            max_version_retries: settings.max_version_retries,
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "warn".to_string(),
        }
    }
}

impl AbiregConfig {
    /// Search upward from `start_dir` for `abireg.toml`, parse it and return
    /// it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let config = Self::parse(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((config, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Settings for the registry service.
    pub fn settings(&self) -> RegistrySettings {
        RegistrySettings {
            default_bump: self.registry.default_bump,
            bump_from_diff: self.registry.bump_from_diff,
            max_version_retries: self.registry.max_version_retries,
            validation: self.validation,
        }
    }

    /// Repository directory resolved against `base`.
    pub fn registry_root(&self, base: &Path) -> PathBuf {
        base.join(&self.registry.root)
    }

    /// Backup directory resolved against `base`.
    pub fn backup_dir(&self, base: &Path) -> Option<PathBuf> {
        self.registry.backup_dir.as_ref().map(|dir| base.join(dir))
    }

    /// Generate the default template for `abireg init`.
    pub fn template() -> String {
        r#"[registry]
root = ".abireg"
backup_dir = ".abireg/backups"
default_bump = "patch"
bump_from_diff = false
max_version_retries = 3

[validation]
require_parameter_names = true

[logging]
level = "warn"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config = AbiregConfig::parse(
            r#"
[registry]
root = "/var/lib/abireg"
backup_dir = "backups"
default_bump = "minor"
bump_from_diff = true
max_version_retries = 5

[validation]
require_parameter_names = false

[logging]
level = "abireg_registry=debug"
"#,
        )
        .unwrap();

        let settings = config.settings();
        assert_eq!(settings.default_bump, BumpKind::Minor);
        assert!(settings.bump_from_diff);
        assert_eq!(settings.max_version_retries, 5);
        assert!(!settings.validation.require_parameter_names);
        assert_eq!(config.logging.level, "abireg_registry=debug");

        let base = Path::new("/srv/project");
        // Absolute roots win over the base directory.
        assert_eq!(config.registry_root(base), PathBuf::from("/var/lib/abireg"));
        assert_eq!(
            config.backup_dir(base),
            Some(PathBuf::from("/srv/project/backups"))
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = AbiregConfig::parse("").unwrap();
        assert_eq!(config.registry.root, PathBuf::from(".abireg"));
        assert!(config.backup_dir(Path::new("/x")).is_none());
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.settings(), RegistrySettings::default());
    }

    #[test]
    fn template_parses() {
        let config = AbiregConfig::parse(&AbiregConfig::template()).unwrap();
        assert_eq!(config.registry.default_bump, BumpKind::Patch);
        assert_eq!(
            config.registry.backup_dir,
            Some(PathBuf::from(".abireg/backups"))
        );
    }

    #[test]
    fn find_and_load_searches_upward() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), AbiregConfig::template()).unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let (_, found) = AbiregConfig::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(found, dir.path());
    }

    #[test]
    fn invalid_config_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[registry]\ndefault_bump = 7\n").unwrap();
        let err = AbiregConfig::find_and_load(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains(CONFIG_FILE));
    }
}
