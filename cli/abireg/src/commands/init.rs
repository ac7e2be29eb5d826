//! `abireg init`: write a configuration template.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::config::{AbiregConfig, CONFIG_FILE};

/// Create `abireg.toml` in `dir`.
pub fn run(dir: &Path) -> Result<()> {
    let path = dir.join(CONFIG_FILE);
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    fs::write(&path, AbiregConfig::template())
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path()).unwrap();

        let (config, found) = AbiregConfig::find_and_load(dir.path()).unwrap().unwrap();
        assert_eq!(found, dir.path());
        assert!(config.validation.require_parameter_names);
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path()).unwrap();
        let err = run(dir.path()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
