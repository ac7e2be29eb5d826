//! Registry commands: create, update, show, versions, delete, compare.
//!
//! All of them run against a [`LocalRepository`] under the configured root.

use std::path::Path;
use std::sync::Arc;

use abireg_core::{BumpKind, Standard};
use abireg_registry::{
    AbiEntity, AbiRegistry, AbiVersion, CreateAbi, LocalBackupStore, LocalRepository,
    UpdateAbi, UpdateOutcome,
};
use anyhow::{anyhow, Context, Result};
use tracing::debug;
use uuid::Uuid;

use super::diff::format_text;
use super::read_document;
use crate::config::AbiregConfig;

/// Open the registry described by `config`, resolving paths against `base`.
pub fn open(config: &AbiregConfig, base: &Path) -> AbiRegistry<LocalRepository> {
    let root = config.registry_root(base);
    let backup = config.backup_dir(base);
    debug!(
        root = %root.display(),
        backup = ?backup,
        "opening local registry"
    );
    let registry = AbiRegistry::new(LocalRepository::new(root), config.settings());
    match backup {
        Some(dir) => registry.with_backup(Arc::new(LocalBackupStore::new(dir))),
        None => registry,
    }
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).with_context(|| format!("invalid ABI id '{id}'"))
}

fn parse_standard(label: Option<&str>) -> Result<Option<Standard>> {
    label
        .map(|l| l.parse::<Standard>().map_err(|e| anyhow!(e)))
        .transpose()
}

fn split_tags(tags: Option<&str>) -> Option<Vec<String>> {
    tags.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    })
}

/// Arguments of `abireg create`.
#[derive(Debug, Clone)]
pub struct CreateArgs<'a> {
    pub file: &'a Path,
    pub name: &'a str,
    pub owner: &'a str,
    pub description: Option<&'a str>,
    pub tags: Option<&'a str>,
    pub standard: Option<&'a str>,
    pub network: Option<&'a str>,
    pub version: Option<&'a str>,
}

impl<'a> CreateArgs<'a> {
    pub fn new(file: &'a Path, name: &'a str, owner: &'a str) -> Self {
        CreateArgs {
            file,
            name,
            owner,
            description: None,
            tags: None,
            standard: None,
            network: None,
            version: None,
        }
    }
}

/// Arguments of `abireg update`.
#[derive(Debug, Clone, Default)]
pub struct UpdateArgs<'a> {
    pub id: &'a str,
    pub file: Option<&'a Path>,
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub tags: Option<&'a str>,
    pub standard: Option<&'a str>,
    pub network: Option<&'a str>,
    pub version: Option<&'a str>,
    pub bump: Option<&'a str>,
    pub changelog: Option<&'a str>,
    pub deprecated: bool,
}

pub fn format_entity(entity: &AbiEntity) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", entity.id, entity.name));
    out.push_str(&format!("  version:  {}\n", entity.version));
    out.push_str(&format!("  hash:     {}\n", entity.abi_hash));
    out.push_str(&format!("  owner:    {}\n", entity.owner_id));
    out.push_str(&format!("  items:    {}\n", entity.abi.len()));
    if let Some(standard) = entity.standard {
        out.push_str(&format!("  standard: {standard}\n"));
    }
    if let Some(network) = &entity.network {
        out.push_str(&format!("  network:  {network}\n"));
    }
    if !entity.tags.is_empty() {
        out.push_str(&format!("  tags:     {}\n", entity.tags.join(", ")));
    }
    if let Some(pointer) = &entity.backup_pointer {
        out.push_str(&format!("  backup:   {pointer}\n"));
    }
    if let Some(description) = &entity.description {
        out.push_str(&format!("  {description}\n"));
    }
    out
}

pub fn format_versions(versions: &[AbiVersion]) -> String {
    let mut out = String::new();
    for v in versions {
        let mut flags = Vec::new();
        if v.breaking {
            flags.push("breaking");
        }
        if v.deprecated {
            flags.push("deprecated");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        out.push_str(&format!(
            "#{:<3} {:<10} {}  {}{flags}\n",
            v.version_number,
            v.version,
            v.abi_hash.short(12),
            v.created_at.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    out
}

pub fn format_outcome(outcome: &UpdateOutcome) -> String {
    match (&outcome.version, &outcome.comparison) {
        (Some(record), Some(comparison)) => format!(
            "Updated {} to {} (version #{})\n{}",
            outcome.entity.id,
            record.version,
            record.version_number,
            format_text(comparison)
        ),
        _ => format!(
            "Updated metadata of {} (version {} unchanged)\n",
            outcome.entity.id, outcome.entity.version
        ),
    }
}

pub async fn create(
    registry: &AbiRegistry<LocalRepository>,
    args: CreateArgs<'_>,
) -> Result<AbiEntity> {
    let request = CreateAbi {
        owner_id: args.owner.to_string(),
        name: args.name.to_string(),
        description: args.description.map(String::from),
        abi: read_document(args.file)?,
        version: args.version.map(String::from),
        tags: split_tags(args.tags).unwrap_or_default(),
        standard: parse_standard(args.standard)?,
        network: args.network.map(String::from),
    };
    let entity = registry
        .create(request)
        .await
        .with_context(|| format!("registering {}", args.file.display()))?;
    Ok(entity)
}

pub async fn update(
    registry: &AbiRegistry<LocalRepository>,
    args: UpdateArgs<'_>,
) -> Result<UpdateOutcome> {
    let id = parse_id(args.id)?;
    let abi = args.file.map(read_document).transpose()?;
    let bump = args
        .bump
        .map(str::parse::<BumpKind>)
        .transpose()
        .context("parsing --bump")?;
    let request = UpdateAbi {
        name: args.name.map(String::from),
        description: args.description.map(String::from),
        abi,
        tags: split_tags(args.tags),
        standard: parse_standard(args.standard)?,
        network: args.network.map(String::from),
        version: args.version.map(String::from),
        bump,
        changelog: args.changelog.map(String::from),
        deprecated: args.deprecated,
    };
    let outcome = registry
        .update(id, request)
        .await
        .with_context(|| format!("updating {id}"))?;
    Ok(outcome)
}

pub async fn show(registry: &AbiRegistry<LocalRepository>, id: &str, json: bool) -> Result<()> {
    let entity = registry.get(parse_id(id)?).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entity)?);
    } else {
        print!("{}", format_entity(&entity));
    }
    Ok(())
}

pub async fn versions(registry: &AbiRegistry<LocalRepository>, id: &str) -> Result<()> {
    let versions = registry.list_versions(parse_id(id)?).await?;
    print!("{}", format_versions(&versions));
    Ok(())
}

pub async fn delete(registry: &AbiRegistry<LocalRepository>, id: &str) -> Result<()> {
    let entity = registry.soft_delete(parse_id(id)?).await?;
    println!("Deleted {} ({})", entity.id, entity.name);
    Ok(())
}

pub async fn compare(
    registry: &AbiRegistry<LocalRepository>,
    id: &str,
    from: u64,
    to: u64,
    json: bool,
) -> Result<()> {
    let comparison = registry.compare(parse_id(id)?, from, to).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
    } else {
        print!("{}", format_text(&comparison));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::*;
    use abireg_registry::RegistryError;

    fn setup() -> (tempfile::TempDir, AbiRegistry<LocalRepository>) {
        let dir = tempfile::tempdir().unwrap();
        let config = AbiregConfig::parse(&AbiregConfig::template()).unwrap();
        let registry = open(&config, dir.path());
        (dir, registry)
    }

    #[tokio::test]
    async fn create_update_and_list() {
        let (dir, registry) = setup();
        let v1 = write(dir.path(), "v1.json", &transfer("bool"));
        let v2 = write(dir.path(), "v2.json", &transfer("uint256"));

        let entity = create(
            &registry,
            CreateArgs {
                tags: Some("defi, token,"),
                ..CreateArgs::new(&v1, "Token", "cli")
            },
        )
        .await
        .unwrap();
        assert_eq!(entity.tags, vec!["defi".to_string(), "token".to_string()]);
        assert!(entity
            .backup_pointer
            .as_deref()
            .is_some_and(|p| p.starts_with("local://")));
        assert!(format_entity(&entity).contains("version:  1.0.0"));

        let id = entity.id.to_string();
        let outcome = update(
            &registry,
            UpdateArgs {
                id: &id,
                file: Some(&v2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let text = format_outcome(&outcome);
        assert!(text.starts_with(&format!("Updated {id} to 1.0.1 (version #2)")));
        assert!(text.contains("BREAKING CHANGES"));

        let listed = format_versions(&registry.list_versions(entity.id).await.unwrap());
        let lines: Vec<&str> = listed.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("#1   1.0.0"));
        assert!(lines[1].starts_with("#2   1.0.1"));
        assert!(lines[1].ends_with("[breaking]"));
    }

    #[tokio::test]
    async fn metadata_update_keeps_version() {
        let (dir, registry) = setup();
        let v1 = write(dir.path(), "v1.json", &transfer("bool"));
        let entity = create(
            &registry,
            CreateArgs::new(&v1, "Token", "cli"),
        )
        .await
        .unwrap();

        let id = entity.id.to_string();
        let outcome = update(
            &registry,
            UpdateArgs {
                id: &id,
                name: Some("Renamed"),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(
            format_outcome(&outcome),
            format!("Updated metadata of {id} (version 1.0.0 unchanged)\n")
        );
    }

    #[tokio::test]
    async fn bad_arguments_are_reported() {
        let (dir, registry) = setup();
        let err = update(
            &registry,
            UpdateArgs {
                id: "not-a-uuid",
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("invalid ABI id"));

        let v1 = write(dir.path(), "v1.json", &transfer("bool"));
        let entity = create(
            &registry,
            CreateArgs::new(&v1, "Token", "cli"),
        )
        .await
        .unwrap();
        let id = entity.id.to_string();
        let err = update(
            &registry,
            UpdateArgs {
                id: &id,
                file: Some(&v1),
                bump: Some("huge"),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(format!("{err:#}").contains("invalid bump kind"));
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let (dir, registry) = setup();
        let v1 = write(dir.path(), "v1.json", &transfer("bool"));
        let args = CreateArgs::new(&v1, "Token", "cli");
        create(&registry, args.clone()).await.unwrap();
        let err = create(&registry, args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RegistryError>(),
            Some(RegistryError::DuplicateAbi { .. })
        ));
    }
}
