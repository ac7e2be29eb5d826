//! abireg: command-line interface for the ABI registry.

mod commands;
mod config;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::registry::{CreateArgs, UpdateArgs};
use config::AbiregConfig;

#[derive(Parser)]
#[command(name = "abireg", version, about = "Contract ABI registry")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an abireg.toml template
    Init {
        /// Directory to initialize (default: current directory)
        dir: Option<PathBuf>,
    },
    /// Print the content hash of an ABI file
    Hash {
        file: PathBuf,
        /// Print only the first N hex characters
        #[arg(long)]
        short: Option<usize>,
    },
    /// Print the canonical form of an ABI file
    Normalize {
        file: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
    /// Validate an ABI file
    Validate {
        file: PathBuf,
        /// Also require every member of this standard (ERC20, ERC721, ERC1155)
        #[arg(long)]
        standard: Option<String>,
    },
    /// Detect the token standard an ABI file implements
    Detect { file: PathBuf },
    /// Compare two ABI files
    Diff {
        old: PathBuf,
        new: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Register a new ABI
    Create {
        file: PathBuf,
        #[arg(long)]
        name: String,
        /// Owning principal
        #[arg(long, default_value = "local")]
        owner: String,
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        standard: Option<String>,
        #[arg(long)]
        network: Option<String>,
        /// Initial version (default: 1.0.0)
        #[arg(long)]
        version: Option<String>,
    },
    /// Update a registered ABI
    Update {
        id: String,
        /// New ABI file; a new version is recorded when its content changed
        #[arg(long)]
        abi: Option<PathBuf>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        standard: Option<String>,
        #[arg(long)]
        network: Option<String>,
        /// Explicit version; must be newer than the latest
        #[arg(long)]
        version: Option<String>,
        /// Version bump (major, minor, patch)
        #[arg(long)]
        bump: Option<String>,
        #[arg(long)]
        changelog: Option<String>,
        #[arg(long)]
        deprecated: bool,
    },
    /// Show a registered ABI
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// List the versions of a registered ABI
    Versions { id: String },
    /// Soft-delete a registered ABI
    Delete { id: String },
    /// Compare two recorded versions of a registered ABI
    Compare {
        id: String,
        from: u64,
        to: u64,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = run(cli).await;
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let (config, base) = load_config(&cwd)?;
    init_tracing(&config.logging.level);
    debug!(base = %base.display(), "resolved configuration");

    match cli.command {
        Commands::Init { dir } => commands::init::run(&dir.unwrap_or(cwd)),
        Commands::Hash { file, short } => commands::inspect::hash_cmd(&file, short),
        Commands::Normalize { file, pretty } => commands::inspect::normalize_cmd(&file, pretty),
        Commands::Validate { file, standard } => {
            commands::validate::run(&file, standard.as_deref(), config.validation)
        }
        Commands::Detect { file } => commands::inspect::detect_cmd(&file),
        Commands::Diff { old, new, json } => commands::diff::run(&old, &new, json),

        Commands::Create {
            file,
            name,
            owner,
            description,
            tags,
            standard,
            network,
            version,
        } => {
            let registry = commands::registry::open(&config, &base);
            let entity = commands::registry::create(
                &registry,
                CreateArgs {
                    description: description.as_deref(),
                    tags: tags.as_deref(),
                    standard: standard.as_deref(),
                    network: network.as_deref(),
                    version: version.as_deref(),
                    ..CreateArgs::new(&file, &name, &owner)
                },
            )
            .await?;
            println!("Registered {} as {}", file.display(), entity.id);
            print!("{}", commands::registry::format_entity(&entity));
            Ok(())
        }

        Commands::Update {
            id,
            abi,
            name,
            description,
            tags,
            standard,
            network,
            version,
            bump,
            changelog,
            deprecated,
        } => {
            let registry = commands::registry::open(&config, &base);
            let outcome = commands::registry::update(
                &registry,
                UpdateArgs {
                    id: &id,
                    file: abi.as_deref(),
                    name: name.as_deref(),
                    description: description.as_deref(),
                    tags: tags.as_deref(),
                    standard: standard.as_deref(),
                    network: network.as_deref(),
                    version: version.as_deref(),
                    bump: bump.as_deref(),
                    changelog: changelog.as_deref(),
                    deprecated,
                },
            )
            .await?;
            print!("{}", commands::registry::format_outcome(&outcome));
            Ok(())
        }

        Commands::Show { id, json } => {
            let registry = commands::registry::open(&config, &base);
            commands::registry::show(&registry, &id, json).await
        }
        Commands::Versions { id } => {
            let registry = commands::registry::open(&config, &base);
            commands::registry::versions(&registry, &id).await
        }
        Commands::Delete { id } => {
            let registry = commands::registry::open(&config, &base);
            commands::registry::delete(&registry, &id).await
        }
        Commands::Compare { id, from, to, json } => {
            let registry = commands::registry::open(&config, &base);
            commands::registry::compare(&registry, &id, from, to, json).await
        }
    }
}

/// Load `abireg.toml` from the working directory upward. Without one, the
/// defaults apply relative to the working directory.
fn load_config(cwd: &Path) -> anyhow::Result<(AbiregConfig, PathBuf)> {
    match AbiregConfig::find_and_load(cwd)? {
        Some((config, dir)) => Ok((config, dir)),
        None => Ok((AbiregConfig::default(), cwd.to_path_buf())),
    }
}

/// Log to stderr. `RUST_LOG` overrides the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
