//! # Warden role tooling
//!
//! Loads a seed document into an in-memory store, then renders the role
//! hierarchy or runs permission checks against it.
//!
//! ## Commands
//!
//! - `diagram` - Write the Mermaid role hierarchy document
//! - `check` - Decide one permission check and print the explanation
//! - `permissions` - List a principal's effective permissions
//!
//! ## Configuration
//!
//! - `WARDEN_CONFIG` - Engine configuration file (TOML)
//! - `RUST_LOG` - Log filter (default: config `log_level`)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_authz::diagram::RoleDiagram;
use warden_authz::seed::SeedData;
use warden_authz::{CheckRequest, DecisionEngine, EngineConfig, InMemoryStore};

/// Warden role tooling CLI
#[derive(Parser)]
#[command(name = "warden-roles")]
#[command(about = "Inspect and exercise a Warden role seed")]
#[command(version)]
struct Cli {
    /// Seed document (TOML)
    seed: PathBuf,

    /// Engine configuration file
    #[arg(short, long, env = "WARDEN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the role hierarchy diagram
    Diagram {
        /// Output Markdown file
        #[arg(short, long, default_value = "docs/role-hierarchy.md")]
        out: PathBuf,
    },

    /// Decide a permission check
    Check {
        /// Principal id
        user: String,

        /// Permission name
        permission: String,

        /// Resource instance
        #[arg(long, num_args = 2, value_names = ["TYPE", "ID"])]
        resource: Option<Vec<String>>,

        /// Resource owner id
        #[arg(long, requires = "resource")]
        owner: Option<String>,
    },

    /// List effective permissions of a principal
    Permissions {
        /// Principal id
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => EngineConfig::default(),
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let seed = SeedData::load(&cli.seed)
        .with_context(|| format!("Failed to load seed from {:?}", cli.seed))?;

    let store = InMemoryStore::new();
    let summary = seed.apply(&store).await.context("Failed to apply seed")?;
    info!("Loaded {} roles from {:?}", summary.roles, cli.seed);

    match cli.command {
        Command::Diagram { out } => {
            let diagram = RoleDiagram::build(&store).await?;
            let content = diagram.render(chrono::Utc::now());

            if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("Failed to create {:?}", dir))?;
            }
            tokio::fs::write(&out, content)
                .await
                .with_context(|| format!("Failed to write {:?}", out))?;

            info!("Role diagram generated at {:?}", out);
        }
        Command::Check {
            user,
            permission,
            resource,
            owner,
        } => {
            let engine = DecisionEngine::new(config, Arc::new(store))?;

            let mut request = CheckRequest::new(user, permission);
            if let Some([resource_type, resource_id]) = resource.as_deref() {
                request = request.on_resource(resource_type, resource_id);
            }
            if let Some(owner) = owner {
                request = request.owned_by(owner);
            }

            let explanation = engine.explain(&request).await?;
            println!("{}", serde_json::to_string_pretty(&explanation)?);
        }
        Command::Permissions { user } => {
            let engine = DecisionEngine::new(config, Arc::new(store))?;

            for name in engine.effective_permissions(&user).await? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
