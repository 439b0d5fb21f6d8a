//! # Skill Catalog CLI (`skills`)
//!
//! ## Usage
//!
//! ```bash
//! skills --config ./config/skills.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `skills init` | Create the SQLite database and run schema migrations |
//! | `skills sync` | Sync skills from the configured GitHub repository |
//! | `skills job <id>` | Show the status of a sync job |
//! | `skills skill add <file>` | Create a skill from a Markdown file |
//! | `skills skill update <id> <file>` | Update a skill from a Markdown file |
//! | `skills skill show <id>` | Print a skill and its versions |
//! | `skills serve` | Start the HTTP sync trigger |
//!
//! Diagnostics go to stderr through `tracing`; set `RUST_LOG` to adjust.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use skill_catalog::{config, migrate, server, skill_cmd, sync_cmd};

/// Skill catalog: sync AI skill documents from GitHub into a local catalog.
#[derive(Parser)]
#[command(name = "skills", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/skills.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it against an existing database is safe.
    Init,

    /// Sync skills from the configured GitHub repository.
    ///
    /// New documents are imported, changed ones updated in place, and
    /// synced skills whose document is gone are archived.
    Sync {
        /// Override `[github].repo` (`owner/name`).
        #[arg(long)]
        repo: Option<String>,

        /// Override `[github].branch`.
        #[arg(long)]
        branch: Option<String>,
    },

    /// Show the status of a sync job.
    Job {
        /// Job UUID, as printed by `skills sync`.
        id: String,
    },

    /// Manage user-authored skills.
    Skill {
        #[command(subcommand)]
        action: SkillAction,
    },

    /// Start the HTTP sync trigger on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum SkillAction {
    /// Create a skill from a Markdown file with YAML front matter.
    Add {
        file: PathBuf,

        /// Owner of the new skill; created as a regular user if unknown.
        #[arg(long, default_value = "local@skills.local")]
        author_email: String,
    },
    /// Update a skill from a Markdown file. Only fields present change.
    Update {
        /// Skill id or slug.
        id: String,
        file: PathBuf,
    },
    /// Print a skill and its version history.
    Show {
        /// Skill id or slug.
        id: String,
    },
}

fn log_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sync { repo, branch } => {
            sync_cmd::run_sync(&cfg, repo.as_deref(), branch.as_deref()).await?;
        }
        Commands::Job { id } => {
            sync_cmd::run_job(&cfg, &id).await?;
        }
        Commands::Skill { action } => match action {
            SkillAction::Add { file, author_email } => {
                skill_cmd::run_skill_add(&cfg, &file, &author_email).await?;
            }
            SkillAction::Update { id, file } => {
                skill_cmd::run_skill_update(&cfg, &id, &file).await?;
            }
            SkillAction::Show { id } => {
                skill_cmd::run_skill_show(&cfg, &id).await?;
            }
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
