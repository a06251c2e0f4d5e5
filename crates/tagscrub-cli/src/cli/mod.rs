//! CLI for the tagscrub migration tool.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tagscrub_core::config::{clamp_batch_size, MigrationConfig};

use commands::{run_check, run_cleanup};

/// Top-level CLI for the tagscrub URL cleanup migration.
#[derive(Debug, Parser)]
#[command(name = "tagscrub")]
#[command(about = "One-shot cleanup of tag/tagging query params in stored URLs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the cleanup migration over all three tables.
    Run {
        /// Compute and log changes without writing anything back.
        #[arg(long)]
        dry_run: bool,

        /// Rows per page for keyset pagination (overrides BATCH_SIZE).
        #[arg(long, value_name = "N")]
        batch_size: Option<i64>,
    },

    /// Verify configuration and connectivity; report candidate row counts.
    Check,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        // A local .env is a convenience; deployments set the environment.
        dotenvy::dotenv().ok();

        let cli = Cli::parse();
        let mut cfg = MigrationConfig::from_env()?;

        match cli.command {
            CliCommand::Run {
                dry_run,
                batch_size,
            } => {
                if dry_run {
                    cfg.dry_run = true;
                }
                if let Some(n) = batch_size {
                    cfg.batch_size = clamp_batch_size(n);
                }
                run_cleanup(&cfg).await?;
            }
            CliCommand::Check => run_check(&cfg).await?,
        }

        Ok(())
    }
}
