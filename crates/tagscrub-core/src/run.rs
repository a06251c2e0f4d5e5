//! Sequential orchestration of the three table migrations.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::MigrationConfig;
use crate::migrate::{
    run_migration, BulkMigrator, ClientMigrator, PartnerMigrator, TableSummary,
};
use crate::store::MigrationStore;

/// Counters for a whole run, one summary per table.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub bulk: TableSummary,
    pub partner: TableSummary,
    pub client: TableSummary,
}

impl RunReport {
    pub fn summaries(&self) -> [&TableSummary; 3] {
        [&self.bulk, &self.partner, &self.client]
    }

    pub fn total_updated(&self) -> u64 {
        self.summaries().iter().map(|s| s.updated).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.summaries().iter().map(|s| s.failed).sum()
    }
}

/// Runs the bulk, partner, and client migrations in order.
///
/// A fetch-level failure in any table aborts the whole run; per-row failures
/// are handled inside the driver and show up in the report counters.
pub async fn run_all<S: MigrationStore>(store: &S, cfg: &MigrationConfig) -> Result<RunReport> {
    tracing::info!(
        dry_run = cfg.dry_run,
        batch_size = cfg.batch_size,
        "starting tag cleanup migration"
    );

    let bulk = run_migration(&BulkMigrator::new(cfg), store, cfg.batch_size)
        .await
        .context("bulk migration")?;
    let partner = run_migration(&PartnerMigrator::new(cfg), store, cfg.batch_size)
        .await
        .context("partner migration")?;
    let client = run_migration(&ClientMigrator::new(cfg), store, cfg.batch_size)
        .await
        .context("client migration")?;

    let report = RunReport {
        bulk,
        partner,
        client,
    };
    let json = serde_json::to_string(&report).unwrap_or_default();
    tracing::info!(report = %json, "tag cleanup migration finished");
    Ok(report)
}
