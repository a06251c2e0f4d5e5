//! `tagscrub run` – execute the cleanup migration.

use anyhow::Result;
use tagscrub_core::config::MigrationConfig;
use tagscrub_core::run::run_all;
use tagscrub_core::store::mysql::MySqlStore;

pub async fn run_cleanup(cfg: &MigrationConfig) -> Result<()> {
    let store = MySqlStore::connect(&cfg.database_url).await?;
    let report = run_all(&store, cfg).await?;

    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>10}",
        "TABLE", "SEEN", "UPDATED", "SKIPPED", "FAILED"
    );
    for s in report.summaries() {
        println!(
            "{:<10} {:>10} {:>10} {:>10} {:>10}",
            s.table, s.rows_seen, s.updated, s.skipped, s.failed
        );
    }
    if cfg.dry_run {
        println!("dry run: no changes were written");
    }
    if report.total_failed() > 0 {
        tracing::warn!(
            failed = report.total_failed(),
            "some rows failed; see the log for ids"
        );
    }
    Ok(())
}
