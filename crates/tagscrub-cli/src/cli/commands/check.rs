//! `tagscrub check` – config and connectivity preflight, no writes.

use anyhow::Result;
use tagscrub_core::config::MigrationConfig;
use tagscrub_core::store::mysql::MySqlStore;

pub async fn run_check(cfg: &MigrationConfig) -> Result<()> {
    let store = MySqlStore::connect(&cfg.database_url).await?;
    store.ping().await?;

    let bulk = store.count_bulk_rows().await?;
    let partner = store.count_partner_rows().await?;
    let client = store.count_client_rows(&cfg.signed_url_prefix).await?;

    println!("store reachable");
    println!("{:<10} {:>12}", "TABLE", "CANDIDATES");
    println!("{:<10} {:>12}", "bulk", bulk);
    println!("{:<10} {:>12}", "partner", partner);
    println!("{:<10} {:>12}", "client", client);
    Ok(())
}
