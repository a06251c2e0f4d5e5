//! Migration driver: keyset pagination with explicit per-row outcomes.
//!
//! Each table supplies a [`TableMigrator`]; the cursor loop, batch logging,
//! and counter aggregation live once in [`run_migration`].

mod bulk;
mod client;
mod partner;

pub use bulk::BulkMigrator;
pub use client::ClientMigrator;
pub use partner::PartnerMigrator;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde::Serialize;

use crate::store::{MigrationStore, StoreError};

/// What happened to a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    /// Row written back.
    Updated,
    /// Dry run: row would have been written back.
    WouldUpdate,
    /// Nothing to do for this row.
    Skipped,
}

/// A row that could not be processed. The run continues past it; the driver
/// logs the id and cause and counts the failure.
#[derive(Debug)]
pub struct RowError {
    pub id: i64,
    pub cause: anyhow::Error,
}

/// Per-table counters reported at the end of a run. In a dry run, `updated`
/// counts rows that would have been written.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableSummary {
    pub table: &'static str,
    pub rows_seen: u64,
    pub updated: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// One table's migration logic: how to fetch a page and process one row.
#[async_trait]
pub trait TableMigrator<S: MigrationStore> {
    type Row: Send + Sync;

    /// Table name used in logs and summaries.
    fn table(&self) -> &'static str;

    /// Fetch up to `limit` eligible rows with id strictly greater than
    /// `after_id`, ascending.
    async fn fetch_page(
        &self,
        store: &S,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<Self::Row>, StoreError>;

    /// Identifier used to advance the cursor.
    fn row_id(&self, row: &Self::Row) -> i64;

    /// Decide and apply the cleanup for one row.
    async fn process_row(&self, store: &S, row: &Self::Row) -> Result<RowAction, RowError>;
}

/// Runs one table's migration to completion.
///
/// The cursor starts at 0 and advances to each processed row's id. A short
/// page means the table is exhausted; a full page triggers one more fetch.
/// Fetch failures abort the run; row failures are logged and counted.
pub async fn run_migration<S, M>(
    migrator: &M,
    store: &S,
    batch_size: i64,
) -> Result<TableSummary, StoreError>
where
    S: MigrationStore,
    M: TableMigrator<S>,
{
    let table = migrator.table();
    tracing::info!(table, "starting migration");

    let mut summary = TableSummary {
        table,
        ..Default::default()
    };
    let mut cursor = 0i64;
    let mut batch_num = 0u64;

    loop {
        let rows = migrator.fetch_page(store, cursor, batch_size).await?;
        if rows.is_empty() {
            tracing::info!(table, cursor, "no more rows, stopping");
            break;
        }

        batch_num += 1;
        tracing::info!(
            table,
            batch = batch_num,
            size = rows.len(),
            first_id = migrator.row_id(&rows[0]),
            last_id = migrator.row_id(&rows[rows.len() - 1]),
            "processing batch"
        );

        for row in &rows {
            summary.rows_seen += 1;
            cursor = migrator.row_id(row);

            match migrator.process_row(store, row).await {
                Ok(RowAction::Updated | RowAction::WouldUpdate) => summary.updated += 1,
                Ok(RowAction::Skipped) => summary.skipped += 1,
                Err(err) => {
                    summary.failed += 1;
                    tracing::error!(table, id = err.id, "row failed: {:#}", err.cause);
                }
            }
        }

        if (rows.len() as i64) < batch_size {
            tracing::info!(table, cursor, "short page, stopping");
            break;
        }
    }

    tracing::info!(
        table,
        rows_seen = summary.rows_seen,
        updated = summary.updated,
        skipped = summary.skipped,
        failed = summary.failed,
        "migration summary"
    );
    Ok(summary)
}
