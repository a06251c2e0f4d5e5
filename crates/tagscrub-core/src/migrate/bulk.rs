//! Bulk table: clean and canonicalize `archive_file` URLs.

use async_trait::async_trait;

use crate::config::MigrationConfig;
use crate::migrate::{RowAction, RowError, TableMigrator};
use crate::store::{BulkRow, MigrationStore, StoreError};
use crate::url_clean::{normalize_archive_url, strip_tag_params};

/// Strips tag params from bulk archive URLs and, when a URL changed,
/// rewrites it under the canonical storage prefix.
pub struct BulkMigrator<'a> {
    cfg: &'a MigrationConfig,
}

impl<'a> BulkMigrator<'a> {
    pub fn new(cfg: &'a MigrationConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl<'a, S: MigrationStore> TableMigrator<S> for BulkMigrator<'a> {
    type Row = BulkRow;

    fn table(&self) -> &'static str {
        "bulk"
    }

    async fn fetch_page(
        &self,
        store: &S,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<BulkRow>, StoreError> {
        store.fetch_bulk_page(after_id, limit).await
    }

    fn row_id(&self, row: &BulkRow) -> i64 {
        row.id
    }

    async fn process_row(&self, store: &S, row: &BulkRow) -> Result<RowAction, RowError> {
        let raw = match row.archive_file.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return Ok(RowAction::Skipped),
        };

        let (cleaned, changed) = strip_tag_params(raw);
        if !changed {
            return Ok(RowAction::Skipped);
        }
        let normalized = normalize_archive_url(&cleaned, &self.cfg.archive_storage_prefix);

        if self.cfg.dry_run {
            tracing::info!(
                id = row.id,
                old = raw,
                new = %normalized,
                "dry-run: would update archive_file"
            );
            return Ok(RowAction::WouldUpdate);
        }

        store
            .update_bulk_archive(row.id, &normalized)
            .await
            .map_err(|e| RowError {
                id: row.id,
                cause: e.into(),
            })?;
        tracing::info!(id = row.id, old = raw, new = %normalized, "updated archive_file");
        Ok(RowAction::Updated)
    }
}
