//! Partner table: clean attachment URLs inside the `meta` JSON document.

use anyhow::Context;
use async_trait::async_trait;

use crate::config::MigrationConfig;
use crate::meta::{rewrite_attach_files, MetaRewrite, SkipReason};
use crate::migrate::{RowAction, RowError, TableMigrator};
use crate::store::{MigrationStore, PartnerRow, StoreError};

/// Strips tag params from the `partner_pos_attach_files` list inside the
/// partner meta JSON, leaving the rest of the document untouched.
pub struct PartnerMigrator<'a> {
    cfg: &'a MigrationConfig,
}

impl<'a> PartnerMigrator<'a> {
    pub fn new(cfg: &'a MigrationConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl<'a, S: MigrationStore> TableMigrator<S> for PartnerMigrator<'a> {
    type Row = PartnerRow;

    fn table(&self) -> &'static str {
        "partner"
    }

    async fn fetch_page(
        &self,
        store: &S,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<PartnerRow>, StoreError> {
        store.fetch_partner_page(after_id, limit).await
    }

    fn row_id(&self, row: &PartnerRow) -> i64 {
        row.id
    }

    async fn process_row(&self, store: &S, row: &PartnerRow) -> Result<RowAction, RowError> {
        let raw = match row.meta.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return Ok(RowAction::Skipped),
        };

        let rewrite = rewrite_attach_files(raw)
            .context("re-serialize meta")
            .map_err(|e| RowError {
                id: row.id,
                cause: e,
            })?;

        let new_meta = match rewrite {
            MetaRewrite::Skip(SkipReason::InvalidJson) => {
                tracing::warn!(id = row.id, "invalid JSON in meta, skipping");
                return Ok(RowAction::Skipped);
            }
            MetaRewrite::Skip(SkipReason::NoAttachList) | MetaRewrite::Unchanged => {
                return Ok(RowAction::Skipped);
            }
            MetaRewrite::Changed(json) => json,
        };

        if self.cfg.dry_run {
            tracing::info!(
                id = row.id,
                old = raw,
                new = %new_meta,
                "dry-run: would update meta"
            );
            return Ok(RowAction::WouldUpdate);
        }

        store
            .update_partner_meta(row.id, &new_meta)
            .await
            .map_err(|e| RowError {
                id: row.id,
                cause: e.into(),
            })?;
        tracing::info!(id = row.id, "updated meta (attachment list cleaned)");
        Ok(RowAction::Updated)
    }
}
