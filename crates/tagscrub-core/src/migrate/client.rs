//! Client table: clean the three attachment URL columns independently.

use async_trait::async_trait;

use crate::config::MigrationConfig;
use crate::migrate::{RowAction, RowError, TableMigrator};
use crate::store::{ClientColumn, ClientRow, MigrationStore, StoreError};
use crate::url_clean::strip_tag_params;

/// Strips tag params from client attachment URLs. Only columns whose value
/// starts with the signed-URL prefix are touched; changed columns are
/// written back in a single UPDATE.
pub struct ClientMigrator<'a> {
    cfg: &'a MigrationConfig,
}

impl<'a> ClientMigrator<'a> {
    pub fn new(cfg: &'a MigrationConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl<'a, S: MigrationStore> TableMigrator<S> for ClientMigrator<'a> {
    type Row = ClientRow;

    fn table(&self) -> &'static str {
        "client"
    }

    async fn fetch_page(
        &self,
        store: &S,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<ClientRow>, StoreError> {
        store
            .fetch_client_page(after_id, limit, &self.cfg.signed_url_prefix)
            .await
    }

    fn row_id(&self, row: &ClientRow) -> i64 {
        row.id
    }

    async fn process_row(&self, store: &S, row: &ClientRow) -> Result<RowAction, RowError> {
        let mut updates: Vec<(ClientColumn, String)> = Vec::new();

        for (col, value) in [
            (
                ClientColumn::ContractAttachment,
                row.contract_attachment.as_deref(),
            ),
            (ClientColumn::TaxAttachment, row.tax_attachment.as_deref()),
            (ClientColumn::PksAttachment, row.pks_attachment.as_deref()),
        ] {
            let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
                continue;
            };
            // Only touch URLs issued by the signing service.
            if !raw.starts_with(&self.cfg.signed_url_prefix) {
                continue;
            }
            let (cleaned, changed) = strip_tag_params(raw);
            if changed {
                updates.push((col, cleaned));
            }
        }

        if updates.is_empty() {
            return Ok(RowAction::Skipped);
        }

        if self.cfg.dry_run {
            tracing::info!(
                id = row.id,
                updates = ?updates,
                "dry-run: would update client columns"
            );
            return Ok(RowAction::WouldUpdate);
        }

        store
            .update_client_columns(row.id, &updates)
            .await
            .map_err(|e| RowError {
                id: row.id,
                cause: e.into(),
            })?;

        let columns = updates
            .iter()
            .map(|(col, _)| col.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        tracing::info!(id = row.id, columns = %columns, "updated client columns");
        Ok(RowAction::Updated)
    }
}
