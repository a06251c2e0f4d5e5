//! MySQL-backed store implementation.
//!
//! Queries pin the eligibility filters in SQL so the migrators only ever see
//! rows worth looking at: recent custom-rate bulk archives, active partners
//! and clients with unexpired contracts.

use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, Pool, Row};

use async_trait::async_trait;

use super::{BulkRow, ClientColumn, ClientRow, MigrationStore, PartnerRow, StoreError};

/// Handle to the production MySQL database.
#[derive(Clone)]
pub struct MySqlStore {
    pool: Pool<MySql>,
}

impl MySqlStore {
    /// Connect to the store; the pool eagerly opens a connection, so a bad
    /// DSN or unreachable server fails here rather than mid-run.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(4)
            .connect(database_url)
            .await
            .map_err(StoreError::Connect)?;
        Ok(MySqlStore { pool })
    }

    /// Round-trip the connection. Used by the `check` command.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StoreError::Connect)?;
        Ok(())
    }

    /// Count of bulk rows matching the migration's eligibility filter.
    pub async fn count_bulk_rows(&self) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n
            FROM bulk
            WHERE archive_type = 'custom_client_rate'
              AND created_at >= DATE_SUB(NOW(), INTERVAL 1 MONTH)
              AND archive_file IS NOT NULL
              AND archive_file != ''
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Fetch {
            table: "bulk",
            source: e,
        })?;
        Ok(row.get("n"))
    }

    /// Count of partner rows matching the migration's eligibility filter.
    pub async fn count_partner_rows(&self) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n
            FROM partner
            WHERE partner_is_banned != 1
              AND partner_contract_end >= NOW()
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Fetch {
            table: "partner",
            source: e,
        })?;
        Ok(row.get("n"))
    }

    /// Count of client rows matching the migration's eligibility filter.
    pub async fn count_client_rows(&self, signed_prefix: &str) -> Result<i64, StoreError> {
        let like = like_pattern(signed_prefix);
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n
            FROM client
            WHERE (
                client_contract_attachment_url LIKE ? OR
                client_tax_attachment LIKE ? OR
                client_pks_attachment LIKE ?
            )
              AND client_is_banned != 1
              AND client_contract_end_date >= NOW()
            "#,
        )
        .bind(&like)
        .bind(&like)
        .bind(&like)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Fetch {
            table: "client",
            source: e,
        })?;
        Ok(row.get("n"))
    }
}

fn like_pattern(prefix: &str) -> String {
    format!("{prefix}%")
}

#[async_trait]
impl MigrationStore for MySqlStore {
    async fn fetch_bulk_page(
        &self,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<BulkRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, archive_file
            FROM bulk
            WHERE id > ?
              AND archive_type = 'custom_client_rate'
              AND created_at >= DATE_SUB(NOW(), INTERVAL 1 MONTH)
              AND archive_file IS NOT NULL
              AND archive_file != ''
            ORDER BY id ASC
            LIMIT ?
            "#,
        )
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Fetch {
            table: "bulk",
            source: e,
        })?;

        Ok(rows
            .iter()
            .map(|row| BulkRow {
                id: row.get("id"),
                archive_file: row.get("archive_file"),
            })
            .collect())
    }

    async fn update_bulk_archive(&self, id: i64, archive_file: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE bulk
            SET archive_file = ?
            WHERE id = ?
            "#,
        )
        .bind(archive_file)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Update {
            table: "bulk",
            id,
            source: e,
        })?;
        Ok(())
    }

    async fn fetch_partner_page(
        &self,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<PartnerRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT partner_id, meta
            FROM partner
            WHERE partner_id > ?
              AND partner_is_banned != 1
              AND partner_contract_end >= NOW()
            ORDER BY partner_id ASC
            LIMIT ?
            "#,
        )
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Fetch {
            table: "partner",
            source: e,
        })?;

        Ok(rows
            .iter()
            .map(|row| PartnerRow {
                id: row.get("partner_id"),
                meta: row.get("meta"),
            })
            .collect())
    }

    async fn update_partner_meta(&self, id: i64, meta: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE partner
            SET meta = ?
            WHERE partner_id = ?
            "#,
        )
        .bind(meta)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Update {
            table: "partner",
            id,
            source: e,
        })?;
        Ok(())
    }

    async fn fetch_client_page(
        &self,
        after_id: i64,
        limit: i64,
        signed_prefix: &str,
    ) -> Result<Vec<ClientRow>, StoreError> {
        let like = like_pattern(signed_prefix);
        let rows = sqlx::query(
            r#"
            SELECT
                client_id,
                client_contract_attachment_url,
                client_tax_attachment,
                client_pks_attachment
            FROM client
            WHERE client_id > ?
              AND (
                  client_contract_attachment_url LIKE ? OR
                  client_tax_attachment LIKE ? OR
                  client_pks_attachment LIKE ?
              )
              AND client_is_banned != 1
              AND client_contract_end_date >= NOW()
            ORDER BY client_id ASC
            LIMIT ?
            "#,
        )
        .bind(after_id)
        .bind(&like)
        .bind(&like)
        .bind(&like)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Fetch {
            table: "client",
            source: e,
        })?;

        Ok(rows
            .iter()
            .map(|row| ClientRow {
                id: row.get("client_id"),
                contract_attachment: row.get("client_contract_attachment_url"),
                tax_attachment: row.get("client_tax_attachment"),
                pks_attachment: row.get("client_pks_attachment"),
            })
            .collect())
    }

    async fn update_client_columns(
        &self,
        id: i64,
        updates: &[(ClientColumn, String)],
    ) -> Result<(), StoreError> {
        if updates.is_empty() {
            return Ok(());
        }

        // Column names come from the ClientColumn enum, never from data.
        let set_clause = updates
            .iter()
            .map(|(col, _)| format!("{} = ?", col.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE client SET {set_clause} WHERE client_id = ?");

        let mut query = sqlx::query(&sql);
        for (_, value) in updates {
            query = query.bind(value.as_str());
        }
        query
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Update {
                table: "client",
                id,
                source: e,
            })?;
        Ok(())
    }
}
