//! Store seam: row types, client column names, and the [`MigrationStore`]
//! trait the migrators run against.
//!
//! Production uses [`mysql::MySqlStore`]; tests substitute an in-memory
//! store so the cursor loop and write paths can be exercised without a
//! database.

pub mod mysql;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a backing store implementation.
///
/// `Connect` and `Fetch` are fatal to the run; `Update` is caught at the
/// row boundary and the run continues.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connect to store")]
    Connect(#[source] sqlx::Error),
    #[error("fetch {table} page")]
    Fetch {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("update {table} row {id}")]
    Update {
        table: &'static str,
        id: i64,
        #[source]
        source: sqlx::Error,
    },
}

/// Bulk upload row: the generated archive file URL.
#[derive(Debug, Clone)]
pub struct BulkRow {
    pub id: i64,
    pub archive_file: Option<String>,
}

/// Partner row: the metadata JSON document.
#[derive(Debug, Clone)]
pub struct PartnerRow {
    pub id: i64,
    pub meta: Option<String>,
}

/// Client row: the three attachment URL columns.
#[derive(Debug, Clone)]
pub struct ClientRow {
    pub id: i64,
    pub contract_attachment: Option<String>,
    pub tax_attachment: Option<String>,
    pub pks_attachment: Option<String>,
}

/// Client attachment columns that may hold signed URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientColumn {
    ContractAttachment,
    TaxAttachment,
    PksAttachment,
}

impl ClientColumn {
    /// Physical column name.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientColumn::ContractAttachment => "client_contract_attachment_url",
            ClientColumn::TaxAttachment => "client_tax_attachment",
            ClientColumn::PksAttachment => "client_pks_attachment",
        }
    }
}

/// Backing-store operations used by the migrators.
///
/// Every fetch is a keyset-pagination page: up to `limit` eligible rows with
/// id strictly greater than `after_id`, ascending. Every update is a single
/// autocommit statement scoped to one row.
#[async_trait]
pub trait MigrationStore: Send + Sync {
    async fn fetch_bulk_page(&self, after_id: i64, limit: i64)
        -> Result<Vec<BulkRow>, StoreError>;

    async fn update_bulk_archive(&self, id: i64, archive_file: &str) -> Result<(), StoreError>;

    async fn fetch_partner_page(
        &self,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<PartnerRow>, StoreError>;

    async fn update_partner_meta(&self, id: i64, meta: &str) -> Result<(), StoreError>;

    /// Client pages are additionally filtered to rows where at least one
    /// attachment column starts with `signed_prefix`.
    async fn fetch_client_page(
        &self,
        after_id: i64,
        limit: i64,
        signed_prefix: &str,
    ) -> Result<Vec<ClientRow>, StoreError>;

    /// Writes exactly the given columns in one UPDATE.
    async fn update_client_columns(
        &self,
        id: i64,
        updates: &[(ClientColumn, String)],
    ) -> Result<(), StoreError>;
}
