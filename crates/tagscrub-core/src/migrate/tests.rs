//! Driver and migrator tests against an in-memory store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::MigrationConfig;
use crate::migrate::{run_migration, BulkMigrator, ClientMigrator, PartnerMigrator};
use crate::run::run_all;
use crate::store::{
    BulkRow, ClientColumn, ClientRow, MigrationStore, PartnerRow, StoreError,
};

const SIGN_PREFIX: &str = "https://sign.example.com/asset?";

#[derive(Debug, Clone, PartialEq)]
enum WriteOp {
    Bulk { id: i64, url: String },
    Partner { id: i64, meta: String },
    Client { id: i64, updates: Vec<(ClientColumn, String)> },
}

#[derive(Default)]
struct MemStore {
    bulk: Vec<BulkRow>,
    partners: Vec<PartnerRow>,
    clients: Vec<ClientRow>,
    /// Row ids whose updates fail, for error-continuation tests.
    fail_update_ids: Vec<i64>,
    writes: Mutex<Vec<WriteOp>>,
    fetches: AtomicU64,
}

impl MemStore {
    fn writes(&self) -> Vec<WriteOp> {
        self.writes.lock().unwrap().clone()
    }

    fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check_injected(&self, table: &'static str, id: i64) -> Result<(), StoreError> {
        if self.fail_update_ids.contains(&id) {
            return Err(StoreError::Update {
                table,
                id,
                source: sqlx::Error::Protocol("injected failure".into()),
            });
        }
        Ok(())
    }
}

fn take_page<T: Clone>(rows: &[T], id_of: impl Fn(&T) -> i64, after_id: i64, limit: i64) -> Vec<T> {
    rows.iter()
        .filter(|r| id_of(r) > after_id)
        .take(limit as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl MigrationStore for MemStore {
    async fn fetch_bulk_page(
        &self,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<BulkRow>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(take_page(&self.bulk, |r| r.id, after_id, limit))
    }

    async fn update_bulk_archive(&self, id: i64, archive_file: &str) -> Result<(), StoreError> {
        self.check_injected("bulk", id)?;
        self.writes.lock().unwrap().push(WriteOp::Bulk {
            id,
            url: archive_file.to_string(),
        });
        Ok(())
    }

    async fn fetch_partner_page(
        &self,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<PartnerRow>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(take_page(&self.partners, |r| r.id, after_id, limit))
    }

    async fn update_partner_meta(&self, id: i64, meta: &str) -> Result<(), StoreError> {
        self.check_injected("partner", id)?;
        self.writes.lock().unwrap().push(WriteOp::Partner {
            id,
            meta: meta.to_string(),
        });
        Ok(())
    }

    async fn fetch_client_page(
        &self,
        after_id: i64,
        limit: i64,
        signed_prefix: &str,
    ) -> Result<Vec<ClientRow>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let matches = |v: &Option<String>| {
            v.as_deref()
                .is_some_and(|s| s.starts_with(signed_prefix))
        };
        let eligible: Vec<ClientRow> = self
            .clients
            .iter()
            .filter(|r| {
                matches(&r.contract_attachment)
                    || matches(&r.tax_attachment)
                    || matches(&r.pks_attachment)
            })
            .cloned()
            .collect();
        Ok(take_page(&eligible, |r| r.id, after_id, limit))
    }

    async fn update_client_columns(
        &self,
        id: i64,
        updates: &[(ClientColumn, String)],
    ) -> Result<(), StoreError> {
        self.check_injected("client", id)?;
        self.writes.lock().unwrap().push(WriteOp::Client {
            id,
            updates: updates.to_vec(),
        });
        Ok(())
    }
}

fn test_cfg(dry_run: bool, batch_size: i64) -> MigrationConfig {
    MigrationConfig {
        database_url: String::new(),
        signed_url_prefix: SIGN_PREFIX.to_string(),
        archive_storage_prefix: "https://archive.example.com".to_string(),
        dry_run,
        batch_size,
    }
}

fn bulk_row(id: i64, url: &str) -> BulkRow {
    BulkRow {
        id,
        archive_file: Some(url.to_string()),
    }
}

#[tokio::test]
async fn cursor_visits_each_row_once_in_order() {
    let store = MemStore {
        bulk: (1..=5)
            .map(|i| bulk_row(i, &format!("https://old.example.com/a/f{i}.xlsx?tag=1")))
            .collect(),
        ..Default::default()
    };
    let cfg = test_cfg(false, 2);

    let summary = run_migration(&BulkMigrator::new(&cfg), &store, cfg.batch_size)
        .await
        .unwrap();

    assert_eq!(summary.rows_seen, 5);
    assert_eq!(summary.updated, 5);
    assert_eq!(summary.skipped, 0);
    // Two full pages plus the short final page.
    assert_eq!(store.fetch_count(), 3);

    let visited: Vec<i64> = store
        .writes()
        .iter()
        .map(|w| match w {
            WriteOp::Bulk { id, .. } => *id,
            other => panic!("unexpected write {other:?}"),
        })
        .collect();
    assert_eq!(visited, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn full_last_page_costs_one_empty_probe() {
    let store = MemStore {
        bulk: (1..=4)
            .map(|i| bulk_row(i, &format!("https://old.example.com/a/f{i}.xlsx?tag=1")))
            .collect(),
        ..Default::default()
    };
    let cfg = test_cfg(true, 2);

    let summary = run_migration(&BulkMigrator::new(&cfg), &store, cfg.batch_size)
        .await
        .unwrap();

    assert_eq!(summary.rows_seen, 4);
    assert_eq!(store.fetch_count(), 3);
}

#[tokio::test]
async fn bulk_normalizes_changed_urls_and_skips_clean_ones() {
    let store = MemStore {
        bulk: vec![
            bulk_row(1, "https://old.example.com/a/b/file_1.xlsx?tagging=2"),
            bulk_row(2, "https://old.example.com/a/b/file_2.xlsx"),
            BulkRow {
                id: 3,
                archive_file: None,
            },
        ],
        ..Default::default()
    };
    let cfg = test_cfg(false, 10);

    let summary = run_migration(&BulkMigrator::new(&cfg), &store, cfg.batch_size)
        .await
        .unwrap();

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(
        store.writes(),
        vec![WriteOp::Bulk {
            id: 1,
            url: "https://archive.example.com/file_1.xlsx".to_string(),
        }]
    );
}

#[tokio::test]
async fn row_failure_continues_with_next_row() {
    let store = MemStore {
        bulk: (1..=3)
            .map(|i| bulk_row(i, &format!("https://old.example.com/a/f{i}.xlsx?tag=1")))
            .collect(),
        fail_update_ids: vec![2],
        ..Default::default()
    };
    let cfg = test_cfg(false, 10);

    let summary = run_migration(&BulkMigrator::new(&cfg), &store, cfg.batch_size)
        .await
        .unwrap();

    assert_eq!(summary.rows_seen, 3);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.failed, 1);
    let ids: Vec<i64> = store
        .writes()
        .iter()
        .map(|w| match w {
            WriteOp::Bulk { id, .. } => *id,
            other => panic!("unexpected write {other:?}"),
        })
        .collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn partner_write_preserves_other_keys_and_skips_bad_json() {
    let store = MemStore {
        partners: vec![
            PartnerRow {
                id: 1,
                meta: Some(
                    r#"{"partner_pos_attach_files":["https://x/y?tag=1",42],"keep":"me"}"#
                        .to_string(),
                ),
            },
            PartnerRow {
                id: 2,
                meta: Some("{broken".to_string()),
            },
        ],
        ..Default::default()
    };
    let cfg = test_cfg(false, 10);

    let summary = run_migration(&PartnerMigrator::new(&cfg), &store, cfg.batch_size)
        .await
        .unwrap();

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.skipped, 1);

    let writes = store.writes();
    let WriteOp::Partner { id, meta } = &writes[0] else {
        panic!("expected partner write");
    };
    assert_eq!(*id, 1);
    let doc: Value = serde_json::from_str(meta).unwrap();
    assert_eq!(
        doc["partner_pos_attach_files"],
        serde_json::json!(["https://x/y", 42])
    );
    assert_eq!(doc["keep"], serde_json::json!("me"));
}

#[tokio::test]
async fn client_update_touches_exactly_the_changed_columns() {
    let store = MemStore {
        clients: vec![ClientRow {
            id: 7,
            contract_attachment: Some(format!("{SIGN_PREFIX}path=a&tag=1")),
            // Tagged, but not a signed URL: must be left alone.
            tax_attachment: Some("https://other.example.com/x?tag=1".to_string()),
            pks_attachment: Some(format!("{SIGN_PREFIX}path=b&tagging=2")),
        }],
        ..Default::default()
    };
    let cfg = test_cfg(false, 10);

    let summary = run_migration(&ClientMigrator::new(&cfg), &store, cfg.batch_size)
        .await
        .unwrap();

    assert_eq!(summary.updated, 1);
    let writes = store.writes();
    assert_eq!(writes.len(), 1);
    let WriteOp::Client { id, updates } = &writes[0] else {
        panic!("expected client write");
    };
    assert_eq!(*id, 7);
    let columns: Vec<ClientColumn> = updates.iter().map(|(c, _)| *c).collect();
    assert_eq!(
        columns,
        vec![ClientColumn::ContractAttachment, ClientColumn::PksAttachment]
    );
    assert_eq!(updates[0].1, format!("{SIGN_PREFIX}path=a"));
    assert_eq!(updates[1].1, format!("{SIGN_PREFIX}path=b"));
}

#[tokio::test]
async fn client_with_no_eligible_changes_is_skipped() {
    let store = MemStore {
        clients: vec![ClientRow {
            id: 1,
            contract_attachment: Some(format!("{SIGN_PREFIX}path=a")),
            tax_attachment: None,
            pks_attachment: Some("".to_string()),
        }],
        ..Default::default()
    };
    let cfg = test_cfg(false, 10);

    let summary = run_migration(&ClientMigrator::new(&cfg), &store, cfg.batch_size)
        .await
        .unwrap();

    assert_eq!(summary.rows_seen, 1);
    assert_eq!(summary.skipped, 1);
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn dry_run_issues_no_writes_anywhere() {
    let store = MemStore {
        bulk: vec![bulk_row(1, "https://old.example.com/a/f.xlsx?tag=1")],
        partners: vec![PartnerRow {
            id: 1,
            meta: Some(r#"{"partner_pos_attach_files":["https://x/y?tagging=1"]}"#.to_string()),
        }],
        clients: vec![ClientRow {
            id: 1,
            contract_attachment: Some(format!("{SIGN_PREFIX}path=a&tag=1")),
            tax_attachment: None,
            pks_attachment: None,
        }],
        ..Default::default()
    };
    let cfg = test_cfg(true, 10);

    let report = run_all(&store, &cfg).await.unwrap();

    assert_eq!(report.total_updated(), 3);
    assert_eq!(report.total_failed(), 0);
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn run_all_orders_tables_and_aggregates() {
    let store = MemStore {
        bulk: vec![bulk_row(1, "https://old.example.com/a/f.xlsx?tag=1")],
        partners: vec![PartnerRow { id: 1, meta: None }],
        clients: vec![],
        ..Default::default()
    };
    let cfg = test_cfg(false, 10);

    let report = run_all(&store, &cfg).await.unwrap();

    assert_eq!(report.bulk.updated, 1);
    assert_eq!(report.partner.skipped, 1);
    assert_eq!(report.client.rows_seen, 0);
    // Bulk write happened before any partner/client write could.
    assert!(matches!(store.writes()[0], WriteOp::Bulk { id: 1, .. }));
}
