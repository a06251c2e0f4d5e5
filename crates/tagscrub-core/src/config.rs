//! Environment-based configuration, read once at startup.
//!
//! All knobs live in one `MigrationConfig` struct that is passed by
//! reference into the migrators; nothing reads the environment after
//! startup.

use thiserror::Error;

/// Page size used when `BATCH_SIZE` is unset or unusable.
pub const DEFAULT_BATCH_SIZE: i64 = 200;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is missing or empty")]
    Missing(&'static str),
}

/// Configuration for a migration run.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// MySQL connection string (`DATABASE_URL`).
    pub database_url: String,
    /// Prefix identifying URLs issued by the asset-signing service
    /// (`SIGNED_URL_PREFIX`). Used both in the client fetch query and as a
    /// per-column safety filter.
    pub signed_url_prefix: String,
    /// Canonical storage base URL for bulk archive files
    /// (`ARCHIVE_STORAGE_PREFIX`). Empty disables normalization.
    pub archive_storage_prefix: String,
    /// Log intended writes instead of executing them (`DRY_RUN`).
    pub dry_run: bool,
    /// Rows per keyset-pagination page (`BATCH_SIZE`).
    pub batch_size: i64,
}

impl MigrationConfig {
    /// Build the configuration from the process environment.
    ///
    /// `DATABASE_URL` and `SIGNED_URL_PREFIX` are required; everything else
    /// falls back to a default. An unusable `BATCH_SIZE` logs a warning and
    /// uses [`DEFAULT_BATCH_SIZE`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = require_var("DATABASE_URL")?;
        let signed_url_prefix = require_var("SIGNED_URL_PREFIX")?;
        let archive_storage_prefix = std::env::var("ARCHIVE_STORAGE_PREFIX")
            .map(|v| v.trim().to_string())
            .unwrap_or_default();
        let dry_run = parse_dry_run(std::env::var("DRY_RUN").ok().as_deref());
        let batch_size = parse_batch_size(std::env::var("BATCH_SIZE").ok().as_deref());

        Ok(Self {
            database_url,
            signed_url_prefix,
            archive_storage_prefix,
            dry_run,
            batch_size,
        })
    }
}

/// Clamp a caller-supplied batch size to a usable value, warning on junk.
pub fn clamp_batch_size(n: i64) -> i64 {
    if n > 0 {
        n
    } else {
        tracing::warn!(
            value = n,
            default = DEFAULT_BATCH_SIZE,
            "non-positive batch size, using default"
        );
        DEFAULT_BATCH_SIZE
    }
}

fn require_var(key: &'static str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn parse_dry_run(raw: Option<&str>) -> bool {
    matches!(
        raw.map(str::trim).map(str::to_ascii_lowercase).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

fn parse_batch_size(raw: Option<&str>) -> i64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return DEFAULT_BATCH_SIZE;
    };
    match raw.parse::<i64>() {
        Ok(n) if n > 0 => n,
        _ => {
            tracing::warn!(
                value = raw,
                default = DEFAULT_BATCH_SIZE,
                "invalid BATCH_SIZE, using default"
            );
            DEFAULT_BATCH_SIZE
        }
    }
}
