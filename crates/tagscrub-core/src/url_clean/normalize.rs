//! Canonical storage-prefix rewrite for bulk archive URLs.

use url::Url;

/// Rebuilds `raw` as `storage_prefix + "/" + filename`, keeping only the
/// final path segment of the input.
///
/// Returns `raw` unchanged when the prefix or input is empty, the input does
/// not parse, or no filename can be extracted. A trailing `/` on the prefix
/// is trimmed before joining.
pub fn normalize_archive_url(raw: &str, storage_prefix: &str) -> String {
    if storage_prefix.is_empty() || raw.is_empty() {
        return raw.to_string();
    }
    let Some(filename) = filename_from_path(raw) else {
        return raw.to_string();
    };
    format!("{}/{}", storage_prefix.trim_end_matches('/'), filename)
}

/// Last non-empty path segment of a URL, e.g. `bulk_rate_1754324774.xlsx`.
fn filename_from_path(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    Some(segment.to_string())
}
