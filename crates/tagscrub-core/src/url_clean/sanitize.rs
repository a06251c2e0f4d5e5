//! Removal of `tag`/`tagging` query parameters.

use url::Url;

/// Query parameter keys injected by the storage tagging layer.
const TAG_KEYS: [&str; 2] = ["tag", "tagging"];

/// Removes every `tag` and `tagging` query parameter from `raw`.
///
/// Returns the rebuilt URL and whether anything was removed. Matching is
/// case-sensitive and all occurrences of either key are dropped, not just
/// the first. Input that does not parse as an absolute URL is returned
/// unchanged with `false` — malformed data is a no-op, not an error.
///
/// Remaining parameters keep their relative order but are re-encoded
/// canonically; if nothing was removed the original string is returned
/// byte-identical. A URL whose only parameters were tag keys loses its `?`
/// entirely.
pub fn strip_tag_params(raw: &str) -> (String, bool) {
    if raw.is_empty() {
        return (raw.to_string(), false);
    }

    let mut parsed = match Url::parse(raw) {
        Ok(u) => u,
        Err(_) => return (raw.to_string(), false),
    };

    let mut removed = false;
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter_map(|(k, v)| {
            if TAG_KEYS.contains(&k.as_ref()) {
                removed = true;
                None
            } else {
                Some((k.into_owned(), v.into_owned()))
            }
        })
        .collect();

    if !removed {
        return (raw.to_string(), false);
    }

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed
            .query_pairs_mut()
            .clear()
            .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }

    (parsed.to_string(), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_both_keys_keeps_others() {
        let (out, changed) = strip_tag_params("https://example.com/a?tag=1&foo=bar&tagging=2");
        assert!(changed);
        assert!(out.contains("foo=bar"));
        assert!(!out.contains("tag="));
        assert!(!out.contains("tagging="));
    }

    #[test]
    fn removes_repeated_occurrences() {
        let (out, changed) = strip_tag_params("https://example.com/a?tag=1&tag=2&x=y&tag=3");
        assert!(changed);
        assert_eq!(out, "https://example.com/a?x=y");
    }

    #[test]
    fn drops_query_when_only_tag_params() {
        let (out, changed) = strip_tag_params("https://example.com/a/b?tag=1");
        assert!(changed);
        assert_eq!(out, "https://example.com/a/b");
    }

    #[test]
    fn no_op_is_byte_identical() {
        let input = "https://example.com/a?foo=bar&baz=qux";
        let (out, changed) = strip_tag_params(input);
        assert!(!changed);
        assert_eq!(out, input);
    }

    #[test]
    fn no_query_at_all() {
        let input = "https://example.com/file.xlsx";
        let (out, changed) = strip_tag_params(input);
        assert!(!changed);
        assert_eq!(out, input);
    }

    #[test]
    fn case_sensitive_keys() {
        let input = "https://example.com/a?TAG=1&Tagging=2";
        let (out, changed) = strip_tag_params(input);
        assert!(!changed);
        assert_eq!(out, input);
    }

    #[test]
    fn malformed_input_unchanged() {
        let input = "::definitely not a url::";
        let (out, changed) = strip_tag_params(input);
        assert!(!changed);
        assert_eq!(out, input);

        let (out, changed) = strip_tag_params("");
        assert!(!changed);
        assert_eq!(out, "");
    }

    #[test]
    fn idempotent() {
        let once = strip_tag_params("https://example.com/a?tag=1&foo=b%20c").0;
        let twice = strip_tag_params(&once).0;
        assert_eq!(once, twice);
    }

    #[test]
    fn preserves_remaining_order() {
        let (out, changed) = strip_tag_params("https://example.com/a?z=1&tag=x&a=2");
        assert!(changed);
        assert_eq!(out, "https://example.com/a?z=1&a=2");
    }

    #[test]
    fn keeps_fragment() {
        let (out, changed) = strip_tag_params("https://example.com/a?tag=1&k=v#section");
        assert!(changed);
        assert_eq!(out, "https://example.com/a?k=v#section");
    }

    #[test]
    fn valueless_tag_key_is_removed() {
        let (out, changed) = strip_tag_params("https://example.com/a?tag&k=v");
        assert!(changed);
        assert_eq!(out, "https://example.com/a?k=v");
    }
}
