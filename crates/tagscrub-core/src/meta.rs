//! Partner metadata rewrite: cleans the attachment-URL list inside the
//! `meta` JSON document while leaving everything else in the document alone.

use serde_json::Value;

use crate::url_clean::strip_tag_params;

/// JSON field holding the ordered list of attachment URLs.
pub const ATTACH_FILES_KEY: &str = "partner_pos_attach_files";

/// Outcome of rewriting one partner meta document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaRewrite {
    /// Nothing usable: unparsable document or no attachment list.
    Skip(SkipReason),
    /// Attachment list present but no entry needed cleaning.
    Unchanged,
    /// At least one entry was cleaned; the full re-serialized document.
    Changed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not valid JSON, or the root is not an object.
    InvalidJson,
    /// The attachment-list field is absent, not an array, or empty.
    NoAttachList,
}

/// Rewrites the attachment-URL list inside a partner meta JSON document.
///
/// String entries run through [`strip_tag_params`]; non-string entries and
/// unchanged strings pass through in their original positions. All other
/// keys of the document are carried over verbatim from the parsed value.
///
/// `Err` is only possible from re-serialization and is a row-level failure
/// for the caller; a document that cannot be parsed is a [`MetaRewrite::Skip`].
pub fn rewrite_attach_files(raw_meta: &str) -> Result<MetaRewrite, serde_json::Error> {
    let mut doc: Value = match serde_json::from_str(raw_meta) {
        Ok(v) => v,
        Err(_) => return Ok(MetaRewrite::Skip(SkipReason::InvalidJson)),
    };
    if !doc.is_object() {
        return Ok(MetaRewrite::Skip(SkipReason::InvalidJson));
    }

    let Some(files) = doc
        .get_mut(ATTACH_FILES_KEY)
        .and_then(Value::as_array_mut)
    else {
        return Ok(MetaRewrite::Skip(SkipReason::NoAttachList));
    };
    if files.is_empty() {
        return Ok(MetaRewrite::Skip(SkipReason::NoAttachList));
    }

    let mut changed = false;
    for entry in files.iter_mut() {
        if let Value::String(s) = entry {
            let (cleaned, modified) = strip_tag_params(s);
            if modified {
                *s = cleaned;
                changed = true;
            }
        }
    }

    if !changed {
        return Ok(MetaRewrite::Unchanged);
    }
    Ok(MetaRewrite::Changed(serde_json::to_string(&doc)?))
}
