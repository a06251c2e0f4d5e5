//! URL cleanup primitives: tag-parameter removal and archive-prefix rewrite.
//!
//! Both functions are pure and never fail: input that does not parse as a
//! URL is passed through unchanged.

mod normalize;
mod sanitize;

pub use normalize::normalize_archive_url;
pub use sanitize::strip_tag_params;
