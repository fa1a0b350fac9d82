//! File naming for new records.
//!
//! A record added without an explicit path is named after the first usable
//! string among its `slug`, `id`, `name` and `title` fields. Without one, it
//! gets a random token. Existing files are never overwritten: a numeric suffix
//! (`-1`, `-2`, ...) is appended to the stem until the name is free.

use crate::handlers::Payload;
use serde_json::Value;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Fields consulted for a file name, in priority order.
pub const NAME_FIELDS: [&str; 4] = ["slug", "id", "name", "title"];

const FALLBACK_SLUG: &str = "item";

/// Normalize a string into a filesystem-safe slug.
///
/// Lowercases, collapses every run of non-alphanumeric characters into one
/// hyphen and trims hyphens from both ends. A result with nothing left is
/// `"item"`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_hyphen = false;

    for c in value.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Pick the stem for a record's file from its payload.
pub fn stem_for(payload: &Payload) -> String {
    NAME_FIELDS
        .iter()
        .find_map(|field| match payload.get(*field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(slugify(s)),
            _ => None,
        })
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
}

/// First path of the form `dir/stem{ext}`, `dir/stem-1{ext}`, ... that does
/// not exist yet.
pub fn free_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let candidate = dir.join(format!("{}{}", stem, extension));
    if !candidate.exists() {
        return candidate;
    }

    let mut counter = 1u32;
    loop {
        let candidate = dir.join(format!("{}-{}{}", stem, counter, extension));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
