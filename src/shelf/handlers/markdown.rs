//! Markdown with YAML frontmatter.
//!
//! ```text
//! ---
//! title: First
//! date: 2024-01-01
//! ---
//!
//! Body text, stored under the body field.
//! ```
//!
//! A file that does not open with a `---` line, or never closes it, has no
//! fields: the whole text is the body.

use super::{yaml, Payload};
use crate::error::Result;
use serde_json::Value;
use std::path::Path;

const DELIMITER: &str = "---";

pub(super) fn parse(text: &str, path: &Path, body_field: &str) -> Result<Payload> {
    let mut payload = Payload::new();
    let body = match split_frontmatter(text) {
        Some((raw, body)) => {
            payload = yaml::parse(raw, path)?;
            body.trim_end()
        }
        None => text,
    };
    payload.insert(body_field.to_string(), Value::String(body.to_string()));
    Ok(payload)
}

pub(super) fn render(payload: &Payload, body_field: &str) -> Result<String> {
    let meta: Payload = payload
        .iter()
        .filter(|(key, _)| key.as_str() != body_field)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let body = match payload.get(body_field) {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    };

    let frontmatter = yaml::render(&meta)?;
    let rendered = format!(
        "{DELIMITER}\n{}\n{DELIMITER}\n\n{}",
        frontmatter.trim(),
        body
    );
    Ok(format!("{}\n", rendered.trim_end()))
}

/// Split into (frontmatter, body). The body starts after the closing
/// delimiter line and one blank separator line, if present.
fn split_frontmatter(text: &str) -> Option<(&str, &str)> {
    let (first, rest) = text.split_once('\n')?;
    if first.trim_end() != DELIMITER {
        return None;
    }

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            let raw = &rest[..offset];
            let after = &rest[offset + line.len()..];
            let body = after
                .strip_prefix("\r\n")
                .or_else(|| after.strip_prefix('\n'))
                .unwrap_or(after);
            return Some((raw, body));
        }
        offset += line.len();
    }
    None
}
