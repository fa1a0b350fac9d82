use super::Payload;
use crate::error::{Result, ShelfError};
use serde_json::Value;
use std::path::Path;

/// Parse a YAML document that must be a mapping.
///
/// An empty (or null) document is an empty mapping. Markdown frontmatter goes
/// through here too.
pub(super) fn parse(text: &str, path: &Path) -> Result<Payload> {
    if text.trim().is_empty() {
        return Ok(Payload::new());
    }
    let value: Value =
        serde_yaml::from_str(text).map_err(|e| ShelfError::parse(path, e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Payload::new()),
        _ => Err(ShelfError::parse(path, "YAML document is not a mapping")),
    }
}

/// Block style, keys in payload order.
pub(super) fn render(payload: &Payload) -> Result<String> {
    Ok(serde_yaml::to_string(payload)?)
}
