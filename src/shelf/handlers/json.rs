use super::Payload;
use crate::error::{Result, ShelfError};
use serde_json::Value;
use std::path::Path;

pub(super) fn parse(text: &str, path: &Path) -> Result<Payload> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ShelfError::parse(path, e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ShelfError::parse(
            path,
            format!("JSON document is not an object (found {})", kind(&other)),
        )),
    }
}

/// Two-space indented, one trailing newline.
pub(super) fn render(payload: &Payload) -> Result<String> {
    let mut out = serde_json::to_string_pretty(payload)?;
    out.push('\n');
    Ok(out)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
