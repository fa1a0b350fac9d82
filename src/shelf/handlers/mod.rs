//! # File Format Handlers
//!
//! A handler translates between the bytes of one file and a [`Payload`], the
//! ordered field map that serde turns into a typed record (and back).
//!
//! The set of formats is closed: [`Format`] is an enum, chosen once when a
//! collection is opened. Each variant lives in its own module and only deals
//! with text; this module owns the file I/O so every format gets the same
//! guarantees:
//!
//! - the whole file is rendered in memory before anything touches disk;
//! - writes go to a hidden temp file next to the target and are renamed over
//!   it, so a failed write never leaves a half-written record behind;
//! - parent directories are created on demand.
//!
//! ## Formats
//!
//! | Format     | Canonical | Also recognized | Body field                  |
//! |------------|-----------|-----------------|-----------------------------|
//! | `Markdown` | `.md`     | `.markdown`     | text after the frontmatter  |
//! | `Json`     | `.json`   |                 | stored inline like any field|
//! | `Yaml`     | `.yaml`   | `.yml`          | stored inline like any field|

use crate::error::Result;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;
use uuid::Uuid;

mod json;
mod markdown;
mod yaml;

/// Field that receives the Markdown body when no body field is configured.
pub const DEFAULT_BODY_FIELD: &str = "content";

/// Generic interchange form between a file and a typed record.
///
/// Field order is the order in which fields were read or dumped.
pub type Payload = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Markdown,
    Json,
    Yaml,
}

impl Format {
    /// All formats, in registry order.
    pub const ALL: [Format; 3] = [Format::Markdown, Format::Json, Format::Yaml];

    pub fn name(&self) -> &'static str {
        match self {
            Format::Markdown => "markdown",
            Format::Json => "json",
            Format::Yaml => "yaml",
        }
    }

    /// Extension given to files this format creates.
    pub fn canonical_extension(&self) -> &'static str {
        self.extensions()[0]
    }

    /// Every extension this format reads, canonical first.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Format::Markdown => &[".md", ".markdown"],
            Format::Json => &[".json"],
            Format::Yaml => &[".yaml", ".yml"],
        }
    }

    /// Whether the path carries one of this format's extensions (case-insensitive).
    pub fn matches_path(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let dotted = format!(".{}", ext.to_ascii_lowercase());
        self.extensions().contains(&dotted.as_str())
    }

    /// Read a file into a payload.
    ///
    /// `body_field` only matters for Markdown, where it names the field that
    /// receives the text after the frontmatter.
    pub fn read(&self, path: &Path, body_field: Option<&str>) -> Result<Payload> {
        let text = fs::read_to_string(path)?;
        self.parse(&text, path, body_field)
    }

    /// Write a payload to a file, replacing it atomically.
    pub fn write(&self, path: &Path, payload: &Payload, body_field: Option<&str>) -> Result<()> {
        let rendered = self.render(payload, body_field)?;
        write_atomic(path, &rendered)?;
        tracing::debug!(path = %path.display(), format = self.name(), "wrote record");
        Ok(())
    }

    /// Parse file text. `path` is only used for error reporting.
    pub fn parse(&self, text: &str, path: &Path, body_field: Option<&str>) -> Result<Payload> {
        match self {
            Format::Markdown => {
                markdown::parse(text, path, body_field.unwrap_or(DEFAULT_BODY_FIELD))
            }
            Format::Json => json::parse(text, path),
            Format::Yaml => yaml::parse(text, path),
        }
    }

    /// Render a payload to the exact text that [`Format::write`] puts on disk.
    pub fn render(&self, payload: &Payload, body_field: Option<&str>) -> Result<String> {
        match self {
            Format::Markdown => {
                markdown::render(payload, body_field.unwrap_or(DEFAULT_BODY_FIELD))
            }
            Format::Json => json::render(payload),
            Format::Yaml => yaml::render(payload),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Format {
    type Err = crate::error::ShelfError;

    fn from_str(s: &str) -> Result<Self> {
        crate::registry::resolve(s)
    }
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = parent.join(format!(".shelf-{}.tmp", Uuid::new_v4().simple()));
    fs::write(&tmp_path, content)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}
