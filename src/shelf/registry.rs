//! Format registry.
//!
//! Maps user-facing format names and file extensions to a [`Format`]. This is
//! the single source of truth for naming: adding an alias means adding it to
//! [`FORMATS`].

use crate::error::{Result, ShelfError};
use crate::handlers::Format;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Names and extensions accepted for one format.
#[derive(Debug, Clone)]
pub struct FormatSpec {
    pub format: Format,
    /// Names accepted by [`resolve`], lowercase, without a leading dot.
    pub names: &'static [&'static str],
}

pub const FORMATS: &[FormatSpec] = &[
    FormatSpec {
        format: Format::Markdown,
        names: &["markdown", "md"],
    },
    FormatSpec {
        format: Format::Json,
        names: &["json"],
    },
    FormatSpec {
        format: Format::Yaml,
        names: &["yaml", "yml"],
    },
];

/// Resolve a declared format name.
///
/// Case-insensitive; a leading dot is accepted so extensions work too
/// (`"md"`, `".MD"`, `"Markdown"` all resolve to Markdown).
pub fn resolve(name: &str) -> Result<Format> {
    let normalized = name.trim().to_ascii_lowercase();
    let bare = normalized.strip_prefix('.').unwrap_or(&normalized);
    FORMATS
        .iter()
        .find(|spec| spec.names.contains(&bare))
        .map(|spec| spec.format)
        .ok_or_else(|| ShelfError::UnknownFormat(format!("unsupported format '{}'", name)))
}

/// Look up the format owning a file extension (with or without the dot).
pub fn for_extension(ext: &str) -> Option<Format> {
    let lower = ext.to_ascii_lowercase();
    let dotted = if lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    };
    Format::ALL
        .into_iter()
        .find(|format| format.extensions().contains(&dotted.as_str()))
}

/// How [`infer`] treats a directory with no files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inference {
    /// An empty directory is an error: the caller must name a format.
    Strict,
    /// An empty directory falls back to Markdown.
    Default,
}

/// Infer the format of a directory from the files it holds.
///
/// Every file must belong to a registered format, and all of them to the
/// same one.
pub fn infer(files: &[PathBuf], mode: Inference) -> Result<Format> {
    let mut seen = BTreeSet::new();
    let mut found = None;

    for path in files {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(for_extension)
            .ok_or_else(|| unsupported_file(path))?;

        seen.insert(format.name());
        if seen.len() > 1 {
            return Err(ShelfError::InconsistentFormat(format!(
                "multiple file formats detected ({}); pass a format explicitly",
                seen.into_iter().collect::<Vec<_>>().join(", ")
            )));
        }
        found = Some(format);
    }

    match (found, mode) {
        (Some(format), _) => {
            tracing::debug!(format = format.name(), files = files.len(), "inferred format");
            Ok(format)
        }
        (None, Inference::Default) => Ok(Format::Markdown),
        (None, Inference::Strict) => Err(ShelfError::UnknownFormat(
            "cannot infer format for an empty collection; pass a format explicitly".into(),
        )),
    }
}

fn unsupported_file(path: &Path) -> ShelfError {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_else(|| "(none)".into());
    ShelfError::UnknownFormat(format!(
        "cannot infer format: file '{}' has unsupported extension '{}'",
        name, ext
    ))
}
