use crate::error::{Result, ShelfError};
use crate::handlers::Format;
use crate::registry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Options for opening a [`Collection`](crate::Collection).
///
/// Serializable so applications can embed it in their own settings, or keep
/// it in a standalone JSON file (see [`CollectionConfig::load`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CollectionConfig {
    /// Format name ("markdown", "json", "yaml", or an alias). Inferred from
    /// the directory's files when absent.
    pub format: Option<String>,

    /// Field that receives a Markdown file's body (defaults to "content").
    pub body_field: Option<String>,

    /// Scan sub-directories too.
    pub recursive: bool,
}

impl CollectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_body_field(mut self, field: impl Into<String>) -> Self {
        self.body_field = Some(field.into());
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// The declared format, if any, resolved through the registry.
    pub fn resolved_format(&self) -> Result<Option<Format>> {
        self.format.as_deref().map(registry::resolve).transpose()
    }

    /// Load a config file, or return defaults if it does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: CollectionConfig = serde_json::from_str(&content)
            .map_err(|e| ShelfError::parse(path, e.to_string()))?;
        Ok(config)
    }

    /// Save as pretty JSON, creating parent directories as needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
