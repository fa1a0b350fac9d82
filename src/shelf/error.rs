use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("Inconsistent format: {0}")]
    InconsistentFormat(String),

    #[error("Missing path: {0}")]
    MissingPath(String),

    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ShelfError {
    pub(crate) fn parse(path: &std::path::Path, message: impl Into<String>) -> Self {
        ShelfError::Parse {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShelfError>;
