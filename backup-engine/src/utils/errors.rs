//! Custom error types for the backup engine.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Source folder not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Source path is not a folder: {}", .0.display())]
    SourceNotADirectory(PathBuf),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path {} is not under {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Revision archive error: {0}")]
    Revision(String),
}

impl From<globset::Error> for EngineError {
    fn from(err: globset::Error) -> Self {
        EngineError::InvalidPattern {
            pattern: err.glob().unwrap_or_default().to_string(),
            reason: err.kind().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
