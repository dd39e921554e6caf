//! Error types for the storage module.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Usage walk failed below a volume root.
    #[error("Failed to measure usage of {path}: {reason}")]
    MeasureFailed { path: PathBuf, reason: String },

    #[error("Background task failed: {0}")]
    Task(String),
}
