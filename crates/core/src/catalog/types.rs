//! Types for the title catalog.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// One title directory as seen on disk or in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    /// Identity key; equals the on-disk directory name.
    pub folder_name: String,
    pub summary: String,
    pub cover_ref: String,
    /// Logical reference of the lexicographically first episode.
    pub primary_video_ref: String,
    pub episode_count: usize,
    pub physical_root_path: PathBuf,
    /// `None` when the title lives under the default root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosting_volume: Option<String>,
}

/// One playable episode of a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    pub logical_path: String,
    pub display_name: String,
    pub physical_path: PathBuf,
}

/// Result of an upsert by folder name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// What a delete request removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub folder_name: String,
    pub removed_dirs: Vec<PathBuf>,
    pub store_row_removed: bool,
}

/// Catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Title not found: {0}")]
    NotFound(String),

    /// Folder names must be a single path segment.
    #[error("Invalid folder name: {0:?}")]
    InvalidFolderName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Rejects names that would escape the library roots.
pub fn validate_folder_name(name: &str) -> Result<(), CatalogError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        Err(CatalogError::InvalidFolderName(name.to_string()))
    } else {
        Ok(())
    }
}
