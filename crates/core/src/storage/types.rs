//! Volume state owned by the allocator.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use super::config::VolumeConfig;
use crate::library::OutputRoot;

const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// A configured storage root and its last measured usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Volume {
    pub name: String,
    pub root_path: PathBuf,
    pub capacity_bytes: u64,
    pub priority: i32,
    pub enabled: bool,
    /// Sum of file sizes under `root_path` at `last_measured`.
    pub used_bytes: u64,
    pub last_measured: Option<DateTime<Utc>>,
}

impl Volume {
    pub fn output_root(&self) -> OutputRoot {
        OutputRoot::Volume {
            name: self.name.clone(),
            path: self.root_path.clone(),
        }
    }

    pub fn used_gb(&self) -> f64 {
        self.used_bytes as f64 / BYTES_PER_GB as f64
    }
}

impl From<&VolumeConfig> for Volume {
    fn from(config: &VolumeConfig) -> Self {
        Self {
            name: config.name.clone(),
            root_path: config.path.clone(),
            capacity_bytes: config.max_size_gb.saturating_mul(BYTES_PER_GB),
            priority: config.priority,
            enabled: config.enabled,
            used_bytes: 0,
            last_measured: None,
        }
    }
}
