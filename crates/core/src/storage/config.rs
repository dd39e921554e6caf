//! Configuration for the storage module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a new title is assigned to a volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementStrategy {
    /// Enabled volume with the smallest measured usage; ties go to the
    /// earliest configured volume.
    #[default]
    LeastUsed,
    /// Cycles through enabled volumes in configuration order.
    RoundRobin,
    /// Uniformly random enabled volume.
    Random,
    /// `default_volume` when it is enabled, else the first enabled volume.
    FirstAvailable,
}

impl std::fmt::Display for PlacementStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PlacementStrategy::LeastUsed => "least-used",
            PlacementStrategy::RoundRobin => "round-robin",
            PlacementStrategy::Random => "random",
            PlacementStrategy::FirstAvailable => "first-available",
        };
        f.write_str(name)
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Preferred volume for the `first-available` strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_volume: Option<String>,

    #[serde(default)]
    pub strategy: PlacementStrategy,

    /// Volumes in configuration order. Order matters for tie-breaks.
    #[serde(default)]
    pub volumes: Vec<VolumeConfig>,
}

/// One `[[storage.volumes]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub name: String,
    pub path: PathBuf,
    /// Advisory capacity; never enforced at placement time.
    #[serde(default)]
    pub max_size_gb: u64,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl StorageConfig {
    /// Adds a volume.
    pub fn with_volume(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.volumes.push(VolumeConfig {
            name: name.into(),
            path: path.into(),
            max_size_gb: 0,
            priority: 0,
            enabled: true,
        });
        self
    }

    /// Sets the placement strategy.
    pub fn with_strategy(mut self, strategy: PlacementStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the preferred volume.
    pub fn with_default_volume(mut self, name: impl Into<String>) -> Self {
        self.default_volume = Some(name.into());
        self
    }
}
