//! Volume selection and usage tracking.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::config::{PlacementStrategy, StorageConfig};
use super::error::StorageError;
use super::types::Volume;
use crate::library::OutputRoot;

/// Owns the configured volumes and answers placement queries.
///
/// Volume state and the round-robin cursor sit behind one mutex; selection
/// and usage updates are serialized, reads take a snapshot.
pub struct VolumeAllocator {
    strategy: PlacementStrategy,
    default_volume: Option<String>,
    default_root: PathBuf,
    state: Mutex<AllocatorState>,
}

struct AllocatorState {
    volumes: Vec<Volume>,
    cursor: usize,
}

impl VolumeAllocator {
    /// Builds an allocator. Usage starts at zero until [`refresh_usage`]
    /// runs.
    ///
    /// [`refresh_usage`]: Self::refresh_usage
    pub fn new(config: &StorageConfig, default_root: impl Into<PathBuf>) -> Self {
        let volumes: Vec<Volume> = config.volumes.iter().map(Volume::from).collect();
        info!(
            volumes = volumes.len(),
            enabled = volumes.iter().filter(|v| v.enabled).count(),
            strategy = %config.strategy,
            "Storage allocator initialized"
        );
        Self {
            strategy: config.strategy,
            default_volume: config.default_volume.clone(),
            default_root: default_root.into(),
            state: Mutex::new(AllocatorState { volumes, cursor: 0 }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AllocatorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn strategy(&self) -> PlacementStrategy {
        self.strategy
    }

    /// The default (legacy) output root.
    pub fn default_root(&self) -> OutputRoot {
        OutputRoot::Default {
            path: self.default_root.clone(),
        }
    }

    /// Snapshot of every configured volume, enabled or not.
    pub fn volumes(&self) -> Vec<Volume> {
        self.lock().volumes.clone()
    }

    pub fn enabled_volumes(&self) -> Vec<Volume> {
        self.lock()
            .volumes
            .iter()
            .filter(|v| v.enabled)
            .cloned()
            .collect()
    }

    /// Picks a volume for a new title under the configured strategy.
    ///
    /// Returns `None` when no volume is enabled; callers then use the
    /// default root. Capacity is not consulted.
    pub fn resolve_volume_for(&self, title: &str) -> Option<Volume> {
        let mut state = self.lock();
        let enabled: Vec<usize> = state
            .volumes
            .iter()
            .enumerate()
            .filter(|(_, v)| v.enabled)
            .map(|(i, _)| i)
            .collect();

        if enabled.is_empty() {
            warn!(title = %title, "No enabled storage volume, using default root");
            return None;
        }

        let index = match self.strategy {
            PlacementStrategy::LeastUsed => {
                let mut best = enabled[0];
                for &i in &enabled[1..] {
                    if state.volumes[i].used_bytes < state.volumes[best].used_bytes {
                        best = i;
                    }
                }
                best
            }
            PlacementStrategy::RoundRobin => {
                let slot = state.cursor % enabled.len();
                state.cursor = (slot + 1) % enabled.len();
                enabled[slot]
            }
            PlacementStrategy::Random => enabled[rand::rng().random_range(0..enabled.len())],
            PlacementStrategy::FirstAvailable => self
                .default_volume
                .as_deref()
                .and_then(|name| enabled.iter().copied().find(|&i| state.volumes[i].name == name))
                .unwrap_or(enabled[0]),
        };

        let volume = state.volumes[index].clone();
        info!(
            title = %title,
            volume = %volume.name,
            used_gb = volume.used_gb(),
            "Selected storage volume"
        );
        Some(volume)
    }

    pub fn volume_by_name(&self, name: &str) -> Option<Volume> {
        self.lock().volumes.iter().find(|v| v.name == name).cloned()
    }

    /// First enabled volume that already holds a directory for `title`.
    pub fn find_volume_containing(&self, title: &str) -> Option<Volume> {
        self.enabled_volumes()
            .into_iter()
            .find(|v| v.root_path.join(title).exists())
    }

    /// Output root for a title: the volume already hosting it, else a fresh
    /// placement, else the default root.
    pub fn output_root_for(&self, title: &str) -> OutputRoot {
        if let Some(volume) = self.find_volume_containing(title) {
            return volume.output_root();
        }
        match self.resolve_volume_for(title) {
            Some(volume) => volume.output_root(),
            None => self.default_root(),
        }
    }

    pub fn output_dir_for(&self, title: &str) -> PathBuf {
        self.output_root_for(title).title_dir(title)
    }

    pub fn output_url_for(&self, title: &str) -> String {
        self.output_root_for(title).url(&[title])
    }

    /// Every root holding catalog output: the enabled volumes, or the
    /// default root when none is enabled.
    pub fn output_roots(&self) -> Vec<OutputRoot> {
        let roots: Vec<OutputRoot> = self
            .enabled_volumes()
            .iter()
            .map(Volume::output_root)
            .collect();
        if roots.is_empty() {
            vec![self.default_root()]
        } else {
            roots
        }
    }

    /// Recomputes `used_bytes` of every volume with a full recursive walk.
    ///
    /// A volume whose walk fails reports zero usage.
    pub async fn refresh_usage(&self) -> Result<Vec<Volume>, StorageError> {
        let targets: Vec<(String, PathBuf)> = self
            .lock()
            .volumes
            .iter()
            .map(|v| (v.name.clone(), v.root_path.clone()))
            .collect();

        let measured = tokio::task::spawn_blocking(move || {
            targets
                .into_iter()
                .map(|(name, path)| {
                    let used = measure_dir(&path).unwrap_or_else(|e| {
                        warn!(volume = %name, error = %e, "Usage measurement failed");
                        0
                    });
                    (name, used)
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?;

        let now = Utc::now();
        let mut state = self.lock();
        for (name, used) in measured {
            if let Some(volume) = state.volumes.iter_mut().find(|v| v.name == name) {
                volume.used_bytes = used;
                volume.last_measured = Some(now);
                debug!(
                    volume = %volume.name,
                    used_gb = volume.used_gb(),
                    "Volume usage refreshed"
                );
            }
        }
        Ok(state.volumes.clone())
    }
}

/// Total size of the regular files below `path`.
pub fn measure_dir(path: &Path) -> Result<u64, StorageError> {
    let mut total = 0u64;
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(|e| StorageError::MeasureFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if entry.file_type().is_file() {
            let metadata = entry.metadata().map_err(|e| StorageError::MeasureFailed {
                path: entry.path().to_path_buf(),
                reason: e.to_string(),
            })?;
            total += metadata.len();
        }
    }
    Ok(total)
}
