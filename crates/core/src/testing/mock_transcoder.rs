//! Mock transcoder for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::transcoder::{
    Acceleration, RepairJob, SegmentJob, TranscodeError, TranscodeOutcome, Transcoder,
};

/// A recorded transcoder call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Segment { job: SegmentJob, success: bool },
    Probe { path: PathBuf },
    Repair { job: RepairJob, success: bool },
}

/// Mock implementation of the Transcoder trait.
///
/// Provides controllable behavior for testing:
/// - Track every call for assertions
/// - Fail segmenting for assets matching a pattern
/// - Fail hardware attempts only, so the software fallback runs
/// - Control probe results
/// - Simulate slow runs
///
/// Successful runs write a playlist at the requested location so scans and
/// skip checks see real output.
///
/// # Example
///
/// ```rust,ignore
/// use reelhouse_core::testing::MockTranscoder;
///
/// let transcoder = MockTranscoder::new();
/// transcoder.fail_assets_matching("ep2").await;
///
/// // ... run a batch ...
///
/// assert_eq!(transcoder.segment_jobs().await.len(), 3);
/// ```
#[derive(Debug)]
pub struct MockTranscoder {
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    failing_assets: Arc<RwLock<Vec<String>>>,
    failing_repairs: Arc<RwLock<Vec<String>>>,
    fail_hardware: Arc<RwLock<bool>>,
    probe_results: Arc<RwLock<HashMap<PathBuf, u32>>>,
    /// `None` makes unknown paths fail to probe.
    default_fps: Arc<RwLock<Option<u32>>>,
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscoder {
    /// Create a new mock transcoder where every call succeeds.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            failing_assets: Arc::new(RwLock::new(Vec::new())),
            failing_repairs: Arc::new(RwLock::new(Vec::new())),
            fail_hardware: Arc::new(RwLock::new(false)),
            probe_results: Arc::new(RwLock::new(HashMap::new())),
            default_fps: Arc::new(RwLock::new(Some(24))),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Segment jobs in call order, both acceleration attempts included.
    pub async fn segment_jobs(&self) -> Vec<SegmentJob> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Segment { job, .. } => Some(job.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn repair_jobs(&self) -> Vec<RepairJob> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Repair { job, .. } => Some(job.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of subprocess runs that would have happened.
    pub async fn invocation_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Segmenting fails for every asset containing `pattern`.
    pub async fn fail_assets_matching(&self, pattern: impl Into<String>) {
        self.failing_assets.write().await.push(pattern.into());
    }

    /// Repair fails for every `title/episode` containing `pattern`.
    pub async fn fail_repairs_matching(&self, pattern: impl Into<String>) {
        self.failing_repairs.write().await.push(pattern.into());
    }

    /// Make hardware-accelerated attempts fail.
    pub async fn set_fail_hardware(&self, fail: bool) {
        *self.fail_hardware.write().await = fail;
    }

    /// Set the probed frame rate for a specific playlist.
    pub async fn set_probe_result(&self, path: impl AsRef<Path>, fps: u32) {
        self.probe_results
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), fps);
    }

    /// Frame rate for paths without a specific result; `None` fails the probe.
    pub async fn set_default_fps(&self, fps: Option<u32>) {
        *self.default_fps.write().await = fps;
    }

    /// Set the simulated duration of every segment and repair run.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    async fn simulate_run(&self) {
        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    async fn write_manifest(path: &Path) -> Result<(), TranscodeError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, "#EXTM3U\n#EXT-X-ENDLIST\n").await?;
        Ok(())
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn segment(&self, job: &SegmentJob) -> Result<TranscodeOutcome, TranscodeError> {
        self.simulate_run().await;

        let asset_fails = self
            .failing_assets
            .read()
            .await
            .iter()
            .any(|pattern| job.asset.contains(pattern.as_str()));
        let hardware_fails =
            job.acceleration == Acceleration::Hardware && *self.fail_hardware.read().await;

        let result = if asset_fails || hardware_fails {
            Err(TranscodeError::failed(
                format!("mock ffmpeg exited with status 1 for {}", job.asset),
                Some("Invalid data found when processing input".to_string()),
            ))
        } else {
            Self::write_manifest(&job.manifest_path)
                .await
                .map(|_| TranscodeOutcome {
                    manifest_path: job.manifest_path.clone(),
                    duration_ms: 1,
                })
        };

        self.calls.write().await.push(RecordedCall::Segment {
            job: job.clone(),
            success: result.is_ok(),
        });
        result
    }

    async fn probe_frame_rate(&self, path: &Path) -> Result<u32, TranscodeError> {
        self.calls.write().await.push(RecordedCall::Probe {
            path: path.to_path_buf(),
        });

        if let Some(fps) = self.probe_results.read().await.get(path) {
            return Ok(*fps);
        }
        match *self.default_fps.read().await {
            Some(fps) => Ok(fps),
            None => Err(TranscodeError::InvalidFrameRate {
                value: "0/0".to_string(),
            }),
        }
    }

    async fn repair(&self, job: &RepairJob) -> Result<TranscodeOutcome, TranscodeError> {
        self.simulate_run().await;

        let asset = format!("{}/{}", job.title, job.episode);
        let fails = self
            .failing_repairs
            .read()
            .await
            .iter()
            .any(|pattern| asset.contains(pattern.as_str()));

        let result = if fails {
            Err(TranscodeError::failed(
                format!("mock ffmpeg exited with status 1 for {}", asset),
                None,
            ))
        } else {
            Self::write_manifest(&job.output_manifest)
                .await
                .map(|_| TranscodeOutcome {
                    manifest_path: job.output_manifest.clone(),
                    duration_ms: 1,
                })
        };

        self.calls.write().await.push(RecordedCall::Repair {
            job: job.clone(),
            success: result.is_ok(),
        });
        result
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        Ok(())
    }
}
