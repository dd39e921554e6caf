//! Re-encodes malformed segmented output at a constant frame rate.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::config::ProcessorConfig;
use super::pool::WorkerPool;
use super::types::RepairResult;
use crate::library::{
    list_subdirs, OutputRoot, MANIFEST_NAME, REPAIR_URL_PREFIX, SEGMENT_TEMPLATE,
};
use crate::progress::{EventKind, ProgressSender, RunSummary};
use crate::storage::VolumeAllocator;
use crate::transcoder::{RepairJob, Transcoder};

/// One episode with a playlist to re-encode.
#[derive(Debug, Clone)]
struct WorkItem {
    title: String,
    episode: String,
    episode_dir: PathBuf,
    source_manifest: PathBuf,
}

impl WorkItem {
    fn asset(&self) -> String {
        format!("{}/{}", self.title, self.episode)
    }

    /// Logical reference of the repaired playlist.
    fn repaired_url(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            REPAIR_URL_PREFIX, self.title, self.episode, MANIFEST_NAME
        )
    }
}

/// Walks every output root and rewrites each episode into the repair root.
///
/// The original episode directory is removed only after its replacement
/// was written.
#[derive(Clone)]
pub struct RepairProcessor {
    transcoder: Arc<dyn Transcoder>,
    allocator: Arc<VolumeAllocator>,
    output_dir: PathBuf,
    fallback_fps: u32,
    pool: WorkerPool,
}

impl RepairProcessor {
    pub fn new(
        config: &ProcessorConfig,
        transcoder: Arc<dyn Transcoder>,
        allocator: Arc<VolumeAllocator>,
        output_dir: impl Into<PathBuf>,
        fallback_fps: u32,
    ) -> Self {
        Self {
            transcoder,
            allocator,
            output_dir: output_dir.into(),
            fallback_fps,
            pool: WorkerPool::new(config.max_parallel_repair),
        }
    }

    /// Runs one repair pass, reporting through `events`.
    ///
    /// Cancelling `cancel` stops new items from starting; running re-encodes
    /// finish. Results are sorted by title and episode.
    pub async fn repair(
        &self,
        events: ProgressSender,
        cancel: CancellationToken,
    ) -> Vec<RepairResult> {
        let roots = self.allocator.output_roots();
        let (items, mut results) =
            match tokio::task::spawn_blocking(move || collect_work(&roots)).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(error = %e, "Failed to walk output roots");
                    (Vec::new(), Vec::new())
                }
            };

        let total = items.len() + results.len();
        info!(
            episodes = items.len(),
            missing = results.len(),
            "Repair pass started"
        );

        for result in &results {
            events.emit(EventKind::Error {
                asset: Some(result.asset()),
                message: result.message.clone(),
            });
        }

        let finished = Arc::new(AtomicUsize::new(results.len()));
        let mut workers = JoinSet::new();
        let mut cancelled = 0;

        for (index, item) in items.iter().cloned().enumerate() {
            let Some(permit) = self.pool.acquire(&cancel).await else {
                cancelled = total - results.len() - index;
                break;
            };

            let worker = self.clone();
            let events = events.clone();
            let finished = Arc::clone(&finished);
            let current = results.len() + index + 1;
            workers.spawn(async move {
                let _permit = permit;
                let result = worker.repair_item(&item, current, total, &events).await;
                let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
                events.emit(EventKind::OverallProgress {
                    current: done,
                    total,
                });
                result
            });
        }

        if cancelled > 0 {
            info!(cancelled, "Repair stopped, waiting for running items");
            events.emit(EventKind::Stop {
                message: format!("Repair stopped, {} item(s) not started", cancelled),
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(error = %e, "Repair worker failed");
                    results.push(RepairResult::failed(
                        "",
                        "",
                        format!("Worker task failed: {}", e),
                    ));
                }
            }
        }

        results.sort_by(|a, b| (&a.title, &a.episode).cmp(&(&b.title, &b.episode)));

        let success = results.iter().filter(|r| r.success).count();
        let summary = RunSummary {
            total: results.len(),
            success,
            failed: results.len() - success,
            skipped: 0,
            cancelled,
            errors: results
                .iter()
                .filter(|r| !r.success)
                .map(|r| format!("{}: {}", r.asset(), r.message))
                .collect(),
        };
        info!(
            total = summary.total,
            success = summary.success,
            failed = summary.failed,
            cancelled,
            "Repair pass complete"
        );
        events.deliver(EventKind::Complete(summary)).await;

        results
    }

    async fn repair_item(
        &self,
        item: &WorkItem,
        current: usize,
        total: usize,
        events: &ProgressSender,
    ) -> RepairResult {
        let asset = item.asset();
        events.emit(EventKind::Progress {
            asset: asset.clone(),
            current,
            total,
        });

        let fps = match self.transcoder.probe_frame_rate(&item.source_manifest).await {
            Ok(fps) => {
                events.emit(EventKind::Info {
                    asset: asset.clone(),
                    message: format!("Detected frame rate: {} fps", fps),
                });
                fps
            }
            Err(e) => {
                warn!(asset = %asset, error = %e, fallback = self.fallback_fps, "Frame rate probe failed");
                events.emit(EventKind::Warning {
                    asset: asset.clone(),
                    message: format!(
                        "Frame rate probe failed ({}), using {} fps",
                        e, self.fallback_fps
                    ),
                });
                self.fallback_fps
            }
        };

        let output_dir = self.output_dir.join(&item.title).join(&item.episode);
        let job = RepairJob {
            title: item.title.clone(),
            episode: item.episode.clone(),
            source_manifest: item.source_manifest.clone(),
            output_manifest: output_dir.join(MANIFEST_NAME),
            output_dir,
            segment_template: SEGMENT_TEMPLATE.to_string(),
            fps,
        };

        match self.transcoder.repair(&job).await {
            Ok(outcome) => {
                match tokio::fs::remove_dir_all(&item.episode_dir).await {
                    Ok(()) => {
                        events.emit(EventKind::Info {
                            asset: asset.clone(),
                            message: "Original output deleted".to_string(),
                        });
                    }
                    Err(e) => {
                        warn!(path = %item.episode_dir.display(), error = %e, "Failed to delete repaired original");
                        events.emit(EventKind::Warning {
                            asset: asset.clone(),
                            message: format!("Repaired, but the original could not be deleted: {}", e),
                        });
                    }
                }

                info!(
                    asset = %asset,
                    fps,
                    manifest = %outcome.manifest_path.display(),
                    duration_ms = outcome.duration_ms,
                    "Episode repaired"
                );
                events.emit(EventKind::Success {
                    asset,
                    output: Some(item.repaired_url()),
                });
                RepairResult::ok(&item.title, &item.episode, format!("Repaired at {} fps", fps))
            }
            Err(e) => {
                let message = e.detail();
                warn!(asset = %asset, error = %e, "Repair failed, original kept");
                events.emit(EventKind::Error {
                    asset: Some(asset),
                    message: message.clone(),
                });
                RepairResult::failed(&item.title, &item.episode, message)
            }
        }
    }
}

/// Two-level walk of every root. Episodes without a playlist become failed
/// results directly.
fn collect_work(roots: &[OutputRoot]) -> (Vec<WorkItem>, Vec<RepairResult>) {
    let mut items = Vec::new();
    let mut missing = Vec::new();

    for root in roots {
        let titles = match list_subdirs(root.path()) {
            Ok(titles) => titles,
            Err(e) => {
                warn!(root = %root.path().display(), error = %e, "Failed to read output root");
                continue;
            }
        };

        for title in titles {
            let title_dir = root.title_dir(&title);
            let episodes = match list_subdirs(&title_dir) {
                Ok(episodes) => episodes,
                Err(e) => {
                    warn!(path = %title_dir.display(), error = %e, "Failed to read title directory");
                    continue;
                }
            };

            for episode in episodes {
                let episode_dir = title_dir.join(&episode);
                let source_manifest = episode_dir.join(MANIFEST_NAME);
                if source_manifest.is_file() {
                    items.push(WorkItem {
                        title: title.clone(),
                        episode,
                        episode_dir,
                        source_manifest,
                    });
                } else {
                    missing.push(RepairResult::failed(&title, episode, "manifest missing"));
                }
            }
        }
    }

    (items, missing)
}
