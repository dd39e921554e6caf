//! Batch segmenting of raw uploads.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::ProcessorConfig;
use super::error::ProcessorError;
use super::pool::WorkerPool;
use crate::catalog::CatalogReconciler;
use crate::config::LibraryConfig;
use crate::jobs::{JobId, JobInfo, JobRegistry};
use crate::library::{
    resolve_source_path, AssetRef, CoverRelocator, ManifestRef, OutputRoot, OutputTarget,
    SEGMENT_TEMPLATE,
};
use crate::progress::{progress_channel, EventKind, ProgressSender, ProgressStream, RunSummary};
use crate::storage::VolumeAllocator;
use crate::transcoder::{Acceleration, SegmentJob, Transcoder};

enum ItemOutcome {
    Success { title: String },
    Failed(String),
}

/// Runs submitted batches on a worker pool shared by every batch.
///
/// Each batch is registered under a [`JobId`] for its lifetime and reports
/// through its own [`ProgressStream`]. The job registry and the cover
/// relocator are process-wide and handed in by the caller.
#[derive(Clone)]
pub struct BatchProcessor {
    transcoder: Arc<dyn Transcoder>,
    allocator: Arc<VolumeAllocator>,
    catalog: Arc<CatalogReconciler>,
    registry: Arc<JobRegistry>,
    covers: Arc<CoverRelocator>,
    library: Arc<LibraryConfig>,
    preserve_originals: bool,
    event_buffer: usize,
    pool: WorkerPool,
}

impl BatchProcessor {
    pub fn new(
        config: &ProcessorConfig,
        transcoder: Arc<dyn Transcoder>,
        allocator: Arc<VolumeAllocator>,
        catalog: Arc<CatalogReconciler>,
        registry: Arc<JobRegistry>,
        covers: Arc<CoverRelocator>,
        library: LibraryConfig,
    ) -> Self {
        Self {
            transcoder,
            allocator,
            catalog,
            registry,
            covers,
            library: Arc::new(library),
            preserve_originals: false,
            event_buffer: config.event_buffer,
            pool: WorkerPool::new(config.max_parallel_batch),
        }
    }

    /// Keep raw `.mp4` sources after they were segmented.
    pub fn with_preserve_originals(mut self, preserve: bool) -> Self {
        self.preserve_originals = preserve;
        self
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Live batches, oldest first.
    pub fn jobs(&self) -> Vec<JobInfo> {
        self.registry.list()
    }

    /// Starts a batch in the background and returns its id and event stream.
    ///
    /// The stream ends after the `complete` event. Dropping it does not stop
    /// the batch.
    pub fn submit_batch(
        &self,
        assets: Vec<String>,
        use_acceleration: bool,
    ) -> Result<(JobId, ProgressStream), ProcessorError> {
        if assets.is_empty() {
            return Err(ProcessorError::EmptyBatch);
        }

        let (job_id, cancel) = self.registry.register();
        let (events, stream) = progress_channel(self.event_buffer);
        info!(
            job_id = %job_id,
            assets = assets.len(),
            use_acceleration,
            "Batch submitted"
        );

        let processor = self.clone();
        tokio::spawn(async move {
            processor
                .run_batch(job_id, assets, use_acceleration, events, cancel)
                .await;
        });

        Ok((job_id, stream))
    }

    /// Stops a live batch. Items already running finish normally.
    pub fn request_stop(&self, job_id: JobId) -> Result<(), ProcessorError> {
        self.registry.request_stop(job_id)?;
        Ok(())
    }

    async fn run_batch(
        &self,
        job_id: JobId,
        assets: Vec<String>,
        use_acceleration: bool,
        events: ProgressSender,
        cancel: CancellationToken,
    ) -> RunSummary {
        let submitted = assets.len();
        let mut summary = RunSummary::default();
        let mut workers = JoinSet::new();
        let mut stopped = false;
        // One placement per title for the whole batch
        let mut placements: HashMap<String, OutputRoot> = HashMap::new();

        for (index, raw) in assets.into_iter().enumerate() {
            if cancel.is_cancelled() {
                summary.cancelled = submitted - index;
                stopped = true;
                break;
            }

            if let Some(manifest) = ManifestRef::parse(&raw) {
                match self.segmented_output(&manifest) {
                    Some(target) => {
                        debug!(job_id = %job_id, asset = %raw, "Already segmented, skipping");
                        events.emit(EventKind::Skipped {
                            asset: raw,
                            message: format!("Output already exists at {}", target.manifest_url),
                        });
                        summary.skipped += 1;
                    }
                    None => {
                        let message = format!("No segmented output at {}", raw);
                        warn!(job_id = %job_id, asset = %raw, "Manifest reference does not resolve");
                        events.emit(EventKind::Error {
                            asset: Some(raw),
                            message: message.clone(),
                        });
                        summary.failed += 1;
                        summary.errors.push(message);
                    }
                }
                continue;
            }

            let Some(asset) = AssetRef::parse(&raw) else {
                let message = format!("Cannot derive title and episode from {}", raw);
                warn!(job_id = %job_id, asset = %raw, "Rejected batch asset");
                events.emit(EventKind::Error {
                    asset: Some(raw),
                    message: message.clone(),
                });
                summary.failed += 1;
                summary.errors.push(message);
                continue;
            };

            if let Some(existing) = self.existing_output(&asset) {
                debug!(job_id = %job_id, asset = %asset.logical, "Output exists, skipping");
                events.emit(EventKind::Skipped {
                    asset: raw,
                    message: format!("Output already exists at {}", existing.manifest_url),
                });
                summary.skipped += 1;
                continue;
            }

            let Some(permit) = self.pool.acquire(&cancel).await else {
                summary.cancelled = submitted - index;
                stopped = true;
                break;
            };

            let root = placements
                .entry(asset.title.clone())
                .or_insert_with(|| self.allocator.output_root_for(&asset.title))
                .clone();
            let worker = self.clone();
            let events = events.clone();
            let current = index + 1;
            workers.spawn(async move {
                let _permit = permit;
                worker
                    .process_asset(asset, root, current, submitted, use_acceleration, &events)
                    .await
            });
        }

        if stopped {
            info!(
                job_id = %job_id,
                cancelled = summary.cancelled,
                "Batch stopped, waiting for running items"
            );
            events.emit(EventKind::Stop {
                message: format!(
                    "Batch stopped, {} item(s) not started",
                    summary.cancelled
                ),
            });
        }

        let mut touched = BTreeSet::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(ItemOutcome::Success { title }) => {
                    summary.success += 1;
                    touched.insert(title);
                }
                Ok(ItemOutcome::Failed(message)) => {
                    summary.failed += 1;
                    summary.errors.push(message);
                }
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "Batch worker failed");
                    summary.failed += 1;
                    summary.errors.push(format!("Worker task failed: {}", e));
                }
            }
        }

        summary.total = summary.success + summary.failed + summary.skipped;
        info!(
            job_id = %job_id,
            total = summary.total,
            success = summary.success,
            failed = summary.failed,
            skipped = summary.skipped,
            cancelled = summary.cancelled,
            "Batch complete"
        );

        events.deliver(EventKind::Complete(summary.clone())).await;
        self.registry.complete(job_id);
        drop(events);

        if !touched.is_empty() {
            let titles: Vec<String> = touched.into_iter().collect();
            self.catalog.scan_subset(&titles).await;
        }

        summary
    }

    /// Output of an earlier run on any root.
    fn existing_output(&self, asset: &AssetRef) -> Option<OutputTarget> {
        self.allocator
            .output_roots()
            .into_iter()
            .chain(std::iter::once(self.allocator.default_root()))
            .map(|root| root.target(&asset.title, &asset.episode))
            .find(|target| target.manifest.is_file())
    }

    /// The existing output a manifest reference points at, if any.
    fn segmented_output(&self, manifest: &ManifestRef) -> Option<OutputTarget> {
        let root = match &manifest.volume {
            None => self.allocator.default_root(),
            Some(name) => self.allocator.volume_by_name(name)?.output_root(),
        };
        Some(root.target(&manifest.title, &manifest.episode))
            .filter(|target| target.manifest.is_file())
    }

    async fn process_asset(
        &self,
        asset: AssetRef,
        root: OutputRoot,
        current: usize,
        total: usize,
        use_acceleration: bool,
        events: &ProgressSender,
    ) -> ItemOutcome {
        events.emit(EventKind::Progress {
            asset: asset.logical.clone(),
            current,
            total,
        });

        let target = root.target(&asset.title, &asset.episode);
        let input_path = resolve_source_path(&asset.logical, &self.library.raw_dir, |name| {
            self.allocator.volume_by_name(name).map(|v| v.root_path)
        });

        let mut job = SegmentJob {
            asset: asset.logical.clone(),
            input_path,
            output_dir: target.episode_dir.clone(),
            manifest_path: target.manifest.clone(),
            segment_template: SEGMENT_TEMPLATE.to_string(),
            acceleration: if use_acceleration {
                Acceleration::Hardware
            } else {
                Acceleration::Software
            },
        };

        let mut result = self.transcoder.segment(&job).await;
        let fall_back = match (&result, job.acceleration) {
            (Err(e), Acceleration::Hardware) => {
                warn!(asset = %asset.logical, error = %e, "Hardware attempt failed, retrying in software");
                events.emit(EventKind::Warning {
                    asset: asset.logical.clone(),
                    message: format!("Hardware acceleration failed, retrying in software: {}", e),
                });
                true
            }
            _ => false,
        };
        if fall_back {
            job.acceleration = Acceleration::Software;
            result = self.transcoder.segment(&job).await;
        }

        match result {
            Ok(outcome) => {
                let cover = self
                    .covers
                    .relocate(&asset.title, &self.library.raw_dir, &target.title_dir)
                    .await;
                debug!(title = %asset.title, ?cover, "Cover relocation");

                if !self.preserve_originals && is_mp4(&job.input_path) {
                    if let Err(e) = tokio::fs::remove_file(&job.input_path).await {
                        warn!(
                            path = %job.input_path.display(),
                            error = %e,
                            "Failed to remove segmented source"
                        );
                    }
                }

                info!(
                    asset = %asset.logical,
                    manifest = %target.manifest_url,
                    duration_ms = outcome.duration_ms,
                    "Asset segmented"
                );
                events.emit(EventKind::Success {
                    asset: asset.logical,
                    output: Some(target.manifest_url),
                });
                ItemOutcome::Success { title: asset.title }
            }
            Err(e) => {
                let message = format!("Failed to process {}: {}", asset.logical, e.detail());
                warn!(asset = %asset.logical, error = %e, "Segmenting failed");
                events.emit(EventKind::Error {
                    asset: Some(asset.logical),
                    message: message.clone(),
                });
                ItemOutcome::Failed(message)
            }
        }
    }
}

fn is_mp4(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("mp4"))
        .unwrap_or(false)
}
