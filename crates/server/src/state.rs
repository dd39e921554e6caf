use std::sync::Arc;

use reelhouse_core::{
    library::CoverRelocator, BatchProcessor, CatalogReconciler, CatalogStore, Config, JobRegistry,
    ProcessorConfig, RepairProcessor, SanitizedConfig, Transcoder, VolumeAllocator,
};

/// Shared application state
pub struct AppState {
    config: Config,
    allocator: Arc<VolumeAllocator>,
    catalog: Arc<CatalogReconciler>,
    batch: BatchProcessor,
    repair: RepairProcessor,
}

impl AppState {
    /// Wires the core components from configuration.
    ///
    /// `store` is `None` when the catalog runs in filesystem mode. The job
    /// registry and cover relocator are created here, once per process.
    pub fn new(
        config: Config,
        transcoder: Arc<dyn Transcoder>,
        store: Option<Arc<dyn CatalogStore>>,
    ) -> Self {
        let allocator = Arc::new(VolumeAllocator::new(
            &config.storage,
            &config.library.output_dir,
        ));
        let catalog = Arc::new(CatalogReconciler::new(
            store,
            Arc::clone(&allocator),
            config.library.clone(),
            config.processor.max_parallel_scans,
        ));
        let batch = BatchProcessor::new(
            &config.processor,
            Arc::clone(&transcoder),
            Arc::clone(&allocator),
            Arc::clone(&catalog),
            Arc::new(JobRegistry::new()),
            Arc::new(CoverRelocator::new()),
            config.library.clone(),
        )
        .with_preserve_originals(config.transcoder.preserve_originals);
        let repair = RepairProcessor::new(
            &config.processor,
            transcoder,
            Arc::clone(&allocator),
            &config.library.repair_output_dir,
            config.transcoder.fallback_fps,
        );

        Self {
            config,
            allocator,
            catalog,
            batch,
            repair,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn processor_config(&self) -> &ProcessorConfig {
        &self.config.processor
    }

    pub fn allocator(&self) -> &Arc<VolumeAllocator> {
        &self.allocator
    }

    pub fn catalog(&self) -> &Arc<CatalogReconciler> {
        &self.catalog
    }

    pub fn batch(&self) -> &BatchProcessor {
        &self.batch
    }

    pub fn repair(&self) -> &RepairProcessor {
        &self.repair
    }
}
