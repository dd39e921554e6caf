pub mod catalog;
pub mod config;
pub mod jobs;
pub mod library;
pub mod processor;
pub mod progress;
pub mod storage;
pub mod testing;
pub mod transcoder;

pub use catalog::{CatalogEntry, CatalogError, CatalogReconciler, CatalogStore, SqliteCatalogStore};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LibraryConfig,
    SanitizedConfig,
};
pub use jobs::{JobId, JobRegistry};
pub use processor::{BatchProcessor, ProcessorConfig, ProcessorError, RepairProcessor, RepairResult};
pub use progress::{progress_channel, EventKind, ProgressEvent, ProgressStream, RunSummary};
pub use storage::{PlacementStrategy, StorageConfig, Volume, VolumeAllocator};
pub use transcoder::{FfmpegTranscoder, TranscodeError, Transcoder, TranscoderConfig};
