//! Transcode orchestration.
//!
//! [`BatchProcessor`] segments raw uploads into playlists, [`RepairProcessor`]
//! re-encodes existing playlists at a constant frame rate. Both run items on
//! a fixed-size worker pool, report through a
//! [`ProgressSender`](crate::progress::ProgressSender), and treat cancellation
//! as advisory: items that have not started are dropped, running subprocesses
//! finish.
//!
//! # Example
//!
//! ```ignore
//! use reelhouse_core::processor::{BatchProcessor, ProcessorConfig};
//!
//! let registry = Arc::new(JobRegistry::new());
//! let covers = Arc::new(CoverRelocator::new());
//! let processor =
//!     BatchProcessor::new(&config, transcoder, allocator, catalog, registry, covers, library);
//! let (job_id, mut events) = processor.submit_batch(assets, true)?;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event.kind);
//! }
//! ```

mod batch;
mod config;
mod error;
mod pool;
mod repair;
mod types;

pub use batch::BatchProcessor;
pub use config::ProcessorConfig;
pub use error::ProcessorError;
pub use repair::RepairProcessor;
pub use types::RepairResult;
