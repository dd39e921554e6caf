//! Multi-volume storage allocation.
//!
//! The [`VolumeAllocator`] owns the configured volumes, keeps a cached usage
//! figure per volume and picks a volume for new titles under a
//! [`PlacementStrategy`]. When no volume is enabled, callers fall back to the
//! default output root.

mod allocator;
mod config;
mod error;
mod types;

pub use allocator::{measure_dir, VolumeAllocator};
pub use config::{PlacementStrategy, StorageConfig, VolumeConfig};
pub use error::StorageError;
pub use types::Volume;
