//! Trait definitions for the transcoder module.

use async_trait::async_trait;
use std::path::Path;

use super::error::TranscodeError;
use super::types::{RepairJob, SegmentJob, TranscodeOutcome};

/// Drives an external transcoder. One call is one subprocess run; retries
/// and fallbacks belong to the caller.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Segments a raw upload into a playlist without re-encoding.
    async fn segment(&self, job: &SegmentJob) -> Result<TranscodeOutcome, TranscodeError>;

    /// Reads the average frame rate of the first video stream.
    async fn probe_frame_rate(&self, path: &Path) -> Result<u32, TranscodeError>;

    /// Re-encodes a playlist at a constant frame rate into a new directory.
    async fn repair(&self, job: &RepairJob) -> Result<TranscodeOutcome, TranscodeError>;

    /// Validates that the transcoder is properly configured and ready.
    async fn validate(&self) -> Result<(), TranscodeError>;
}
