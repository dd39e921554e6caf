//! Transcoder module driving ffmpeg and ffprobe as subprocesses.
//!
//! Two operations are exposed through the [`Transcoder`] trait:
//!
//! - segmenting a raw upload into `playlist.m3u8` plus numbered segments by
//!   stream copy, with an optional hardware decoding attempt
//! - repairing an existing playlist by re-encoding it at a constant frame
//!   rate into a separate directory
//!
//! No codec work happens in-process.
//!
//! # Example
//!
//! ```ignore
//! use reelhouse_core::transcoder::{FfmpegTranscoder, Transcoder, TranscoderConfig};
//!
//! let transcoder = FfmpegTranscoder::new(TranscoderConfig::default());
//! transcoder.validate().await?;
//!
//! let fps = transcoder.probe_frame_rate(Path::new("static/hls/Show/ep1/playlist.m3u8")).await?;
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::TranscoderConfig;
pub use error::TranscodeError;
pub use ffmpeg::FfmpegTranscoder;
pub use traits::Transcoder;
pub use types::{parse_frame_rate, Acceleration, RepairJob, SegmentJob, TranscodeOutcome};
