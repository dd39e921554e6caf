//! Job descriptions handed to a [`Transcoder`](super::Transcoder).

use serde::Serialize;
use std::path::PathBuf;

use super::error::TranscodeError;

/// Decoding path of a segmenting attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Acceleration {
    Hardware,
    Software,
}

/// Stream-copy a raw upload into a segmented playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentJob {
    /// Logical reference of the asset, for logging.
    pub asset: String,
    pub input_path: PathBuf,
    /// Episode directory receiving playlist and segments.
    pub output_dir: PathBuf,
    pub manifest_path: PathBuf,
    /// File name template of the segments, relative to `output_dir`.
    pub segment_template: String,
    pub acceleration: Acceleration,
}

/// Re-encode an existing playlist at a constant frame rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairJob {
    pub title: String,
    pub episode: String,
    pub source_manifest: PathBuf,
    pub output_dir: PathBuf,
    pub output_manifest: PathBuf,
    pub segment_template: String,
    pub fps: u32,
}

/// A finished ffmpeg run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeOutcome {
    pub manifest_path: PathBuf,
    pub duration_ms: u64,
}

/// Parses an ffprobe rate like `"24/1"` or `"30000/1001"` into whole frames
/// per second, rounding to the nearest integer.
///
/// Empty output, `0/0` and zero rates are rejected so callers can apply
/// their fallback.
pub fn parse_frame_rate(raw: &str) -> Result<u32, TranscodeError> {
    let value = raw.trim();
    let invalid = || TranscodeError::InvalidFrameRate {
        value: value.to_string(),
    };

    let fps = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().map_err(|_| invalid())?;
            let den: f64 = den.trim().parse().map_err(|_| invalid())?;
            if den <= 0.0 {
                return Err(invalid());
            }
            num / den
        }
        None => value.parse::<f64>().map_err(|_| invalid())?,
    };

    if !fps.is_finite() || fps.round() < 1.0 {
        return Err(invalid());
    }
    Ok(fps.round() as u32)
}
