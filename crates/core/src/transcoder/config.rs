//! Configuration for the transcoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the ffmpeg-backed transcoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscoderConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Target segment duration when segmenting raw uploads.
    #[serde(default = "default_segment_secs")]
    pub segment_secs: u32,

    /// Target segment duration when re-encoding damaged output.
    #[serde(default = "default_repair_segment_secs")]
    pub repair_segment_secs: u32,

    /// Frame rate used when probing fails or reports a degenerate rate.
    #[serde(default = "default_fallback_fps")]
    pub fallback_fps: u32,

    /// Watchdog for a single ffmpeg run, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Keep raw `.mp4` sources after a successful segmenting run.
    #[serde(default)]
    pub preserve_originals: bool,

    /// Additional ffmpeg arguments placed before the output path.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_log_level() -> String {
    "error".to_string()
}

fn default_segment_secs() -> u32 {
    8
}

fn default_repair_segment_secs() -> u32 {
    3
}

fn default_fallback_fps() -> u32 {
    30
}

fn default_timeout() -> u64 {
    3600 // 1 hour
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            ffmpeg_log_level: default_log_level(),
            segment_secs: default_segment_secs(),
            repair_segment_secs: default_repair_segment_secs(),
            fallback_fps: default_fallback_fps(),
            timeout_secs: default_timeout(),
            preserve_originals: false,
            extra_ffmpeg_args: Vec::new(),
        }
    }
}

impl TranscoderConfig {
    /// Creates a new config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            ..Default::default()
        }
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Keeps or removes raw sources after segmenting.
    pub fn with_preserve_originals(mut self, preserve: bool) -> Self {
        self.preserve_originals = preserve;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TranscoderConfig::default();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.ffprobe_path, PathBuf::from("ffprobe"));
        assert_eq!(config.segment_secs, 8);
        assert_eq!(config.repair_segment_secs, 3);
        assert_eq!(config.fallback_fps, 30);
        assert_eq!(config.timeout_secs, 3600);
        assert!(!config.preserve_originals);
    }

    #[test]
    fn test_config_builder() {
        let config = TranscoderConfig::with_paths(
            PathBuf::from("/usr/local/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffprobe"),
        )
        .with_timeout(7200)
        .with_preserve_originals(true);

        assert_eq!(config.ffmpeg_path, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.timeout_secs, 7200);
        assert!(config.preserve_originals);
    }
}
