//! Testing utilities and mock implementations.
//!
//! The mocks stand in for the external ffmpeg/ffprobe tools so the batch and
//! repair pipelines can run end to end against a temporary directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use reelhouse_core::testing::{fixtures, MockTranscoder};
//!
//! let transcoder = MockTranscoder::new();
//! transcoder.set_fail_hardware(true).await;
//!
//! fixtures::write_episode(&output_root, "Show", "ep1");
//! ```

mod mock_transcoder;

pub use mock_transcoder::{MockTranscoder, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::library::MANIFEST_NAME;

    /// Create `<root>/<title>/<episode>/playlist.m3u8` and return its path.
    pub fn write_episode(root: &Path, title: &str, episode: &str) -> std::io::Result<PathBuf> {
        let dir = root.join(title).join(episode);
        std::fs::create_dir_all(&dir)?;
        let manifest = dir.join(MANIFEST_NAME);
        std::fs::write(&manifest, "#EXTM3U\n#EXT-X-ENDLIST\n")?;
        Ok(manifest)
    }

    /// Create a raw upload `<raw_dir>/<title>/<file>` and return its logical
    /// reference.
    pub fn write_raw_asset(raw_dir: &Path, title: &str, file: &str) -> std::io::Result<String> {
        let dir = raw_dir.join(title);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(file), b"raw video bytes")?;
        Ok(format!("/static/videos/{}/{}", title, file))
    }

    /// Create a cover image in `dir`.
    pub fn write_cover(dir: &Path, name: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(name);
        std::fs::write(&path, b"image bytes")?;
        Ok(path)
    }
}
