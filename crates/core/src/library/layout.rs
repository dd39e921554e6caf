use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{COVER_CANDIDATES, DEFAULT_URL_PREFIX, MANIFEST_NAME, VOLUME_URL_PREFIX};

/// A directory holding segmented output, one subdirectory per title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputRoot {
    /// The default root (`library.output_dir`), served under `/hls`.
    Default { path: PathBuf },
    /// A configured volume, served under `/storage/<name>`.
    Volume { name: String, path: PathBuf },
}

impl OutputRoot {
    pub fn path(&self) -> &Path {
        match self {
            OutputRoot::Default { path } | OutputRoot::Volume { path, .. } => path,
        }
    }

    pub fn volume_name(&self) -> Option<&str> {
        match self {
            OutputRoot::Default { .. } => None,
            OutputRoot::Volume { name, .. } => Some(name),
        }
    }

    pub fn title_dir(&self, title: &str) -> PathBuf {
        self.path().join(title)
    }

    /// Logical reference for a path below this root, e.g.
    /// `url(&["Show", "ep1", "playlist.m3u8"])`.
    pub fn url(&self, segments: &[&str]) -> String {
        let mut url = match self {
            OutputRoot::Default { .. } => DEFAULT_URL_PREFIX.to_string(),
            OutputRoot::Volume { name, .. } => format!("{}/{}", VOLUME_URL_PREFIX, name),
        };
        for segment in segments {
            url.push('/');
            url.push_str(segment);
        }
        url
    }

    /// Where a title's episode is written under this root.
    pub fn target(&self, title: &str, episode: &str) -> OutputTarget {
        let episode_dir = self.title_dir(title).join(episode);
        OutputTarget {
            manifest: episode_dir.join(MANIFEST_NAME),
            manifest_url: self.url(&[title, episode, MANIFEST_NAME]),
            title_dir: self.title_dir(title),
            episode_dir,
            volume: self.volume_name().map(str::to_string),
        }
    }
}

/// Resolved output location of one episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub volume: Option<String>,
    pub title_dir: PathBuf,
    pub episode_dir: PathBuf,
    pub manifest: PathBuf,
    pub manifest_url: String,
}

/// First cover candidate present in `dir`.
pub fn find_cover(dir: &Path) -> Option<&'static str> {
    COVER_CANDIDATES
        .iter()
        .copied()
        .find(|name| dir.join(name).is_file())
}

/// Immediate subdirectory names of `dir`, sorted.
pub fn list_subdirs(dir: &Path) -> io::Result<Vec<String>> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    Ok(names)
}
