//! Logical asset references and their filesystem counterparts.

use std::path::{Path, PathBuf};

use super::{DEFAULT_URL_PREFIX, MANIFEST_NAME, RAW_URL_PREFIX, VOLUME_URL_PREFIX};

/// Normalizes a client-supplied reference into `/a/b/c` form.
///
/// Backslashes become slashes and empty segments are dropped, so
/// `"static\\videos//x"` and `"/static/videos/x/"` both become
/// `"/static/videos/x"`. An empty reference becomes `"/"`.
pub fn normalize_url_path(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    let parts: Vec<&str> = replaced.split('/').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return "/".to_string();
    }
    format!("/{}", parts.join("/"))
}

/// Extracts the title directory from an asset or output reference.
///
/// Understands `/static/videos/<title>/..`, `/static/hls/<title>/..`,
/// `/hls/<title>/..` and `/storage/<volume>/<title>/..`.
pub fn extract_title(reference: &str) -> Option<String> {
    let normalized = normalize_url_path(reference);
    let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();

    let title = match parts.as_slice() {
        ["static", "videos", title, ..] | ["static", "hls", title, ..] => *title,
        ["hls", title, ..] => *title,
        ["storage", _volume, title, ..] => *title,
        _ => return None,
    };
    Some(title.to_string())
}

/// Episode directory name derived from a raw file reference: the file name
/// without its extension.
pub fn episode_name(reference: &str) -> Option<String> {
    let normalized = normalize_url_path(reference);
    let file = normalized.rsplit('/').next().filter(|f| !f.is_empty())?;
    let stem = Path::new(file).file_stem()?.to_string_lossy().to_string();
    if stem.is_empty() {
        None
    } else {
        Some(stem)
    }
}

/// Whether a file name carries one of the allowed extensions
/// (case-insensitive, extensions given with a leading dot).
pub fn is_video_file(name: &str, allowed_formats: &[String]) -> bool {
    let Some(ext) = Path::new(name).extension() else {
        return false;
    };
    let ext = format!(".{}", ext.to_string_lossy().to_lowercase());
    allowed_formats.iter().any(|f| f.to_lowercase() == ext)
}

/// Maps a logical reference to a filesystem path.
///
/// `/static/videos/..` resolves under `raw_dir`, `/storage/<volume>/..`
/// under that volume's root when `volume_root` knows it; anything else is
/// taken relative to the working directory.
pub fn resolve_source_path(
    reference: &str,
    raw_dir: &Path,
    volume_root: impl Fn(&str) -> Option<PathBuf>,
) -> PathBuf {
    let normalized = normalize_url_path(reference);

    if let Some(rest) = strip_prefix_segment(&normalized, RAW_URL_PREFIX) {
        return join_segments(raw_dir, rest);
    }

    if let Some(rest) = strip_prefix_segment(&normalized, VOLUME_URL_PREFIX) {
        let mut parts = rest.splitn(2, '/');
        if let (Some(volume), Some(tail)) = (parts.next(), parts.next()) {
            if let Some(root) = volume_root(volume) {
                return join_segments(&root, tail);
            }
        }
    }

    join_segments(Path::new(""), normalized.trim_start_matches('/'))
}

fn strip_prefix_segment<'a>(normalized: &'a str, prefix: &str) -> Option<&'a str> {
    normalized
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|rest| !rest.is_empty())
}

fn join_segments(base: &Path, rest: &str) -> PathBuf {
    rest.split('/')
        .filter(|s| !s.is_empty())
        .fold(base.to_path_buf(), |acc, seg| acc.join(seg))
}

/// A raw asset reference submitted for segmenting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    /// Normalized logical reference.
    pub logical: String,
    /// Title directory the asset belongs to.
    pub title: String,
    /// Episode directory the output is written to.
    pub episode: String,
}

impl AssetRef {
    /// Parses a reference, returning `None` when no title or episode can be
    /// derived from it.
    pub fn parse(reference: &str) -> Option<Self> {
        let logical = normalize_url_path(reference);
        if logical.split('/').any(|s| s == "." || s == "..") {
            return None;
        }
        let title = extract_title(&logical)?;
        let episode = episode_name(&logical)?;
        if episode == title {
            return None;
        }
        Some(Self {
            logical,
            title,
            episode,
        })
    }
}

/// A reference to an episode that was already segmented, e.g.
/// `/hls/<title>/<episode>/playlist.m3u8` or
/// `/storage/<volume>/<title>/<episode>/playlist.m3u8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRef {
    /// `None` for the default root.
    pub volume: Option<String>,
    pub title: String,
    pub episode: String,
}

impl ManifestRef {
    pub fn parse(reference: &str) -> Option<Self> {
        let normalized = normalize_url_path(reference);
        let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
        if parts.iter().any(|s| *s == "." || *s == "..") {
            return None;
        }

        let default_prefix = DEFAULT_URL_PREFIX.trim_start_matches('/');
        let volume_prefix = VOLUME_URL_PREFIX.trim_start_matches('/');
        let (volume, title, episode) = match parts.as_slice() {
            [prefix, title, episode, file] if *prefix == default_prefix && *file == MANIFEST_NAME => {
                (None, *title, *episode)
            }
            [prefix, volume, title, episode, file]
                if *prefix == volume_prefix && *file == MANIFEST_NAME =>
            {
                (Some(volume.to_string()), *title, *episode)
            }
            _ => return None,
        };

        Some(Self {
            volume,
            title: title.to_string(),
            episode: episode.to_string(),
        })
    }
}
