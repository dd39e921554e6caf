//! On-disk layout of the media library.
//!
//! Every output root (a configured volume or the default root) has the shape
//! `<root>/<title>/<episode>/playlist.m3u8` plus numbered segments, with an
//! optional `<root>/<title>/cover.{jpg,png,jpeg,webp}`. Raw uploads live under
//! `<raw_dir>/<title>/<file>`.

mod covers;
mod layout;
mod paths;

pub use covers::{CoverMove, CoverRelocator};
pub use layout::{find_cover, list_subdirs, OutputRoot, OutputTarget};
pub use paths::{
    episode_name, extract_title, is_video_file, normalize_url_path, resolve_source_path, AssetRef,
    ManifestRef,
};

/// Segmented-stream playlist marking a playable episode directory.
pub const MANIFEST_NAME: &str = "playlist.m3u8";

/// Segment naming template handed to the transcoder.
pub const SEGMENT_TEMPLATE: &str = "segment_%03d.ts";

/// Cover file names, in lookup order.
pub const COVER_CANDIDATES: [&str; 4] = ["cover.jpg", "cover.png", "cover.jpeg", "cover.webp"];

/// Logical prefix of raw uploads.
pub const RAW_URL_PREFIX: &str = "/static/videos";

/// Logical prefix of the default output root.
pub const DEFAULT_URL_PREFIX: &str = "/hls";

/// Logical prefix of repaired output (`library.repair_output_dir`).
pub const REPAIR_URL_PREFIX: &str = "/static/fixed_videos";

/// Logical prefix of configured volumes (`/storage/<volume>/...`).
pub const VOLUME_URL_PREFIX: &str = "/storage";
