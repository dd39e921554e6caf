use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::processor::ProcessorConfig;
use crate::storage::StorageConfig;
use crate::transcoder::TranscoderConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    5010
}

/// Catalog store configuration.
///
/// When the store is disabled or cannot be opened at startup, every catalog
/// operation runs against the filesystem for the rest of the process.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            enabled: true,
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("reelhouse.db")
}

fn default_true() -> bool {
    true
}

/// Fixed directories of the media library.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Raw uploads, one directory per title.
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,
    /// Default (legacy) output root used when no volume is configured or
    /// placement fails.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Where the repair pipeline writes re-encoded episodes.
    #[serde(default = "default_repair_output_dir")]
    pub repair_output_dir: PathBuf,
    /// Cover reference used when a title has no cover file.
    #[serde(default = "default_cover")]
    pub default_cover: String,
    /// Extensions (with leading dot) accepted as raw video sources.
    #[serde(default = "default_allowed_formats")]
    pub allowed_formats: Vec<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            output_dir: default_output_dir(),
            repair_output_dir: default_repair_output_dir(),
            default_cover: default_cover(),
            allowed_formats: default_allowed_formats(),
        }
    }
}

fn default_raw_dir() -> PathBuf {
    PathBuf::from("static/videos")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("static/hls")
}

fn default_repair_output_dir() -> PathBuf {
    PathBuf::from("static/fixed_videos")
}

fn default_cover() -> String {
    "/static/css/default-cover.jpg".to_string()
}

fn default_allowed_formats() -> Vec<String> {
    [".mp4", ".flv", ".mkv", ".avi"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Sanitized config for API responses (filesystem locations of the store hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: SanitizedDatabaseConfig,
    pub library: LibraryConfig,
    pub storage: StorageConfig,
    pub processor: ProcessorConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDatabaseConfig {
    pub enabled: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: SanitizedDatabaseConfig {
                enabled: config.database.enabled,
            },
            library: config.library.clone(),
            storage: config.storage.clone(),
            processor: config.processor.clone(),
        }
    }
}
