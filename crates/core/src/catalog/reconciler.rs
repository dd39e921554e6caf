//! Filesystem scan and store reconciliation.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::types::{validate_folder_name, CatalogEntry, CatalogError, DeleteReport, VideoRef};
use super::CatalogStore;
use crate::config::LibraryConfig;
use crate::library::{
    find_cover, is_video_file, list_subdirs, normalize_url_path, resolve_source_path, OutputRoot,
    DEFAULT_URL_PREFIX, MANIFEST_NAME, RAW_URL_PREFIX,
};
use crate::storage::{Volume, VolumeAllocator};

/// Derives catalog entries from the output roots and keeps the store in step.
///
/// Without a store the reconciler answers everything from the filesystem.
/// That mode is fixed at construction and never re-probed.
pub struct CatalogReconciler {
    store: Option<Arc<dyn CatalogStore>>,
    allocator: Arc<VolumeAllocator>,
    library: LibraryConfig,
    scan_limit: Arc<Semaphore>,
}

impl CatalogReconciler {
    pub fn new(
        store: Option<Arc<dyn CatalogStore>>,
        allocator: Arc<VolumeAllocator>,
        library: LibraryConfig,
        max_parallel_scans: usize,
    ) -> Self {
        if store.is_none() {
            warn!("Catalog store unavailable, running in filesystem mode");
        }
        Self {
            store,
            allocator,
            library,
            scan_limit: Arc::new(Semaphore::new(max_parallel_scans.max(1))),
        }
    }

    pub fn is_filesystem_mode(&self) -> bool {
        self.store.is_none()
    }

    fn layout(&self) -> Layout {
        Layout {
            roots: self.allocator.output_roots(),
            default_root: self.allocator.default_root(),
            volumes: self.allocator.enabled_volumes(),
            raw_dir: self.library.raw_dir.clone(),
            default_cover: self.library.default_cover.clone(),
            allowed_formats: self.library.allowed_formats.clone(),
        }
    }

    /// Scans every title on every output root and upserts what it finds.
    ///
    /// Titles without a playable episode are left out. Store rows of titles
    /// that disappeared from disk are kept.
    pub async fn scan_all(&self) -> Vec<CatalogEntry> {
        let layout = self.layout();
        let candidates = match blocking(move || Ok(layout.collect_candidates(None))).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "Failed to list catalog candidates");
                return Vec::new();
            }
        };
        let entries = self.reconcile(candidates).await;
        info!(titles = entries.len(), "Full catalog scan complete");
        entries
    }

    /// Rescans only the named title folders.
    pub async fn scan_subset(&self, folder_names: &[String]) -> Vec<CatalogEntry> {
        let wanted: HashSet<String> = folder_names
            .iter()
            .filter(|name| match validate_folder_name(name) {
                Ok(()) => true,
                Err(e) => {
                    debug!(error = %e, "Skipping folder in incremental scan");
                    false
                }
            })
            .cloned()
            .collect();

        if wanted.is_empty() {
            return Vec::new();
        }

        let layout = self.layout();
        let requested = wanted.len();
        let candidates =
            match blocking(move || Ok(layout.collect_candidates(Some(&wanted)))).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(error = %e, "Failed to list catalog candidates");
                    return Vec::new();
                }
            };
        let entries = self.reconcile(candidates).await;
        info!(
            requested,
            updated = entries.len(),
            "Incremental catalog scan complete"
        );
        entries
    }

    /// One task per title, bounded by the scan pool. Results come back
    /// sorted by title.
    async fn reconcile(&self, candidates: BTreeMap<String, Vec<OutputRoot>>) -> Vec<CatalogEntry> {
        let mut tasks = JoinSet::new();

        for (title, roots) in candidates {
            let limit = Arc::clone(&self.scan_limit);
            let store = self.store.clone();
            let default_cover = self.library.default_cover.clone();

            tasks.spawn(async move {
                let _permit = limit.acquire_owned().await.ok()?;
                let scanned = tokio::task::spawn_blocking(move || {
                    let entry = scan_title_across(&roots, &title, &default_cover)?;
                    if let Some(store) = store {
                        match store.upsert(&entry) {
                            Ok(outcome) => {
                                debug!(folder = %entry.folder_name, ?outcome, "Catalog entry stored")
                            }
                            Err(e) => {
                                warn!(folder = %entry.folder_name, error = %e, "Failed to store catalog entry")
                            }
                        }
                    }
                    Some(entry)
                })
                .await;

                match scanned {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(error = %e, "Title scan task failed");
                        None
                    }
                }
            });
        }

        let mut entries = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Title scan task panicked"),
            }
        }

        entries.sort_by(|a, b| {
            a.title
                .cmp(&b.title)
                .then_with(|| a.folder_name.cmp(&b.folder_name))
        });
        entries
    }

    /// Looks a title up in the store, falling back to the filesystem.
    pub async fn resolve_by_folder(
        &self,
        folder_name: &str,
    ) -> Result<Option<CatalogEntry>, CatalogError> {
        validate_folder_name(folder_name)?;

        if let Some(store) = self.store.clone() {
            let name = folder_name.to_string();
            match blocking(move || store.find_by_folder(&name)).await {
                Ok(Some(entry)) => return Ok(Some(entry)),
                Ok(None) => {}
                Err(e) => {
                    warn!(folder = %folder_name, error = %e, "Store lookup failed, using filesystem")
                }
            }
        }

        let layout = self.layout();
        let name = folder_name.to_string();
        blocking(move || {
            let scanned = scan_title_across(&layout.roots, &name, &layout.default_cover);
            Ok(scanned.or_else(|| layout.raw_entry(&name)))
        })
        .await
    }

    /// Every entry, read from the store when possible.
    ///
    /// Covers whose reference no longer resolves are looked up again and
    /// the corrected reference is written back.
    pub async fn list_entries_from_store(&self) -> Vec<CatalogEntry> {
        let Some(store) = self.store.clone() else {
            return self.scan_all().await;
        };

        let layout = self.layout();
        let listed = blocking(move || {
            let mut entries = store.list()?;
            for entry in &mut entries {
                if !layout.cover_is_stale(&entry.cover_ref) {
                    continue;
                }
                let resolved = layout.resolve_cover(&entry.folder_name);
                if resolved == entry.cover_ref {
                    continue;
                }
                debug!(folder = %entry.folder_name, cover = %resolved, "Repairing stale cover");
                if let Err(e) = store.update_cover(&entry.folder_name, &resolved) {
                    warn!(folder = %entry.folder_name, error = %e, "Failed to store repaired cover");
                }
                entry.cover_ref = resolved;
            }
            Ok(entries)
        })
        .await;

        match listed {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Store read failed, scanning filesystem");
                self.scan_all().await
            }
        }
    }

    /// Case-insensitive substring search on title and folder name.
    pub async fn search(&self, keyword: &str) -> Vec<CatalogEntry> {
        if let Some(store) = self.store.clone() {
            let keyword = keyword.to_string();
            match blocking(move || store.search(&keyword)).await {
                Ok(entries) => return entries,
                Err(e) => warn!(error = %e, "Store search failed, scanning filesystem"),
            }
        }

        let needle = keyword.to_lowercase();
        self.scan_all()
            .await
            .into_iter()
            .filter(|e| {
                e.title.to_lowercase().contains(&needle)
                    || e.folder_name.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Every playable episode of a title across all output roots.
    pub async fn list_videos(&self, folder_name: &str) -> Result<Vec<VideoRef>, CatalogError> {
        validate_folder_name(folder_name)?;
        let layout = self.layout();
        let name = folder_name.to_string();
        blocking(move || {
            let mut seen = HashSet::new();
            let mut videos: Vec<VideoRef> = layout
                .roots
                .iter()
                .flat_map(|root| list_episodes(root, &name))
                .filter(|v| seen.insert(v.logical_path.clone()))
                .collect();
            videos.sort_by(|a, b| a.display_name.cmp(&b.display_name));
            Ok(videos)
        })
        .await
    }

    /// Removes a title from the raw area, every output root and the store.
    ///
    /// Each step is attempted independently; failures are logged.
    pub async fn delete_title(&self, folder_name: &str) -> Result<DeleteReport, CatalogError> {
        validate_folder_name(folder_name)?;
        let layout = self.layout();
        let store = self.store.clone();
        let name = folder_name.to_string();

        blocking(move || {
            let mut report = DeleteReport {
                folder_name: name.clone(),
                ..Default::default()
            };

            let mut dirs = vec![layout.raw_dir.join(&name), layout.default_root.title_dir(&name)];
            dirs.extend(layout.volumes.iter().map(|v| v.root_path.join(&name)));
            let mut seen = HashSet::new();
            dirs.retain(|d| seen.insert(d.clone()));

            for dir in dirs {
                if !dir.exists() {
                    continue;
                }
                match std::fs::remove_dir_all(&dir) {
                    Ok(()) => {
                        info!(path = %dir.display(), "Removed title directory");
                        report.removed_dirs.push(dir);
                    }
                    Err(e) => warn!(path = %dir.display(), error = %e, "Failed to remove title directory"),
                }
            }

            if let Some(store) = store {
                match store.delete(&name) {
                    Ok(removed) => report.store_row_removed = removed,
                    Err(e) => warn!(folder = %name, error = %e, "Failed to delete catalog row"),
                }
            }

            Ok(report)
        })
        .await
    }

    /// Raw uploads (replaced by their playlist when one exists) followed by
    /// every playlist on the output roots, without duplicates.
    pub async fn list_raw_assets(&self) -> Result<Vec<String>, CatalogError> {
        let layout = self.layout();
        blocking(move || {
            let mut assets = Vec::new();
            let mut seen = HashSet::new();

            let titles = match list_subdirs(&layout.raw_dir) {
                Ok(titles) => titles,
                Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
                Err(e) => return Err(CatalogError::Io(e)),
            };

            for title in titles {
                for file in layout.raw_videos(&title) {
                    let reference = layout
                        .existing_output(&title, &file)
                        .unwrap_or_else(|| raw_url(&title, &file));
                    if seen.insert(reference.clone()) {
                        assets.push(reference);
                    }
                }
            }

            for root in &layout.roots {
                let titles = match list_subdirs(root.path()) {
                    Ok(titles) => titles,
                    Err(_) => continue,
                };
                for title in titles {
                    for video in list_episodes(root, &title) {
                        if seen.insert(video.logical_path.clone()) {
                            assets.push(video.logical_path);
                        }
                    }
                }
            }

            Ok(assets)
        })
        .await
    }
}

/// Point-in-time view of the roots, taken before moving to the blocking pool.
struct Layout {
    roots: Vec<OutputRoot>,
    default_root: OutputRoot,
    volumes: Vec<Volume>,
    raw_dir: PathBuf,
    default_cover: String,
    allowed_formats: Vec<String>,
}

impl Layout {
    /// Title directories per root, in root order. `only` restricts the set.
    fn collect_candidates(&self, only: Option<&HashSet<String>>) -> BTreeMap<String, Vec<OutputRoot>> {
        let mut candidates: BTreeMap<String, Vec<OutputRoot>> = BTreeMap::new();

        for root in &self.roots {
            if let OutputRoot::Default { path } = root {
                if !path.exists() {
                    warn!(path = %path.display(), "Default output root missing, creating it");
                    if let Err(e) = std::fs::create_dir_all(path) {
                        warn!(path = %path.display(), error = %e, "Failed to create default output root");
                    }
                }
            }

            let titles = match only {
                Some(names) => names
                    .iter()
                    .filter(|name| root.title_dir(name).is_dir())
                    .cloned()
                    .collect(),
                None => match list_subdirs(root.path()) {
                    Ok(titles) => titles,
                    Err(e) => {
                        warn!(root = %root.path().display(), error = %e, "Failed to scan output root");
                        continue;
                    }
                },
            };

            for title in titles {
                candidates.entry(title).or_default().push(root.clone());
            }
        }

        candidates
    }

    fn volume_root(&self, name: &str) -> Option<PathBuf> {
        self.volumes
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.root_path.clone())
    }

    /// Filesystem location of a logical reference this library serves.
    fn physical(&self, reference: &str) -> Option<PathBuf> {
        let normalized = normalize_url_path(reference);
        if let Some(rest) = normalized
            .strip_prefix(DEFAULT_URL_PREFIX)
            .and_then(|r| r.strip_prefix('/'))
        {
            return Some(
                rest.split('/')
                    .fold(self.default_root.path().to_path_buf(), |acc, s| acc.join(s)),
            );
        }
        if normalized.starts_with("/storage/") || normalized.starts_with("/static/videos/") {
            return Some(resolve_source_path(&normalized, &self.raw_dir, |name| {
                self.volume_root(name)
            }));
        }
        None
    }

    fn cover_is_stale(&self, cover_ref: &str) -> bool {
        if cover_ref == self.default_cover {
            return true;
        }
        match self.physical(cover_ref) {
            Some(path) => !path.is_file(),
            None => false,
        }
    }

    /// Cover lookup order: enabled volumes, default root, raw directory.
    fn resolve_cover(&self, title: &str) -> String {
        for volume in &self.volumes {
            let root = volume.output_root();
            if let Some(name) = find_cover(&root.title_dir(title)) {
                return root.url(&[title, name]);
            }
        }
        if let Some(name) = find_cover(&self.default_root.title_dir(title)) {
            return self.default_root.url(&[title, name]);
        }
        if let Some(name) = find_cover(&self.raw_dir.join(title)) {
            return raw_url(title, name);
        }
        self.default_cover.clone()
    }

    fn raw_videos(&self, title: &str) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.raw_dir.join(title)) else {
            return Vec::new();
        };
        let mut files: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| is_video_file(name, &self.allowed_formats))
            .collect();
        files.sort();
        files
    }

    /// Playlist reference of a raw file's output, if it was produced.
    /// Never triggers a fresh placement.
    fn existing_output(&self, title: &str, file: &str) -> Option<String> {
        let episode = Path::new(file).file_stem()?.to_string_lossy().to_string();
        self.roots
            .iter()
            .chain(std::iter::once(&self.default_root))
            .map(|root| root.target(title, &episode))
            .find(|target| target.manifest.is_file())
            .map(|target| target.manifest_url)
    }

    /// Entry for a title that only has raw uploads.
    fn raw_entry(&self, title: &str) -> Option<CatalogEntry> {
        let files = self.raw_videos(title);
        let first = files.first()?;
        let primary = self
            .existing_output(title, first)
            .unwrap_or_else(|| raw_url(title, first));
        Some(CatalogEntry {
            title: title.to_string(),
            folder_name: title.to_string(),
            summary: summary_for(title),
            cover_ref: self.resolve_cover(title),
            primary_video_ref: primary,
            episode_count: files.len(),
            physical_root_path: self.raw_dir.join(title),
            hosting_volume: None,
        })
    }
}

fn summary_for(title: &str) -> String {
    format!("A title named {}", title)
}

fn raw_url(title: &str, file: &str) -> String {
    format!("{}/{}/{}", RAW_URL_PREFIX, title, file)
}

/// Builds the entry of one title on one root, or `None` when it has no
/// playable episode.
fn scan_title(root: &OutputRoot, title: &str, default_cover: &str) -> Option<CatalogEntry> {
    let videos = list_episodes(root, title);
    let primary = videos.first()?;
    let title_dir = root.title_dir(title);

    let cover_ref = find_cover(&title_dir)
        .map(|name| root.url(&[title, name]))
        .unwrap_or_else(|| default_cover.to_string());

    Some(CatalogEntry {
        title: title.to_string(),
        folder_name: title.to_string(),
        summary: summary_for(title),
        cover_ref,
        primary_video_ref: primary.logical_path.clone(),
        episode_count: videos.len(),
        physical_root_path: title_dir,
        hosting_volume: root.volume_name().map(str::to_string),
    })
}

/// Entry for a title held by one or more roots. The first root with a
/// playable episode hosts the entry; episodes on later roots still count.
fn scan_title_across(
    roots: &[OutputRoot],
    title: &str,
    default_cover: &str,
) -> Option<CatalogEntry> {
    let mut entry = roots
        .iter()
        .find_map(|root| scan_title(root, title, default_cover))?;

    let mut seen = HashSet::new();
    let mut videos: Vec<VideoRef> = roots
        .iter()
        .flat_map(|root| list_episodes(root, title))
        .filter(|v| seen.insert(v.display_name.clone()))
        .collect();
    if videos.len() > entry.episode_count {
        warn!(
            title = %title,
            hosted = entry.episode_count,
            total = videos.len(),
            "Title is split across output roots"
        );
        videos.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        entry.episode_count = videos.len();
        entry.primary_video_ref = videos[0].logical_path.clone();
    }
    Some(entry)
}

/// Episode directories of a title that hold a playlist, sorted by name.
fn list_episodes(root: &OutputRoot, title: &str) -> Vec<VideoRef> {
    let title_dir = root.title_dir(title);
    let episodes = match list_subdirs(&title_dir) {
        Ok(episodes) => episodes,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %title_dir.display(), error = %e, "Failed to read title directory");
            }
            return Vec::new();
        }
    };

    episodes
        .into_iter()
        .filter_map(|episode| {
            let manifest = title_dir.join(&episode).join(MANIFEST_NAME);
            manifest.is_file().then(|| VideoRef {
                logical_path: root.url(&[title, &episode, MANIFEST_NAME]),
                display_name: episode,
                physical_path: manifest,
            })
        })
        .collect()
}

async fn blocking<T, F>(f: F) -> Result<T, CatalogError>
where
    F: FnOnce() -> Result<T, CatalogError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CatalogError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteCatalogStore;
    use crate::storage::StorageConfig;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        raw: PathBuf,
        default_root: PathBuf,
        disk1: PathBuf,
        disk2: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let raw = dir.path().join("raw");
            let default_root = dir.path().join("hls");
            let disk1 = dir.path().join("disk1");
            let disk2 = dir.path().join("disk2");
            for d in [&raw, &default_root, &disk1, &disk2] {
                std::fs::create_dir_all(d).unwrap();
            }
            Self {
                _dir: dir,
                raw,
                default_root,
                disk1,
                disk2,
            }
        }

        fn library(&self) -> LibraryConfig {
            LibraryConfig {
                raw_dir: self.raw.clone(),
                output_dir: self.default_root.clone(),
                ..Default::default()
            }
        }

        fn reconciler(&self, volumes: bool, store: Option<Arc<dyn CatalogStore>>) -> CatalogReconciler {
            let storage = if volumes {
                StorageConfig::default()
                    .with_volume("disk1", &self.disk1)
                    .with_volume("disk2", &self.disk2)
            } else {
                StorageConfig::default()
            };
            let allocator = Arc::new(VolumeAllocator::new(&storage, &self.default_root));
            CatalogReconciler::new(store, allocator, self.library(), 4)
        }
    }

    fn episode(root: &Path, title: &str, episode: &str) {
        let dir = root.join(title).join(episode);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_NAME), "#EXTM3U\n").unwrap();
    }

    #[tokio::test]
    async fn test_scan_all_default_root() {
        let fx = Fixture::new();
        episode(&fx.default_root, "Show", "ep02");
        episode(&fx.default_root, "Show", "ep01");
        std::fs::write(fx.default_root.join("Show/cover.png"), b"png").unwrap();
        // No playlist: excluded
        std::fs::create_dir_all(fx.default_root.join("Empty/ep01")).unwrap();

        let reconciler = fx.reconciler(false, None);
        assert!(reconciler.is_filesystem_mode());

        let entries = reconciler.scan_all().await;
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.folder_name, "Show");
        assert_eq!(entry.episode_count, 2);
        assert_eq!(entry.primary_video_ref, "/hls/Show/ep01/playlist.m3u8");
        assert_eq!(entry.cover_ref, "/hls/Show/cover.png");
        assert_eq!(entry.summary, "A title named Show");
        assert_eq!(entry.hosting_volume, None);
    }

    #[tokio::test]
    async fn test_scan_all_volumes_and_default_cover() {
        let fx = Fixture::new();
        episode(&fx.disk1, "Alpha", "e1");
        episode(&fx.disk2, "Beta", "e1");
        // Default root is ignored once volumes are configured
        episode(&fx.default_root, "Legacy", "e1");

        let reconciler = fx.reconciler(true, None);
        let entries = reconciler.scan_all().await;

        let names: Vec<&str> = entries.iter().map(|e| e.folder_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
        assert_eq!(entries[1].hosting_volume.as_deref(), Some("disk2"));
        assert_eq!(
            entries[1].primary_video_ref,
            "/storage/disk2/Beta/e1/playlist.m3u8"
        );
        assert_eq!(entries[0].cover_ref, "/static/css/default-cover.jpg");
    }

    #[tokio::test]
    async fn test_split_title_counts_every_episode() {
        let fx = Fixture::new();
        episode(&fx.disk1, "Show", "ep2");
        episode(&fx.disk2, "Show", "ep1");
        episode(&fx.disk2, "Show", "ep3");

        let reconciler = fx.reconciler(true, None);
        let entries = reconciler.scan_all().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].episode_count, 3);
        assert_eq!(entries[0].hosting_volume.as_deref(), Some("disk1"));
        assert_eq!(
            entries[0].primary_video_ref,
            "/storage/disk2/Show/ep1/playlist.m3u8"
        );

        let resolved = reconciler.resolve_by_folder("Show").await.unwrap().unwrap();
        assert_eq!(resolved, entries[0]);
    }

    #[tokio::test]
    async fn test_scan_is_idempotent_and_upserts() {
        let fx = Fixture::new();
        episode(&fx.default_root, "A", "1");
        episode(&fx.default_root, "B", "1");
        episode(&fx.default_root, "B", "2");

        let store = Arc::new(SqliteCatalogStore::in_memory().unwrap());
        let reconciler = fx.reconciler(false, Some(store.clone()));

        let first = reconciler.scan_all().await;
        let second = reconciler.scan_all().await;
        assert_eq!(first, second);

        let stored = store.list().unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn test_stale_rows_are_kept() {
        let fx = Fixture::new();
        episode(&fx.default_root, "Gone", "1");
        let store = Arc::new(SqliteCatalogStore::in_memory().unwrap());
        let reconciler = fx.reconciler(false, Some(store.clone()));

        reconciler.scan_all().await;
        std::fs::remove_dir_all(fx.default_root.join("Gone")).unwrap();

        assert!(reconciler.scan_all().await.is_empty());
        assert!(store.find_by_folder("Gone").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_scan_subset_only_touches_named() {
        let fx = Fixture::new();
        episode(&fx.default_root, "A", "1");
        episode(&fx.default_root, "B", "1");
        let store = Arc::new(SqliteCatalogStore::in_memory().unwrap());
        let reconciler = fx.reconciler(false, Some(store.clone()));

        let entries = reconciler
            .scan_subset(&["B".to_string(), "B".to_string(), "Missing".to_string(), "../x".to_string()])
            .await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].folder_name, "B");
        assert!(store.find_by_folder("A").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_by_folder_store_then_filesystem() {
        let fx = Fixture::new();
        episode(&fx.default_root, "Show", "1");
        let store = Arc::new(SqliteCatalogStore::in_memory().unwrap());
        let reconciler = fx.reconciler(false, Some(store.clone()));

        // Not in the store yet: filesystem answers
        let entry = reconciler.resolve_by_folder("Show").await.unwrap().unwrap();
        assert_eq!(entry.episode_count, 1);

        let mut stored = entry.clone();
        stored.summary = "edited".to_string();
        store.upsert(&stored).unwrap();
        let entry = reconciler.resolve_by_folder("Show").await.unwrap().unwrap();
        assert_eq!(entry.summary, "edited");

        assert!(reconciler.resolve_by_folder("Nope").await.unwrap().is_none());
        assert!(matches!(
            reconciler.resolve_by_folder("..").await,
            Err(CatalogError::InvalidFolderName(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_raw_only_title() {
        let fx = Fixture::new();
        std::fs::create_dir_all(fx.raw.join("Fresh")).unwrap();
        std::fs::write(fx.raw.join("Fresh/b.mkv"), b"x").unwrap();
        std::fs::write(fx.raw.join("Fresh/a.mp4"), b"x").unwrap();
        std::fs::write(fx.raw.join("Fresh/cover.jpg"), b"x").unwrap();

        let reconciler = fx.reconciler(false, None);
        let entry = reconciler.resolve_by_folder("Fresh").await.unwrap().unwrap();
        assert_eq!(entry.primary_video_ref, "/static/videos/Fresh/a.mp4");
        assert_eq!(entry.episode_count, 2);
        assert_eq!(entry.cover_ref, "/static/videos/Fresh/cover.jpg");
    }

    #[tokio::test]
    async fn test_list_entries_repairs_stale_cover() {
        let fx = Fixture::new();
        episode(&fx.default_root, "Show", "1");
        std::fs::write(fx.default_root.join("Show/cover.jpg"), b"x").unwrap();

        let store = Arc::new(SqliteCatalogStore::in_memory().unwrap());
        let reconciler = fx.reconciler(false, Some(store.clone()));
        reconciler.scan_all().await;
        assert_eq!(
            store.find_by_folder("Show").unwrap().unwrap().cover_ref,
            "/hls/Show/cover.jpg"
        );

        std::fs::remove_file(fx.default_root.join("Show/cover.jpg")).unwrap();
        std::fs::write(fx.default_root.join("Show/cover.webp"), b"x").unwrap();

        let entries = reconciler.list_entries_from_store().await;
        assert_eq!(entries[0].cover_ref, "/hls/Show/cover.webp");
        assert_eq!(
            store.find_by_folder("Show").unwrap().unwrap().cover_ref,
            "/hls/Show/cover.webp"
        );
    }

    #[tokio::test]
    async fn test_search_filesystem_mode() {
        let fx = Fixture::new();
        episode(&fx.default_root, "Cowboy Bebop", "1");
        episode(&fx.default_root, "Trigun", "1");
        let reconciler = fx.reconciler(false, None);

        let found = reconciler.search("BEBOP").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Cowboy Bebop");
    }

    #[tokio::test]
    async fn test_list_videos_across_volumes() {
        let fx = Fixture::new();
        episode(&fx.disk1, "Show", "ep02");
        episode(&fx.disk2, "Show", "ep01");
        let reconciler = fx.reconciler(true, None);

        let videos = reconciler.list_videos("Show").await.unwrap();
        let names: Vec<&str> = videos.iter().map(|v| v.display_name.as_str()).collect();
        assert_eq!(names, vec!["ep01", "ep02"]);
        assert_eq!(videos[0].logical_path, "/storage/disk2/Show/ep01/playlist.m3u8");
        assert!(videos[0].physical_path.is_file());
    }

    #[tokio::test]
    async fn test_delete_title_everywhere() {
        let fx = Fixture::new();
        episode(&fx.disk1, "Show", "1");
        std::fs::create_dir_all(fx.raw.join("Show")).unwrap();
        let store = Arc::new(SqliteCatalogStore::in_memory().unwrap());
        let reconciler = fx.reconciler(true, Some(store.clone()));
        reconciler.scan_all().await;

        let report = reconciler.delete_title("Show").await.unwrap();
        assert_eq!(report.removed_dirs.len(), 2);
        assert!(report.store_row_removed);
        assert!(!fx.disk1.join("Show").exists());
        assert!(!fx.raw.join("Show").exists());

        let report = reconciler.delete_title("Show").await.unwrap();
        assert!(report.removed_dirs.is_empty());
        assert!(!report.store_row_removed);
    }

    #[tokio::test]
    async fn test_list_raw_assets() {
        let fx = Fixture::new();
        std::fs::create_dir_all(fx.raw.join("Show")).unwrap();
        std::fs::write(fx.raw.join("Show/ep1.mp4"), b"x").unwrap();
        std::fs::write(fx.raw.join("Show/ep2.mkv"), b"x").unwrap();
        std::fs::write(fx.raw.join("Show/notes.txt"), b"x").unwrap();
        episode(&fx.default_root, "Show", "ep1");
        episode(&fx.default_root, "Old", "x");

        let reconciler = fx.reconciler(false, None);
        let assets = reconciler.list_raw_assets().await.unwrap();
        assert_eq!(
            assets,
            vec![
                "/hls/Show/ep1/playlist.m3u8".to_string(),
                "/static/videos/Show/ep2.mkv".to_string(),
                "/hls/Old/x/playlist.m3u8".to_string(),
            ]
        );
    }
}
