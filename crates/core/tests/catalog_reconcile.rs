//! Catalog reconciliation across volumes with a file-backed store.

use std::sync::Arc;

use tempfile::TempDir;

use reelhouse_core::{
    catalog::{CatalogReconciler, CatalogStore, SqliteCatalogStore},
    config::LibraryConfig,
    storage::{StorageConfig, VolumeAllocator},
    testing::fixtures,
};

struct TestFixture {
    temp_dir: TempDir,
    allocator: Arc<VolumeAllocator>,
    library: LibraryConfig,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path();
        let storage = StorageConfig::default()
            .with_volume("disk1", root.join("disk1"))
            .with_volume("disk2", root.join("disk2"));
        for dir in ["disk1", "disk2", "hls", "videos"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        let library = LibraryConfig {
            raw_dir: root.join("videos"),
            output_dir: root.join("hls"),
            ..Default::default()
        };
        let allocator = Arc::new(VolumeAllocator::new(&storage, root.join("hls")));
        Self {
            temp_dir,
            allocator,
            library,
        }
    }

    fn reconciler(&self, store: Option<Arc<dyn CatalogStore>>) -> CatalogReconciler {
        CatalogReconciler::new(store, self.allocator.clone(), self.library.clone(), 2)
    }
}

#[tokio::test]
async fn test_repeated_scans_are_idempotent() {
    let fx = TestFixture::new();
    let disk1 = fx.temp_dir.path().join("disk1");
    let disk2 = fx.temp_dir.path().join("disk2");
    for title in ["Alpha", "Beta", "Gamma"] {
        fixtures::write_episode(&disk1, title, "ep1").unwrap();
    }
    fixtures::write_episode(&disk2, "Delta", "ep1").unwrap();
    fixtures::write_cover(&disk2.join("Delta"), "cover.jpg").unwrap();

    let db = fx.temp_dir.path().join("catalog.db");
    let store = Arc::new(SqliteCatalogStore::new(&db).unwrap());
    let reconciler = fx.reconciler(Some(store.clone()));

    let first = reconciler.scan_all().await;
    let second = reconciler.scan_all().await;

    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
    assert_eq!(store.list().unwrap().len(), 4);

    let delta = store.find_by_folder("Delta").unwrap().unwrap();
    assert_eq!(delta.hosting_volume.as_deref(), Some("disk2"));
    assert_eq!(delta.cover_ref, "/storage/disk2/Delta/cover.jpg");
}

#[tokio::test]
async fn test_filesystem_mode_matches_store_mode() {
    let fx = TestFixture::new();
    let disk1 = fx.temp_dir.path().join("disk1");
    fixtures::write_episode(&disk1, "Alpha", "ep2").unwrap();
    fixtures::write_episode(&disk1, "Alpha", "ep1").unwrap();

    let with_store = fx
        .reconciler(Some(Arc::new(SqliteCatalogStore::in_memory().unwrap())))
        .scan_all()
        .await;
    let without = fx.reconciler(None).scan_all().await;

    assert_eq!(with_store, without);
    assert_eq!(without[0].episode_count, 2);
    assert_eq!(
        without[0].primary_video_ref,
        "/storage/disk1/Alpha/ep1/playlist.m3u8"
    );
}

#[tokio::test]
async fn test_scan_subset_refreshes_changed_title() {
    let fx = TestFixture::new();
    let disk1 = fx.temp_dir.path().join("disk1");
    fixtures::write_episode(&disk1, "Alpha", "ep1").unwrap();

    let store = Arc::new(SqliteCatalogStore::in_memory().unwrap());
    let reconciler = fx.reconciler(Some(store.clone()));
    reconciler.scan_all().await;

    fixtures::write_episode(&disk1, "Alpha", "ep2").unwrap();
    reconciler.scan_subset(&["Alpha".to_string()]).await;

    assert_eq!(
        store.find_by_folder("Alpha").unwrap().unwrap().episode_count,
        2
    );
}
