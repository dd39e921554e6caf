//! API tests against the in-process router with a mock transcoder.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{fixtures, TestConfig, TestFixture};

// ============================================================================
// Health and config
// ============================================================================

#[tokio::test]
async fn test_health_reports_catalog_mode() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "status", json!("ok"));
    assert_json_path!(response.body, "catalog_mode", json!("store"));

    let fixture = TestFixture::with_config(TestConfig::filesystem()).await;
    let response = fixture.get("/api/v1/health").await;
    assert_json_path!(response.body, "catalog_mode", json!("filesystem"));
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);
    assert!(response.body["database"].get("path").is_none());
    assert_eq!(
        response.body["library"]["output_dir"],
        json!(fixture.output_dir.display().to_string())
    );
    assert!(response.body.get("transcoder").is_none());
}

#[tokio::test]
async fn test_volumes_without_configured_volumes() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/volumes").await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "strategy", json!("least-used"));
    assert_eq!(response.body["volumes"], json!([]));

    let response = fixture.post_empty("/api/v1/volumes/refresh").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["volumes"], json!([]));
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_catalog_list_and_get() {
    let fixture = TestFixture::with_config(TestConfig::filesystem()).await;
    fixtures::write_episode(&fixture.output_dir, "Trigun", "ep2").unwrap();
    fixtures::write_episode(&fixture.output_dir, "Trigun", "ep1").unwrap();
    fixtures::write_cover(&fixture.output_dir.join("Trigun"), "cover.jpg").unwrap();

    let response = fixture.get("/api/v1/catalog").await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "total", json!(1));
    let entry = &response.body["entries"][0];
    assert_eq!(entry["folder_name"], "Trigun");
    assert_eq!(entry["episode_count"], 2);
    assert_eq!(entry["primary_video_ref"], "/hls/Trigun/ep1/playlist.m3u8");
    assert_eq!(entry["cover_ref"], "/hls/Trigun/cover.jpg");

    let response = fixture.get("/api/v1/catalog/Trigun").await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "title", json!("Trigun"));
}

#[tokio::test]
async fn test_catalog_get_unknown_and_invalid() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/catalog/Nothing").await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let response = fixture.get("/api/v1/catalog/..").await;
    assert!(
        response.status == StatusCode::BAD_REQUEST || response.status == StatusCode::NOT_FOUND,
        "unexpected status {:?}",
        response.status
    );
}

#[tokio::test]
async fn test_catalog_search() {
    let fixture = TestFixture::with_config(TestConfig::filesystem()).await;
    fixtures::write_episode(&fixture.output_dir, "Cowboy Bebop", "ep1").unwrap();
    fixtures::write_episode(&fixture.output_dir, "Trigun", "ep1").unwrap();

    let response = fixture.get("/api/v1/catalog/search?q=bebop").await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "total", json!(1));
    assert_eq!(response.body["entries"][0]["folder_name"], "Cowboy Bebop");
}

#[tokio::test]
async fn test_catalog_scan_accepted() {
    let fixture = TestFixture::new().await;
    let response = fixture.post_empty("/api/v1/catalog/scan").await;
    assert_status!(response, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_list_videos() {
    let fixture = TestFixture::new().await;
    fixtures::write_episode(&fixture.output_dir, "Show", "ep2").unwrap();
    fixtures::write_episode(&fixture.output_dir, "Show", "ep1").unwrap();

    let response = fixture.get("/api/v1/catalog/Show/videos").await;
    assert_status!(response, StatusCode::OK);
    let names: Vec<&str> = response.body["videos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["display_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["ep1", "ep2"]);
}

#[tokio::test]
async fn test_delete_entry() {
    let fixture = TestFixture::new().await;
    fixtures::write_episode(&fixture.output_dir, "Show", "ep1").unwrap();
    fixtures::write_raw_asset(&fixture.raw_dir, "Show", "ep2.mkv").unwrap();

    let response = fixture.delete("/api/v1/catalog/Show").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["removed_dirs"].as_array().unwrap().len(), 2);
    assert!(!fixture.output_dir.join("Show").exists());
    assert!(!fixture.raw_dir.join("Show").exists());

    let response = fixture.delete("/api/v1/catalog/Show").await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_assets() {
    let fixture = TestFixture::new().await;
    let raw = fixtures::write_raw_asset(&fixture.raw_dir, "Show", "ep1.mp4").unwrap();
    fixtures::write_episode(&fixture.output_dir, "Other", "ep1").unwrap();

    let response = fixture.get("/api/v1/assets").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(
        response.body["assets"],
        json!([raw, "/hls/Other/ep1/playlist.m3u8"])
    );
}

// ============================================================================
// Batch
// ============================================================================

#[tokio::test]
async fn test_batch_streams_events_with_job_id() {
    let fixture = TestFixture::new().await;
    let raw = fixtures::write_raw_asset(&fixture.raw_dir, "Show", "ep1.mp4").unwrap();

    let response = fixture
        .stream("POST", "/api/v1/batch", Some(json!({ "videos": [raw] })))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let job_id = response
        .headers
        .get("X-Job-ID")
        .and_then(|v| v.to_str().ok())
        .expect("missing job id header");
    assert!(!job_id.is_empty());

    let types = response.types();
    assert_eq!(types.first().map(String::as_str), Some("progress"));
    assert!(types.contains(&"success".to_string()));
    assert_eq!(types.last().map(String::as_str), Some("complete"));

    let summary = response.summary();
    assert_eq!(summary["total"], 1);
    assert_eq!(summary["success"], 1);
    assert_eq!(summary["failed"], 0);

    assert!(fixture.output_dir.join("Show/ep1/playlist.m3u8").is_file());
    assert!(!fixture.raw_dir.join("Show/ep1.mp4").exists());

    let entry = fixture.get("/api/v1/catalog/Show").await;
    assert_status!(entry, StatusCode::OK);

    // The job leaves the registry once it completes
    let jobs = fixture.get("/api/v1/jobs").await;
    assert_eq!(jobs.body["jobs"], json!([]));
}

#[tokio::test]
async fn test_batch_accepts_gpu_alias_and_falls_back() {
    let fixture = TestFixture::new().await;
    fixture.transcoder.set_fail_hardware(true).await;
    let raw = fixtures::write_raw_asset(&fixture.raw_dir, "Show", "ep1.mkv").unwrap();

    let response = fixture
        .stream(
            "POST",
            "/api/v1/batch",
            Some(json!({ "videos": [raw], "useGPU": true })),
        )
        .await;

    assert!(response.types().contains(&"warning".to_string()));
    assert_eq!(response.summary()["success"], 1);
    assert_eq!(fixture.transcoder.segment_jobs().await.len(), 2);
    // Only .mp4 sources are removed
    assert!(fixture.raw_dir.join("Show/ep1.mkv").exists());
}

#[tokio::test]
async fn test_batch_reports_failures_and_skips() {
    let fixture = TestFixture::new().await;
    fixture.transcoder.fail_assets_matching("broken").await;
    let done = fixtures::write_raw_asset(&fixture.raw_dir, "Show", "ep1.mp4").unwrap();
    fixtures::write_episode(&fixture.output_dir, "Show", "ep1").unwrap();
    let broken = fixtures::write_raw_asset(&fixture.raw_dir, "Show", "broken.mp4").unwrap();

    let response = fixture
        .stream(
            "POST",
            "/api/v1/batch",
            Some(json!({ "videos": [done, broken] })),
        )
        .await;

    let summary = response.summary();
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["skipped"], 1);
    assert_eq!(summary["failed"], 1);
    assert_eq!(summary["errors"].as_array().unwrap().len(), 1);
    assert!(response.types().contains(&"skipped".to_string()));
    assert!(response.types().contains(&"error".to_string()));
}

#[tokio::test]
async fn test_empty_batch_rejected() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post("/api/v1/batch", json!({ "videos": [] }))
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stop_unknown_and_invalid_job() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_empty("/api/v1/batch/stop?jobId=0190b3c2-7d4e-7a1b-8c3d-123456789abc")
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let response = fixture.post_empty("/api/v1/batch/stop?jobId=not-a-job").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Repair
// ============================================================================

#[tokio::test]
async fn test_repair_streams_results() {
    let fixture = TestFixture::new().await;
    fixtures::write_episode(&fixture.output_dir, "Show", "ep1").unwrap();
    std::fs::create_dir_all(fixture.output_dir.join("Show/ep2")).unwrap();

    let response = fixture.stream("POST", "/api/v1/repair", None).await;
    assert_eq!(response.status, StatusCode::OK);

    let summary = response.summary();
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["success"], 1);
    assert_eq!(summary["failed"], 1);

    assert!(fixture.repair_dir.join("Show/ep1/playlist.m3u8").is_file());
    assert!(!fixture.output_dir.join("Show/ep1").exists());
    // An episode without a playlist is reported, never touched
    assert!(fixture.output_dir.join("Show/ep2").is_dir());
}

#[tokio::test]
async fn test_repair_with_nothing_to_do() {
    let fixture = TestFixture::new().await;
    let response = fixture.stream("GET", "/api/v1/repair", None).await;
    assert_eq!(response.types(), vec!["complete".to_string()]);
    assert_eq!(response.summary()["total"], 0);
}
