//! Integration tests for the browse API and the static surface.

mod common;

use axum::http::{header, StatusCode};
use common::{body_bytes, body_json, TestHarness};

fn library() -> TestHarness {
    let h = TestHarness::new("exit 0");
    h.mkdir("Movies/Classics");
    h.mkdir(".git");
    h.write("Movies/clip.mp4", "aac");
    h.write("Movies/dts.mp4", "dts");
    h.write("Movies/broken.webm", "!corrupt");
    h.write("Movies/film.mkv", "");
    h.write("Movies/poster.jpg", "");
    h.write("Movies/.DS_Store", "");
    h.write("readme.txt", "aac");
    h
}

#[tokio::test]
async fn browse_root_lists_directories_first() {
    let h = library();
    let resp = h.get("/api/browse").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp.into_body()).await;
    let names: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["Movies", "readme.txt"]);
    assert_eq!(json[0]["isDir"], true);
    assert_eq!(json[0]["path"], "Movies");
    assert_eq!(json[1]["isVideo"], false);
}

#[tokio::test]
async fn browse_classifies_each_file() {
    let h = library();
    let resp = h.get("/api/browse?path=Movies").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    let entry = |name: &str| {
        json.as_array()
            .unwrap()
            .iter()
            .find(|e| e["name"] == name)
            .cloned()
            .unwrap_or_else(|| panic!("missing {name}"))
    };

    let clip = entry("clip.mp4");
    assert_eq!(clip["path"], "Movies/clip.mp4");
    assert_eq!(clip["canPlay"], true);
    assert_eq!(clip["needsTranscode"], false);

    let dts = entry("dts.mp4");
    assert_eq!(dts["isVideo"], true);
    assert_eq!(dts["canPlay"], false);
    assert_eq!(dts["needsTranscode"], true);

    // Probe failures fall back to conversion.
    let broken = entry("broken.webm");
    assert_eq!(broken["canPlay"], false);
    assert_eq!(broken["needsTranscode"], true);

    let film = entry("film.mkv");
    assert_eq!(film["isVideo"], true);
    assert_eq!(film["needsTranscode"], true);

    let poster = entry("poster.jpg");
    assert_eq!(poster["isVideo"], false);
    assert_eq!(poster["canPlay"], false);

    let classics = entry("Classics");
    assert_eq!(classics["isDir"], true);
    assert_eq!(classics["isVideo"], false);

    assert!(json
        .as_array()
        .unwrap()
        .iter()
        .all(|e| !e["name"].as_str().unwrap().starts_with('.')));
}

#[tokio::test]
async fn browse_rejects_traversal() {
    let h = library();
    let resp = h.get("/api/browse?path=..%2F..%2Fetc").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["code"], "invalid_path");
}

#[tokio::test]
async fn browse_missing_directory_is_404() {
    let h = library();
    let resp = h.get("/api/browse?path=Nope").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn browse_file_is_400() {
    let h = library();
    let resp = h.get("/api/browse?path=readme.txt").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["code"], "not_a_directory");
}

#[tokio::test]
async fn index_serves_ui() {
    let h = library();
    let resp = h.get("/").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    let body = String::from_utf8(body_bytes(resp.into_body()).await).unwrap();
    assert!(body.contains("/api/browse"));
    assert!(body.contains("/api/stream/"));
}

#[tokio::test]
async fn health_and_status() {
    let h = library();
    assert_eq!(h.get("/health").await.status(), StatusCode::OK);

    let resp = h.get("/api/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["status"], "healthy");

    let json = body_json(h.get("/api/status").await.into_body()).await;
    assert!(json["active"].is_null());
}
