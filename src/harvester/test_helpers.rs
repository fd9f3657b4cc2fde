//! Shared test helpers for creating Harvester instances against a mock API.

use crate::config::{Config, GcodeNaming};
use crate::harvester::Harvester;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create a test Harvester pointed at `server`, writing into a tempdir.
/// Returns the harvester and the tempdir (which must be kept alive).
///
/// Retries keep the default three attempts but pause only 10ms between them.
pub(crate) async fn create_test_harvester(server: &MockServer) -> (Harvester, tempfile::TempDir) {
    create_test_harvester_with(server, |_| {}).await
}

/// Like [`create_test_harvester`], with a hook to adjust the config first
pub(crate) async fn create_test_harvester_with(
    server: &MockServer,
    adjust: impl FnOnce(&mut Config),
) -> (Harvester, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(server, temp_dir.path());
    adjust(&mut config);

    let harvester = Harvester::new(config).await.unwrap();
    (harvester, temp_dir)
}

/// Config pointed at the mock server with output under `root`
pub(crate) fn test_config(server: &MockServer, root: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.api.token = "test-token".to_string();
    config.api.request_timeout = Duration::from_secs(5);
    config.storage.mesh_dir = root.join("stl");
    config.storage.gcode_dir = root.join("gcode");
    config.storage.max_file_size = 1024;
    config.storage.gcode_naming = GcodeNaming::Shared;
    config.retry.delay = Duration::from_millis(10);
    config
}

/// Serve the thing metadata for `id`
pub(crate) async fn mount_thing(server: &MockServer, id: u64, is_private: bool, is_purchased: bool) {
    Mock::given(method("GET"))
        .and(path(format!("/things/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": id,
            "name": format!("Thing {id}"),
            "is_private": is_private,
            "is_purchased": is_purchased,
        })))
        .mount(server)
        .await;
}

/// Serve a public, free thing
pub(crate) async fn mount_public_thing(server: &MockServer, id: u64) {
    mount_thing(server, id, false, false).await;
}

/// Serve the file manifest for `id`
pub(crate) async fn mount_manifest(server: &MockServer, id: u64, files: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/things/{id}/files")))
        .respond_with(ResponseTemplate::new(200).set_body_json(files))
        .mount(server)
        .await;
}

/// Serve `body` at `/download/{name}`, expecting exactly `times` requests
pub(crate) async fn mount_download(server: &MockServer, name: &str, body: &[u8], times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/download/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(times)
        .mount(server)
        .await;
}

/// Manifest entry whose download URL points back at the mock server
pub(crate) fn descriptor(server: &MockServer, name: &str, size: u64) -> serde_json::Value {
    serde_json::json!({
        "id": 1,
        "name": name,
        "size": size,
        "download_url": download_url(server, name),
    })
}

/// `/download/{name}` on the mock server
pub(crate) fn download_url(server: &MockServer, name: &str) -> String {
    format!("{}/download/{}", server.uri(), name)
}
