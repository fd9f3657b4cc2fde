//! Shared fixtures for the integration tests

#![allow(dead_code)]

use model_harvest::Config;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A mock model API plus a scratch directory
pub struct TestEnv {
    pub server: MockServer,
    pub temp_dir: TempDir,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
            temp_dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Config pointed at the mock server, writing under the scratch directory
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.api.base_url = self.server.uri();
        config.api.token = "integration-token".to_string();
        config.api.request_timeout = Duration::from_secs(5);
        config.storage.mesh_dir = self.root().join("models").join("stl");
        config.storage.gcode_dir = self.root().join("models").join("gcode");
        config.storage.max_file_size = 4096;
        config.retry.delay = Duration::from_millis(10);
        config
    }

    pub fn url(&self, name: &str) -> String {
        format!("{}/download/{}", self.server.uri(), name)
    }

    pub fn descriptor(&self, name: &str, size: u64) -> Value {
        json!({ "name": name, "size": size, "download_url": self.url(name) })
    }

    pub async fn thing(&self, id: u64, is_private: bool, is_purchased: bool) {
        Mock::given(method("GET"))
            .and(path(format!("/things/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "is_private": is_private,
                "is_purchased": is_purchased,
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn manifest(&self, id: u64, files: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/things/{id}/files")))
            .respond_with(ResponseTemplate::new(200).set_body_json(files))
            .mount(&self.server)
            .await;
    }

    pub async fn manifest_status(&self, id: u64, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/things/{id}/files")))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    pub async fn download(&self, name: &str, body: &[u8]) {
        Mock::given(method("GET"))
            .and(path(format!("/download/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(&self.server)
            .await;
    }

    /// Requests received for `request_path`
    pub async fn hits(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .count()
    }
}

/// Every regular file under `dir`, sorted
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}
