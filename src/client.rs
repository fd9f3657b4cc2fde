//! HTTP client for the model API
//!
//! One [`ApiClient`] wraps one `reqwest::Client`, so every request of a run shares the
//! same connection pool. Every request carries the bearer token, file transfers
//! included, and every non-success status is turned into [`FetchError::Status`].

use crate::config::ApiConfig;
use crate::error::{Error, FetchError, Result};
use crate::types::{RemoteFile, ThingId, ThingInfo};
use serde::de::DeserializeOwned;

/// Authenticated client for `GET {base}/things/{id}` and `GET {base}/things/{id}/files`
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// Build a client from the API configuration
    ///
    /// The configuration is expected to be validated already; an unusable TLS backend
    /// is the only failure left here.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// URL of a thing's metadata
    pub fn thing_url(&self, id: ThingId) -> String {
        format!("{}/things/{}", self.base_url, id)
    }

    /// URL of a thing's file manifest
    pub fn files_url(&self, id: ThingId) -> String {
        format!("{}/things/{}/files", self.base_url, id)
    }

    /// Fetch the metadata carrying the accessibility flags
    pub async fn thing_info(&self, id: ThingId) -> std::result::Result<ThingInfo, FetchError> {
        self.get_json(&self.thing_url(id)).await
    }

    /// Fetch the file manifest
    pub async fn list_files(
        &self,
        id: ThingId,
    ) -> std::result::Result<Vec<RemoteFile>, FetchError> {
        self.get_json(&self.files_url(id)).await
    }

    /// Authenticated GET that fails on any non-success status
    ///
    /// Redirects are followed. The body is left unread so callers can stream it.
    pub async fn get(&self, url: &str) -> std::result::Result<reqwest::Response, FetchError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> std::result::Result<T, FetchError> {
        let response = self.get(url).await?;
        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;

        serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        let config = ApiConfig {
            base_url: format!("{}/", server.uri()),
            token: "test-token".into(),
            ..Default::default()
        };
        ApiClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn urls_are_built_without_double_slashes() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        assert_eq!(
            client.thing_url(ThingId(42)),
            format!("{}/things/42", server.uri())
        );
        assert_eq!(
            client.files_url(ThingId(42)),
            format!("{}/things/42/files", server.uri())
        );
    }

    #[tokio::test]
    async fn thing_info_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/things/7"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 7,
                "is_private": false,
                "is_purchased": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let info = client_for(&server).thing_info(ThingId(7)).await.unwrap();
        assert!(!info.is_private);
        assert!(info.is_purchased);
    }

    #[tokio::test]
    async fn non_success_status_is_a_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/things/8/files"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client_for(&server).list_files(ThingId(8)).await.unwrap_err();
        match err {
            FetchError::Status { status, url } => {
                assert_eq!(status, 403);
                assert!(url.ends_with("/things/8/files"));
            }
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/things/9/files"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).list_files(ThingId(9)).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let config = ApiConfig {
            // Port 9 (discard) on localhost is closed in test environments
            base_url: "http://127.0.0.1:9".into(),
            token: "t".into(),
            request_timeout: std::time::Duration::from_secs(5),
            ..Default::default()
        };
        let client = ApiClient::new(&config).unwrap();
        let err = client.thing_info(ThingId(1)).await.unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }), "got {err:?}");
    }
}
