//! Async HTTP client wrapping reqwest.
//!
//! One client is built per run and shared read-only by every job. Each
//! request carries the configured timeout. There are no retries: a timeout
//! or error status is that job's failure and the caller decides whether to
//! re-run.

use crate::error::ScrapeError;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// HTTP client for the scrape jobs.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client with a standard browser user-agent.
    pub fn new(timeout_ms: u64) -> Self {
        let ua = "Mozilla/5.0 (X11; Linux x86_64) \
                  AppleWebKit/537.36 (KHTML, like Gecko) \
                  Chrome/131.0.0.0 Safari/537.36";
        let timeout = Duration::from_millis(timeout_ms);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(ua)
            .build()
            .unwrap_or_default();

        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET a document body. Non-2xx statuses are returned as errors.
    pub async fn get_text(&self, url: &Url) -> Result<String, ScrapeError> {
        debug!("GET {url}");
        let r = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| ScrapeError::Network {
                url: url.to_string(),
                source,
            })?;

        if !r.status().is_success() {
            return Err(ScrapeError::HttpStatus {
                url: url.to_string(),
                status: r.status().as_u16(),
            });
        }
        if r.url() != url {
            debug!("{url} redirected to {}", r.url());
        }

        r.text().await.map_err(|source| ScrapeError::Network {
            url: url.to_string(),
            source,
        })
    }

    /// GET a JSON document and decode it.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ScrapeError> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body)
            .map_err(|e| ScrapeError::Parse(format!("invalid JSON from {url}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_http_client_creation() {
        let client = HttpClient::new(2500);
        assert_eq!(client.timeout(), Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn test_get_text_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>VVZ</h1>"))
            .mount(&server)
            .await;

        let client = HttpClient::new(5000);
        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        assert_eq!(client.get_text(&url).await.unwrap(), "<h1>VVZ</h1>");
    }

    #[tokio::test]
    async fn test_error_status_is_network_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HttpClient::new(5000);
        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let err = client.get_text(&url).await.unwrap_err();
        assert!(matches!(err, ScrapeError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_timeout_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(800)))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(100);
        let url = Url::parse(&format!("{}/slow", server.uri())).unwrap();
        let err = client.get_text(&url).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Network { .. }));
    }

    #[tokio::test]
    async fn test_get_json_rejects_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let client = HttpClient::new(5000);
        let url = Url::parse(&format!("{}/data", server.uri())).unwrap();
        let err = client.get_json::<serde_json::Value>(&url).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Parse(_)));
    }
}
