//! Page fetching with a spoofed client identity.
//!
//! One [`PageFetcher`] serves both the HTML fetches (landing page, article
//! pages) and the raw byte fetches the image resolver needs. Every request
//! carries the configured `User-Agent` and the configured timeout; a
//! non-success status and a transport failure surface as distinct
//! [`FetchError`] variants. The fetcher never retries. Whether a failed
//! fetch kills the run or only one article is the caller's decision.

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::config::FetchConfig;
use crate::error::FetchError;

/// HTTP GET collaborator shared across the pipeline.
///
/// Cloning is cheap; the underlying client is reference-counted.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    /// Fetch a page and return its markup.
    #[instrument(level = "debug", skip_all, fields(url = %url))]
    pub async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let response = self.get(url).await?;
        let markup = response
            .text()
            .await
            .map_err(|e| FetchError::transport(url, e))?;
        debug!(bytes = markup.len(), "Fetched page");
        Ok(markup)
    }

    /// Fetch a resource and return its raw bytes. Used for images.
    #[instrument(level = "debug", skip_all, fields(url = %url))]
    pub async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self.get(url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::transport(url, e))?;
        debug!(bytes = bytes.len(), "Fetched resource");
        Ok(bytes.to_vec())
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> PageFetcher {
        PageFetcher::new(&FetchConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_markup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let markup = fetcher().fetch(&url).await.unwrap();
        assert_eq!(markup, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_sends_configured_user_agent() {
        let server = MockServer::start().await;
        let config = FetchConfig {
            user_agent: "punch-test-agent".to_string(),
            ..FetchConfig::default()
        };
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("user-agent", "punch-test-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        PageFetcher::new(&config).unwrap().fetch(&url).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_status_is_a_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let err = fetcher().fetch(&url).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Status { status, .. } if status == reqwest::StatusCode::NOT_FOUND
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_transport_error() {
        // Reserved TEST-NET-1 address, nothing listens there.
        let url = Url::parse("http://192.0.2.1:9/").unwrap();
        let config = FetchConfig { timeout_secs: 1, ..FetchConfig::default() };
        let err = PageFetcher::new(&config).unwrap().fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }
}
