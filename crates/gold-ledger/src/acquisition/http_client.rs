//! Page fetcher.
//!
//! A thin wrapper over `reqwest::Client` that pins the user agent and
//! timeout and applies the fetch [`RetryPolicy`] to GET requests.

use crate::error::FetchError;
use crate::retry::RetryPolicy;
use std::time::Duration;
use tracing::{debug, info};

/// Desktop browser user agent; the page serves a stripped layout to unknown clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The requested URL.
    pub url: String,
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client used for page retrieval.
pub struct HttpClient {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, retry })
    }

    /// Issue a single GET and read the body, whatever the status.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let resp = self.client.get(url).send().await.map_err(transport)?;
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = resp.text().await.map_err(transport)?;

        debug!(url, status, bytes = body.len(), "GET complete");

        Ok(HttpResponse {
            url: url.to_string(),
            final_url,
            status,
            body,
        })
    }

    /// Fetch a page body, retrying transient failures.
    ///
    /// Any non-2xx status that survives the retry policy becomes
    /// [`FetchError::Status`].
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .retry
            .run("fetch page", || async move {
                let resp = self.get(url).await?;
                if resp.is_success() {
                    Ok(resp)
                } else {
                    Err(FetchError::Status {
                        url: url.to_string(),
                        status: resp.status,
                    })
                }
            })
            .await?;

        info!(
            url,
            final_url = %resp.final_url,
            bytes = resp.body.len(),
            "fetched page"
        );
        Ok(resp.body)
    }
}
