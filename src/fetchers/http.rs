use crate::error::{CriticalError, Result};
use crate::fetchers::HtmlFetcher;
use std::time::Duration;

/// Fetches pages over HTTP with a single shared client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher without a request timeout
    pub fn new() -> Result<Self> {
        Self::build(None)
    }

    /// Create a fetcher whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl HtmlFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        ::log::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CriticalError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        Ok(response.text().await?)
    }
}
