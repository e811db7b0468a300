//! Content-extraction service: trait plus an Exa-compatible client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use seoranker_shared::{Result, SeoRankerError};

use crate::USER_AGENT;

/// Clean text extracted from one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub url: String,
    pub title: String,
    pub text: String,
}

#[async_trait]
pub trait ExtractionService: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ExtractedPage>;
}

#[derive(Debug, Serialize)]
struct ContentsRequest<'a> {
    urls: [&'a str; 1],
    text: bool,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    results: Vec<ContentsResult>,
}

#[derive(Debug, Deserialize)]
struct ContentsResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Exa-compatible extraction client (`POST {base}/contents`).
pub struct ExaClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ExaClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SeoRankerError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl ExtractionService for ExaClient {
    async fn extract(&self, url: &str) -> Result<ExtractedPage> {
        debug!(url, "extraction request");

        let response = self
            .client
            .post(format!("{}/contents", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&ContentsRequest {
                urls: [url],
                text: true,
            })
            .send()
            .await
            .map_err(|e| SeoRankerError::Network(format!("extract {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SeoRankerError::Network(format!(
                "extract {url}: HTTP {status}: {body}"
            )));
        }

        let parsed: ContentsResponse = response
            .json()
            .await
            .map_err(|e| SeoRankerError::parse(format!("extract {url}: {e}")))?;

        let result = parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| SeoRankerError::Network(format!("extract {url}: no content returned")))?;

        let text = result.text.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(SeoRankerError::Network(format!("extract {url}: empty text")));
        }

        Ok(ExtractedPage {
            url: if result.url.is_empty() {
                url.to_string()
            } else {
                result.url
            },
            title: result.title.unwrap_or_default(),
            text,
        })
    }
}
