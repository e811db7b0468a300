//! Web-search service: trait plus a SerpAPI-compatible client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use seoranker_shared::{Result, SeoRankerError};

use crate::USER_AGENT;

/// One regular organic result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub position: Option<u32>,
}

/// One entry from the question-style ("people also ask") panel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuestionHit {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// Results of one search query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchResponse {
    #[serde(default, rename = "organic_results")]
    pub organic: Vec<SearchHit>,
    #[serde(default, rename = "related_questions")]
    pub questions: Vec<QuestionHit>,
    #[serde(default)]
    error: Option<String>,
}

impl SearchResponse {
    pub fn new(organic: Vec<SearchHit>, questions: Vec<QuestionHit>) -> Self {
        Self {
            organic,
            questions,
            error: None,
        }
    }
}

#[async_trait]
pub trait SearchService: Send + Sync {
    /// Run one query, asking for at most `num` organic results.
    async fn search(&self, query: &str, num: u32) -> Result<SearchResponse>;
}

/// SerpAPI-compatible search client (`GET {base}/search.json`).
pub struct SerpApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SerpApiClient {
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
impl SearchService for SerpApiClient {
    async fn search(&self, query: &str, num: u32) -> Result<SearchResponse> {
        let url = format!("{}/search.json", self.base_url);
        let num_param = num.to_string();
        debug!(query, num, "search request");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("num", num_param.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SeoRankerError::Network(format!("search '{query}': {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SeoRankerError::Network(format!(
                "search '{query}': HTTP {status}: {body}"
            )));
        }

        let mut parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SeoRankerError::parse(format!("search '{query}': {e}")))?;

        if let Some(error) = parsed.error.take() {
            if parsed.organic.is_empty() && parsed.questions.is_empty() {
                return Err(SeoRankerError::Network(format!("search '{query}': {error}")));
            }
        }

        parsed.organic.truncate(num as usize);
        Ok(parsed)
    }
}
