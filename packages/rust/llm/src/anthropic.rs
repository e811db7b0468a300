//! Anthropic Messages API backend.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use seoranker_shared::{ProviderKind, Result, SeoRankerError};

use crate::provider::{TextGenerator, clamp_max_tokens, http_client, model_output_limit};

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

pub struct AnthropicGenerator {
    http: Client,
    api_key: String,
    model: String,
    temperature: f32,
    base_url: String,
}

impl AnthropicGenerator {
    pub fn new(api_key: &str, model: &str, temperature: f32) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(SeoRankerError::Generation("anthropic API key is empty".into()));
        }
        Ok(Self {
            http: http_client()?,
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
            base_url: ANTHROPIC_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| SeoRankerError::Generation(format!("invalid API key header: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    fn name(&self) -> String {
        format!("anthropic/{}", self.model)
    }

    fn max_output_tokens(&self) -> u32 {
        model_output_limit(ProviderKind::Anthropic, &self.model)
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let max_tokens = clamp_max_tokens(max_tokens, self.max_output_tokens());
        debug!(model = %self.model, max_tokens, prompt_chars = prompt.len(), "anthropic request");

        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            temperature: self.temperature,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| SeoRankerError::Generation(format!("anthropic: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SeoRankerError::Generation(format!(
                "anthropic API error ({status}): {error_text}"
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| SeoRankerError::Generation(format!("anthropic response: {e}")))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .map(|b| b.text)
            .collect();

        if text.trim().is_empty() {
            return Err(SeoRankerError::Generation("anthropic returned no text".into()));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn sends_messages_request_and_joins_text_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(serde_json::json!({
                "model": "claude-3-sonnet-20240229",
                "max_tokens": 4096
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [
                    {"type": "text", "text": "<metadata>"},
                    {"type": "text", "text": "</metadata>"}
                ]
            })))
            .mount(&server)
            .await;

        let generator = AnthropicGenerator::new("sk-ant-test", "claude-3-sonnet-20240229", 0.7)
            .unwrap()
            .with_base_url(&server.uri());
        let text = generator.generate("write", 10_000).await.unwrap();
        assert_eq!(text, "<metadata></metadata>");
    }

    #[tokio::test]
    async fn api_error_is_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let generator = AnthropicGenerator::new("k", "claude-3-sonnet-20240229", 0.7)
            .unwrap()
            .with_base_url(&server.uri());
        let err = generator.generate("write", 100).await.unwrap_err();
        assert!(matches!(err, SeoRankerError::Generation(ref m) if m.contains("overloaded")));
    }

    #[test]
    fn empty_key_fails_init() {
        assert!(AnthropicGenerator::new("  ", "m", 0.7).is_err());
    }
}
