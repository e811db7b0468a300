//! OpenAI-compatible chat-completions backend (Groq, local servers).

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use seoranker_shared::{ProviderKind, Result, SeoRankerError};

use crate::provider::{TextGenerator, clamp_max_tokens, http_client, model_output_limit};

pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiCompatGenerator {
    http: Client,
    provider: ProviderKind,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    base_url: String,
}

impl OpenAiCompatGenerator {
    /// Groq cloud backend; requires an API key.
    pub fn groq(api_key: &str, model: &str, temperature: f32) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(SeoRankerError::Generation("groq API key is empty".into()));
        }
        Ok(Self {
            http: http_client()?,
            provider: ProviderKind::Groq,
            api_key: Some(api_key.to_string()),
            model: model.to_string(),
            temperature,
            base_url: GROQ_API_URL.to_string(),
        })
    }

    /// Local OpenAI-compatible server; no key.
    pub fn local(base_url: &str, model: &str, temperature: f32) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            provider: ProviderKind::Local,
            api_key: None,
            model: model.to_string(),
            temperature,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                    SeoRankerError::Generation(format!("invalid API key header: {e}"))
                })?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatGenerator {
    fn name(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }

    fn max_output_tokens(&self) -> u32 {
        model_output_limit(self.provider, &self.model)
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let max_tokens = clamp_max_tokens(max_tokens, self.max_output_tokens());
        debug!(provider = %self.provider, model = %self.model, max_tokens, "chat completion request");

        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| SeoRankerError::Generation(format!("{}: {e}", self.provider)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SeoRankerError::Generation(format!(
                "{} API error ({status}): {error_text}",
                self.provider
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            SeoRankerError::Generation(format!("{} response: {e}", self.provider))
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(SeoRankerError::Generation(format!(
                "{} returned no text",
                self.provider
            )));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(text: &str) -> serde_json::Value {
        serde_json::json!({"choices": [{"message": {"role": "assistant", "content": text}}]})
    }

    #[tokio::test]
    async fn groq_sends_bearer_and_clamps() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer gsk-test"))
            .and(body_partial_json(serde_json::json!({"max_tokens": 32768})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("hello")))
            .mount(&server)
            .await;

        let generator = OpenAiCompatGenerator::groq("gsk-test", "mixtral-8x7b-32768", 0.7)
            .unwrap()
            .with_base_url(&server.uri());
        assert_eq!(generator.name(), "groq/mixtral-8x7b-32768");
        assert_eq!(generator.generate("hi", 100_000).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn local_server_needs_no_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "llama-3.2-3b-instruct"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("local text")))
            .mount(&server)
            .await;

        let generator = OpenAiCompatGenerator::local(
            &format!("{}/v1/", server.uri()),
            "llama-3.2-3b-instruct",
            0.7,
        )
        .unwrap();
        assert_eq!(generator.generate("hi", 0).await.unwrap(), "local text");
    }

    #[tokio::test]
    async fn empty_choice_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let generator = OpenAiCompatGenerator::local(&server.uri(), "m", 0.7).unwrap();
        assert!(generator.generate("hi", 10).await.is_err());
    }
}
