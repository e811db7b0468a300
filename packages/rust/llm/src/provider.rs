//! The text-generation seam and per-model output limits.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use seoranker_shared::{ProviderKind, Result, SeoRankerError};

/// Generation calls can run for minutes on long drafts.
pub(crate) const GENERATION_TIMEOUT: Duration = Duration::from_secs(300);

/// A text-generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Human-readable `provider/model` label for logs.
    fn name(&self) -> String;

    /// Largest output ceiling this backend accepts.
    fn max_output_tokens(&self) -> u32;

    /// Generate a completion for `prompt`. `max_tokens` above the model
    /// limit (or zero) is clamped to the limit.
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

/// Output-token ceiling for a provider/model pair.
pub fn model_output_limit(provider: ProviderKind, model: &str) -> u32 {
    match provider {
        ProviderKind::Anthropic => 4096,
        ProviderKind::Groq if model.contains("32768") => 32_768,
        ProviderKind::Groq => 8192,
        ProviderKind::Local => 4096,
    }
}

/// Clamp a requested ceiling to `limit`; zero means "use the limit".
pub fn clamp_max_tokens(requested: u32, limit: u32) -> u32 {
    if requested == 0 || requested > limit {
        limit
    } else {
        requested
    }
}

pub(crate) fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("SEORanker/", env!("CARGO_PKG_VERSION")))
        .timeout(GENERATION_TIMEOUT)
        .build()
        .map_err(|e| SeoRankerError::Generation(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_model_limit() {
        assert_eq!(clamp_max_tokens(8000, 4096), 4096);
        assert_eq!(clamp_max_tokens(0, 4096), 4096);
        assert_eq!(clamp_max_tokens(2500, 4096), 2500);
    }

    #[test]
    fn known_limits() {
        assert_eq!(
            model_output_limit(ProviderKind::Groq, "mixtral-8x7b-32768"),
            32_768
        );
        assert_eq!(
            model_output_limit(ProviderKind::Anthropic, "claude-3-sonnet-20240229"),
            4096
        );
        assert_eq!(
            model_output_limit(ProviderKind::Local, "llama-3.2-3b-instruct"),
            4096
        );
    }
}
