//! Ordered provider fallback.

use async_trait::async_trait;
use tracing::{info, warn};

use seoranker_shared::{
    Credentials, GenerationConfig, ProviderConfig, ProviderKind, Result, SeoRankerError,
};

use crate::anthropic::AnthropicGenerator;
use crate::openai::OpenAiCompatGenerator;
use crate::provider::TextGenerator;

/// Tries each generator in order until one succeeds.
pub struct ProviderChain {
    links: Vec<Box<dyn TextGenerator>>,
}

impl ProviderChain {
    pub fn new(links: Vec<Box<dyn TextGenerator>>) -> Self {
        Self { links }
    }

    /// Build primary → configured fallbacks → local.
    ///
    /// Links that cannot be constructed (missing key, bad client) are
    /// skipped with a warning. Fails only if nothing could be built.
    pub fn from_config(config: &GenerationConfig, credentials: &Credentials) -> Result<Self> {
        let mut order: Vec<ProviderConfig> = Vec::with_capacity(config.fallbacks.len() + 2);
        order.push(ProviderConfig {
            provider: config.provider,
            model: config.model.clone(),
        });
        order.extend(config.fallbacks.iter().cloned());
        order.push(ProviderConfig {
            provider: ProviderKind::Local,
            model: config.local_model.clone(),
        });
        // Drop repeats, keeping the first position.
        let mut seen = Vec::new();
        order.retain(|p| {
            if seen.contains(p) {
                false
            } else {
                seen.push(p.clone());
                true
            }
        });

        let mut links: Vec<Box<dyn TextGenerator>> = Vec::new();
        for entry in &order {
            match build_link(entry, config, credentials) {
                Ok(link) => links.push(link),
                Err(e) => warn!(
                    provider = %entry.provider,
                    model = %entry.model,
                    error = %e,
                    "skipping provider"
                ),
            }
        }

        if links.is_empty() {
            return Err(SeoRankerError::config(
                "no text-generation provider could be initialized",
            ));
        }
        info!(
            chain = ?links.iter().map(|l| l.name()).collect::<Vec<_>>(),
            "generation providers ready"
        );
        Ok(Self { links })
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

fn build_link(
    entry: &ProviderConfig,
    config: &GenerationConfig,
    credentials: &Credentials,
) -> Result<Box<dyn TextGenerator>> {
    let key = credentials.generation_api_key(entry.provider)?;
    let temperature = config.temperature;
    Ok(match entry.provider {
        ProviderKind::Anthropic => Box::new(AnthropicGenerator::new(
            key.unwrap_or_default(),
            &entry.model,
            temperature,
        )?),
        ProviderKind::Groq => Box::new(OpenAiCompatGenerator::groq(
            key.unwrap_or_default(),
            &entry.model,
            temperature,
        )?),
        ProviderKind::Local => Box::new(OpenAiCompatGenerator::local(
            &config.local_base_url,
            &entry.model,
            temperature,
        )?),
    })
}

#[async_trait]
impl TextGenerator for ProviderChain {
    fn name(&self) -> String {
        self.links
            .iter()
            .map(|l| l.name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    fn max_output_tokens(&self) -> u32 {
        self.links
            .iter()
            .map(|l| l.max_output_tokens())
            .max()
            .unwrap_or(0)
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let mut failures = Vec::new();
        for link in &self.links {
            match link.generate(prompt, max_tokens).await {
                Ok(text) => {
                    info!(provider = %link.name(), chars = text.len(), "generation succeeded");
                    return Ok(text);
                }
                Err(e) => {
                    warn!(provider = %link.name(), error = %e, "provider failed, trying next");
                    failures.push(format!("{}: {e}", link.name()));
                }
            }
        }
        Err(SeoRankerError::Generation(format!(
            "all providers failed ({})",
            failures.join("; ")
        )))
    }
}
