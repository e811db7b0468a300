//! Text-generation providers for SEO Ranker.
//!
//! - [`TextGenerator`]: the provider seam
//! - [`AnthropicGenerator`]: Anthropic Messages API
//! - [`OpenAiCompatGenerator`]: Groq and local OpenAI-compatible servers
//! - [`ProviderChain`]: ordered fallback over any generators

pub mod anthropic;
pub mod chain;
pub mod openai;
pub mod provider;

pub use anthropic::AnthropicGenerator;
pub use chain::ProviderChain;
pub use openai::OpenAiCompatGenerator;
pub use provider::{TextGenerator, clamp_max_tokens, model_output_limit};
