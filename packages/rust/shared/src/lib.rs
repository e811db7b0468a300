//! Shared types, error model, and configuration for SEO Ranker.
//!
//! This crate is the foundation depended on by all other SEO Ranker crates.
//! It provides:
//! - [`SeoRankerError`]: the unified error type
//! - Domain types ([`ContentRecord`], [`ContentStatus`], [`ReferenceDocument`], ...)
//! - Configuration ([`AppConfig`], [`Credentials`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BrandConfig, CONFIG_FILE_NAME, Credentials, CredentialsConfig, GenerationConfig,
    PathsConfig, PipelineConfig, ProviderConfig, ProviderKind, PublishConfig, RetrievalConfig,
    ShopifyCredentials, config_dir, init_config, load_config, load_config_from,
};
pub use error::{Result, SeoRankerError};
pub use types::{
    ContentRecord, ContentStatus, GeneratedDraft, RawContentEntry, ReferenceDocument, SourceType,
    Suggestion, normalize_keyword,
};
