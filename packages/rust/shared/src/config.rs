//! Application configuration for SEO Ranker.
//!
//! Project config lives at `./seoranker.toml`, falling back to
//! `~/.seoranker/seoranker.toml`. CLI flags override config file values,
//! which override defaults. Secrets never live in the file: the
//! `[credentials]` section only names the environment variables to read.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeoRankerError};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "seoranker.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".seoranker";

// ---------------------------------------------------------------------------
// Config structs (matching seoranker.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub brand: BrandConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the flat-file stores.
    #[serde(default = "default_knowledge_base_dir")]
    pub knowledge_base_dir: PathBuf,

    /// Directory holding generated HTML artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            knowledge_base_dir: default_knowledge_base_dir(),
            output_dir: default_output_dir(),
        }
    }
}

impl PathsConfig {
    pub fn archive_path(&self) -> PathBuf {
        self.knowledge_base_dir.join("blog_archive.csv")
    }

    pub fn raw_content_path(&self) -> PathBuf {
        self.knowledge_base_dir.join("content_database.csv")
    }

    pub fn suggestions_path(&self) -> PathBuf {
        self.knowledge_base_dir.join("suggestions_database.csv")
    }
}

fn default_knowledge_base_dir() -> PathBuf {
    PathBuf::from("knowledge_base")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// `[retrieval]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Query variants; `{keyword}` is replaced with the keyword. The first
    /// word of each template labels the documents it surfaces.
    #[serde(default = "default_query_templates")]
    pub query_templates: Vec<String>,

    /// Result cap per query variant.
    #[serde(default = "default_results_per_query")]
    pub results_per_query: u32,

    /// Maximum reference documents returned per keyword.
    #[serde(default = "default_max_references")]
    pub max_references: usize,

    /// Pause between successive external calls, in ms.
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// E-commerce/transactional domains whose results are always dropped.
    #[serde(default = "default_denylist")]
    pub denylist: Vec<String>,

    /// Informational-content signal terms (case-insensitive).
    #[serde(default = "default_signal_terms")]
    pub signal_terms: Vec<String>,

    /// Search service base URL.
    #[serde(default = "default_search_base_url")]
    pub search_base_url: String,

    /// Content-extraction service base URL.
    #[serde(default = "default_extraction_base_url")]
    pub extraction_base_url: String,

    /// HTTP timeout for retrieval calls, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            query_templates: default_query_templates(),
            results_per_query: default_results_per_query(),
            max_references: default_max_references(),
            request_delay_ms: default_request_delay(),
            denylist: default_denylist(),
            signal_terms: default_signal_terms(),
            search_base_url: default_search_base_url(),
            extraction_base_url: default_extraction_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_query_templates() -> Vec<String> {
    [
        "guide {keyword}",
        "how to {keyword}",
        "trends {keyword}",
        "benefits {keyword}",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_results_per_query() -> u32 {
    5
}
fn default_max_references() -> usize {
    5
}
fn default_request_delay() -> u64 {
    1000
}
fn default_denylist() -> Vec<String> {
    [
        "amazon.com",
        "amazon.in",
        "ebay.com",
        "walmart.com",
        "etsy.com",
        "flipkart.com",
        "alibaba.com",
        "aliexpress.com",
        "target.com",
        "bestbuy.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_signal_terms() -> Vec<String> {
    [
        "guide",
        "how to",
        "what is",
        "tips",
        "benefits",
        "history",
        "explained",
        "learn",
        "why",
        "research",
        "study",
        "trends",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_search_base_url() -> String {
    "https://serpapi.com".into()
}
fn default_extraction_base_url() -> String {
    "https://api.exa.ai".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// Text-generation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    Groq,
    Local,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Groq => "groq",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider + model pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub model: String,
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Primary provider.
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    /// Primary model.
    #[serde(default = "default_gen_model")]
    pub model: String,

    /// Requested output token ceiling (clamped per model).
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Providers tried after the primary, in order. The local provider is
    /// always appended as the last resort.
    #[serde(default = "default_fallbacks")]
    pub fallbacks: Vec<ProviderConfig>,

    /// OpenAI-compatible local server.
    #[serde(default = "default_local_base_url")]
    pub local_base_url: String,

    #[serde(default = "default_local_model")]
    pub local_model: String,

    /// Minimum body word count for a draft to pass validation.
    #[serde(default = "default_min_word_count")]
    pub min_word_count: usize,

    /// Per-reference character budget inside the prompt.
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,

    /// Optional prompt template override with `${name}` placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_gen_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            fallbacks: default_fallbacks(),
            local_base_url: default_local_base_url(),
            local_model: default_local_model(),
            min_word_count: default_min_word_count(),
            snippet_chars: default_snippet_chars(),
            prompt_template: None,
        }
    }
}

fn default_provider() -> ProviderKind {
    ProviderKind::Anthropic
}
fn default_gen_model() -> String {
    "claude-3-sonnet-20240229".into()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_temperature() -> f32 {
    0.7
}
fn default_fallbacks() -> Vec<ProviderConfig> {
    vec![ProviderConfig {
        provider: ProviderKind::Groq,
        model: "mixtral-8x7b-32768".into(),
    }]
}
fn default_local_base_url() -> String {
    "http://localhost:1234/v1".into()
}
fn default_local_model() -> String {
    "llama-3.2-3b-instruct".into()
}
fn default_min_word_count() -> usize {
    500
}
fn default_snippet_chars() -> usize {
    500
}

/// `[publish]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Admin API version segment.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Target blog GID (e.g. `gid://shopify/Blog/123456789`).
    #[serde(default)]
    pub blog_id: String,

    #[serde(default = "default_author")]
    pub author: String,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            blog_id: String::new(),
            author: default_author(),
            tags: Vec::new(),
        }
    }
}

fn default_api_version() -> String {
    "2024-10".into()
}
fn default_author() -> String {
    "Editorial Team".into()
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Courtesy delay between keywords of a batch, in ms.
    #[serde(default = "default_keyword_delay")]
    pub keyword_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            keyword_delay_ms: default_keyword_delay(),
        }
    }
}

fn default_keyword_delay() -> u64 {
    2000
}

/// `[brand]` section: static brand/style parameters fed into the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    #[serde(default = "default_brand_name")]
    pub name: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_url: String,
    /// Free-form product facts, one per entry.
    #[serde(default)]
    pub product_details: Vec<String>,
    /// Call-to-action lines; the prompt offers all of them.
    #[serde(default)]
    pub cta: Vec<String>,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            name: default_brand_name(),
            tagline: String::new(),
            tone: default_tone(),
            audience: default_audience(),
            product_name: String::new(),
            product_url: String::new(),
            product_details: Vec::new(),
            cta: Vec::new(),
        }
    }
}

fn default_brand_name() -> String {
    "Our Brand".into()
}
fn default_tone() -> String {
    "professional and friendly".into()
}
fn default_audience() -> String {
    "general".into()
}

/// `[credentials]` section: names of the env vars holding each secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_search_key_env")]
    pub search_api_key_env: String,
    #[serde(default = "default_extraction_key_env")]
    pub extraction_api_key_env: String,
    #[serde(default = "default_anthropic_key_env")]
    pub anthropic_api_key_env: String,
    #[serde(default = "default_groq_key_env")]
    pub groq_api_key_env: String,
    #[serde(default = "default_shopify_store_env")]
    pub shopify_store_env: String,
    #[serde(default = "default_shopify_token_env")]
    pub shopify_access_token_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            search_api_key_env: default_search_key_env(),
            extraction_api_key_env: default_extraction_key_env(),
            anthropic_api_key_env: default_anthropic_key_env(),
            groq_api_key_env: default_groq_key_env(),
            shopify_store_env: default_shopify_store_env(),
            shopify_access_token_env: default_shopify_token_env(),
        }
    }
}

fn default_search_key_env() -> String {
    "SERPAPI_API_KEY".into()
}
fn default_extraction_key_env() -> String {
    "EXA_API_KEY".into()
}
fn default_anthropic_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_groq_key_env() -> String {
    "GROQ_API_KEY".into()
}
fn default_shopify_store_env() -> String {
    "SHOPIFY_STORE".into()
}
fn default_shopify_token_env() -> String {
    "SHOPIFY_ACCESS_TOKEN".into()
}

// ---------------------------------------------------------------------------
// Credentials (runtime, resolved from the environment)
// ---------------------------------------------------------------------------

/// One secret plus the env var it came from (for error messages).
#[derive(Clone)]
struct Secret {
    env_var: String,
    value: Option<String>,
}

impl Secret {
    fn resolve(env_var: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            env_var: env_var.to_string(),
            value: lookup(env_var).filter(|v| !v.trim().is_empty()),
        }
    }

    fn require(&self, purpose: &str) -> Result<&str> {
        self.value.as_deref().ok_or_else(|| {
            SeoRankerError::config(format!(
                "{purpose} credential not found. Set the {} environment variable.",
                self.env_var
            ))
        })
    }
}

/// Service credentials resolved once at startup.
#[derive(Clone)]
pub struct Credentials {
    search_api_key: Secret,
    extraction_api_key: Secret,
    anthropic_api_key: Secret,
    groq_api_key: Secret,
    shopify_store: Secret,
    shopify_access_token: Secret,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let present = |s: &Secret| if s.value.is_some() { "set" } else { "missing" };
        f.debug_struct("Credentials")
            .field("search_api_key", &present(&self.search_api_key))
            .field("extraction_api_key", &present(&self.extraction_api_key))
            .field("anthropic_api_key", &present(&self.anthropic_api_key))
            .field("groq_api_key", &present(&self.groq_api_key))
            .field("shopify_store", &present(&self.shopify_store))
            .field("shopify_access_token", &present(&self.shopify_access_token))
            .finish()
    }
}

/// Shopify store domain and Admin API token.
#[derive(Clone)]
pub struct ShopifyCredentials {
    pub store: String,
    pub access_token: String,
}

impl std::fmt::Debug for ShopifyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyCredentials")
            .field("store", &self.store)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Resolve credentials from the process environment.
    pub fn from_env(config: &CredentialsConfig) -> Self {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Resolve credentials through an arbitrary lookup (used by tests).
    pub fn from_lookup(
        config: &CredentialsConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let lookup: &dyn Fn(&str) -> Option<String> = &lookup;
        Self {
            search_api_key: Secret::resolve(&config.search_api_key_env, lookup),
            extraction_api_key: Secret::resolve(&config.extraction_api_key_env, lookup),
            anthropic_api_key: Secret::resolve(&config.anthropic_api_key_env, lookup),
            groq_api_key: Secret::resolve(&config.groq_api_key_env, lookup),
            shopify_store: Secret::resolve(&config.shopify_store_env, lookup),
            shopify_access_token: Secret::resolve(&config.shopify_access_token_env, lookup),
        }
    }

    pub fn search_api_key(&self) -> Result<&str> {
        self.search_api_key.require("Search service")
    }

    pub fn extraction_api_key(&self) -> Result<&str> {
        self.extraction_api_key.require("Content-extraction service")
    }

    /// API key for a text-generation provider. The local provider needs none.
    pub fn generation_api_key(&self, provider: ProviderKind) -> Result<Option<&str>> {
        match provider {
            ProviderKind::Anthropic => self
                .anthropic_api_key
                .require("Anthropic text-generation")
                .map(Some),
            ProviderKind::Groq => self.groq_api_key.require("Groq text-generation").map(Some),
            ProviderKind::Local => Ok(None),
        }
    }

    pub fn shopify(&self) -> Result<ShopifyCredentials> {
        Ok(ShopifyCredentials {
            store: self.shopify_store.require("CMS store")?.to_string(),
            access_token: self
                .shopify_access_token
                .require("CMS access token")?
                .to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the user config directory (`~/.seoranker/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SeoRankerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Load the application config.
///
/// An explicit path wins. Without one, `./seoranker.toml` is tried, then
/// `~/.seoranker/seoranker.toml`. A missing file yields defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        if path.exists() {
            return load_config_from(path);
        }
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return load_config_from(&local);
    }

    if let Ok(dir) = config_dir() {
        let user = dir.join(CONFIG_FILE_NAME);
        if user.exists() {
            return load_config_from(&user);
        }
    }

    tracing::debug!("config file not found, using defaults");
    Ok(AppConfig::default())
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SeoRankerError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SeoRankerError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write a default config file at `path` (refusing to overwrite).
pub fn init_config(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Err(SeoRankerError::config(format!(
            "{} already exists",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SeoRankerError::io(parent, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| SeoRankerError::config(e.to_string()))?;
    std::fs::write(path, content).map_err(|e| SeoRankerError::io(path, e))?;
    tracing::info!(path = %path.display(), "created default config file");

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("knowledge_base_dir"));
        assert!(toml_str.contains("SERPAPI_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.retrieval.max_references, 5);
        assert_eq!(parsed.generation.min_word_count, 500);
        assert_eq!(parsed.generation.provider, ProviderKind::Anthropic);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[generation]
provider = "local"
model = "llama-3.2-3b-instruct"

[brand]
name = "Bestia Brisk"
cta = ["Try it today."]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.generation.provider, ProviderKind::Local);
        assert_eq!(config.generation.max_tokens, 4096);
        assert_eq!(config.brand.name, "Bestia Brisk");
        assert_eq!(config.brand.tone, "professional and friendly");
        assert_eq!(config.retrieval.query_templates.len(), 4);
    }

    #[test]
    fn store_paths_live_under_knowledge_base() {
        let paths = PathsConfig::default();
        assert_eq!(
            paths.archive_path(),
            PathBuf::from("knowledge_base/blog_archive.csv")
        );
        assert!(paths.raw_content_path().ends_with("content_database.csv"));
    }

    #[test]
    fn missing_credential_is_config_error() {
        let creds = Credentials::from_lookup(&CredentialsConfig::default(), |_| None);
        let err = creds.search_api_key().unwrap_err();
        assert!(matches!(err, SeoRankerError::Config { .. }));
        assert!(err.to_string().contains("SERPAPI_API_KEY"));
    }

    #[test]
    fn blank_credential_counts_as_missing() {
        let creds =
            Credentials::from_lookup(&CredentialsConfig::default(), |_| Some("  ".to_string()));
        assert!(creds.extraction_api_key().is_err());
    }

    #[test]
    fn credentials_resolve_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GROQ_API_KEY", "gsk-test"),
            ("SHOPIFY_STORE", "demo.myshopify.com"),
            ("SHOPIFY_ACCESS_TOKEN", "shpat-test"),
        ]);
        let creds = Credentials::from_lookup(&CredentialsConfig::default(), |name| {
            env.get(name).map(|v| v.to_string())
        });

        assert_eq!(
            creds.generation_api_key(ProviderKind::Groq).unwrap(),
            Some("gsk-test")
        );
        assert_eq!(creds.generation_api_key(ProviderKind::Local).unwrap(), None);
        assert!(creds.generation_api_key(ProviderKind::Anthropic).is_err());

        let shopify = creds.shopify().expect("shopify creds");
        assert_eq!(shopify.store, "demo.myshopify.com");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let creds = Credentials::from_lookup(&CredentialsConfig::default(), |_| {
            Some("super-secret".to_string())
        });
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("set"));
    }

    #[test]
    fn init_config_refuses_overwrite() {
        let dir = std::env::temp_dir().join(format!(
            "seoranker-config-test-{}",
            std::process::id()
        ));
        let path = dir.join(CONFIG_FILE_NAME);
        let _ = std::fs::remove_dir_all(&dir);

        init_config(&path).expect("first init");
        let loaded = load_config_from(&path).expect("load written config");
        assert_eq!(loaded.pipeline.keyword_delay_ms, 2000);
        assert!(init_config(&path).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
