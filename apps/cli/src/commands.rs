//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use seoranker_cms::ShopifyClient;
use seoranker_core::generation::Generator;
use seoranker_core::knowledge::{KnowledgeBuilder, KnowledgeStatus, dedupe_keywords, read_keyword_file};
use seoranker_core::pipeline::{ContentPipeline, KeywordOutcome, ProgressReporter};
use seoranker_core::{available_keywords, publish_pending, reconcile};
use seoranker_llm::ProviderChain;
use seoranker_retrieval::{ExaClient, FixedDelay, Retriever, SerpApiClient, WaitPolicy};
use seoranker_shared::{AppConfig, CONFIG_FILE_NAME, Credentials, init_config, load_config};
use seoranker_storage::Stores;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SEO Ranker: research keywords, generate blog drafts, publish them.
#[derive(Parser)]
#[command(
    name = "seoranker",
    version,
    about = "Research keywords, generate SEO blog drafts, and publish them to the store.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./seoranker.toml, then ~/.seoranker/seoranker.toml).
    #[arg(long, global = true, env = "SEORANKER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Knowledge-base management.
    Kb {
        #[command(subcommand)]
        action: KbAction,
    },

    /// List keywords that have researched references.
    Keywords,

    /// Generate drafts for keywords.
    Generate {
        /// Keywords to generate.
        #[arg(required_unless_present = "all")]
        keywords: Vec<String>,

        /// Generate every researched keyword not yet archived.
        #[arg(long, conflicts_with = "keywords")]
        all: bool,
    },

    /// Archive HTML artifacts that are missing from the archive.
    Reconcile,

    /// Publish draft and failed records to the store.
    Publish,

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Knowledge-base subcommands.
#[derive(Subcommand)]
pub(crate) enum KbAction {
    /// Research keywords and cache their reference material.
    Build {
        /// Keywords to research.
        keywords: Vec<String>,

        /// Read additional keywords from a file (one per line).
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "seoranker=info",
        1 => "seoranker=debug",
        _ => "seoranker=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Kb {
            action: KbAction::Build { keywords, file },
        } => {
            let (config, credentials) = resolve(config_path)?;
            cmd_kb_build(&config, &credentials, keywords, file.as_deref()).await
        }
        Command::Keywords => cmd_keywords(&resolve(config_path)?.0),
        Command::Generate { keywords, all } => {
            let (config, credentials) = resolve(config_path)?;
            cmd_generate(&config, &credentials, keywords, all).await
        }
        Command::Reconcile => cmd_reconcile(&resolve(config_path)?.0),
        Command::Publish => {
            let (config, credentials) = resolve(config_path)?;
            cmd_publish(&config, &credentials).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve(config_path: Option<&Path>) -> Result<(AppConfig, Credentials)> {
    let config = load_config(config_path)?;
    let credentials = Credentials::from_env(&config.credentials);
    Ok((config, credentials))
}

// ---------------------------------------------------------------------------
// Service wiring
// ---------------------------------------------------------------------------

fn build_retriever(config: &AppConfig, credentials: &Credentials, stores: &Stores) -> Result<Retriever> {
    let retrieval = &config.retrieval;
    let timeout = Duration::from_secs(retrieval.timeout_secs);
    let search = SerpApiClient::new(
        &retrieval.search_base_url,
        credentials.search_api_key()?,
        timeout,
    )?;
    let extraction = ExaClient::new(
        &retrieval.extraction_base_url,
        credentials.extraction_api_key()?,
        timeout,
    )?;
    Ok(Retriever::new(
        retrieval.clone(),
        Box::new(search),
        Box::new(extraction),
        stores.raw_content.clone(),
        stores.suggestions.clone(),
    ))
}

fn keyword_delay(config: &AppConfig) -> Box<dyn WaitPolicy> {
    Box::new(FixedDelay::from_millis(config.pipeline.keyword_delay_ms))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_kb_build(
    config: &AppConfig,
    credentials: &Credentials,
    mut keywords: Vec<String>,
    file: Option<&Path>,
) -> Result<()> {
    if let Some(path) = file {
        keywords.extend(read_keyword_file(path)?);
    }
    let keywords = dedupe_keywords(&keywords);
    if keywords.is_empty() {
        return Err(eyre!("no keywords given: pass keywords or --file"));
    }

    let stores = Stores::open(&config.paths);
    let retriever = build_retriever(config, credentials, &stores)?;
    let builder = KnowledgeBuilder::new(retriever).with_wait_policy(keyword_delay(config));

    info!(count = keywords.len(), "building knowledge base");
    let reporter = CliProgress::new()?;
    let report = builder.build(&keywords, &reporter).await;
    reporter.finish();

    let references: usize = report
        .entries
        .iter()
        .map(|(_, status)| match status {
            KnowledgeStatus::Researched { references } => *references,
            KnowledgeStatus::AlreadyPresent => 0,
        })
        .sum();
    println!();
    println!(
        "  Researched: {}  Already present: {}  References: {references}",
        report.researched(),
        report.already_present()
    );
    println!();
    Ok(())
}

fn cmd_keywords(config: &AppConfig) -> Result<()> {
    let stores = Stores::open(&config.paths);
    let keywords = available_keywords(&stores.raw_content)?;
    if keywords.is_empty() {
        println!("No researched keywords. Run `seoranker kb build <keyword>` first.");
        return Ok(());
    }

    let index = stores.dedup_index();
    for keyword in keywords {
        let marker = if index.is_archived(&keyword) { "archived" } else { "pending" };
        println!("{keyword}\t{marker}");
    }
    Ok(())
}

async fn cmd_generate(
    config: &AppConfig,
    credentials: &Credentials,
    keywords: Vec<String>,
    all: bool,
) -> Result<()> {
    // The primary provider must be usable; fallbacks are optional.
    credentials.generation_api_key(config.generation.provider)?;

    let stores = Stores::open(&config.paths);
    let keywords = if all {
        let index = stores.dedup_index();
        available_keywords(&stores.raw_content)?
            .into_iter()
            .filter(|k| !index.is_archived(k))
            .collect()
    } else {
        dedupe_keywords(&keywords)
    };
    if keywords.is_empty() {
        println!("Nothing to generate.");
        return Ok(());
    }

    let chain = ProviderChain::from_config(&config.generation, credentials)?;
    let archive: Arc<dyn seoranker_storage::ArchiveStore> = Arc::new(stores.archive.clone());
    let generator = Generator::new(
        config.generation.clone(),
        Box::new(chain),
        archive.clone(),
        stores.suggestions.clone(),
    );
    info!(provider = %generator.provider_name(), keywords = keywords.len(), "starting generation");

    let mut pipeline = ContentPipeline::new(
        archive,
        stores.raw_content.clone(),
        generator,
        config.brand.clone(),
        config.paths.output_dir.clone(),
    )
    .with_max_references(config.retrieval.max_references)
    .with_wait_policy(keyword_delay(config));

    match build_retriever(config, credentials, &stores) {
        Ok(retriever) => pipeline = pipeline.with_retriever(retriever),
        Err(e) => warn!(error = %e, "live retrieval disabled, using cached references only"),
    }

    let reporter = CliProgress::new()?;
    let summary = pipeline.run_batch(&keywords, &reporter).await;
    reporter.finish();

    println!();
    for (keyword, outcome) in &summary.outcomes {
        if let KeywordOutcome::Generated { path, .. } = outcome {
            println!("  {keyword}: {}", path.display());
        }
    }
    println!(
        "  Generated: {}  Skipped: {}  Rejected: {}  Failed: {}  Time: {:.1}s",
        summary.generated(),
        summary.skipped(),
        summary.rejected(),
        summary.failed(),
        summary.elapsed.as_secs_f64()
    );
    println!();
    Ok(())
}

fn cmd_reconcile(config: &AppConfig) -> Result<()> {
    let stores = Stores::open(&config.paths);
    let report = reconcile(&stores.archive, &config.paths.output_dir)?;

    println!();
    println!("  Artifacts: {}", report.total);
    println!("  New:       {}", report.new);
    println!("  Skipped:   {}", report.skipped);
    println!("  Failed:    {}", report.failed);
    println!();
    Ok(())
}

async fn cmd_publish(config: &AppConfig, credentials: &Credentials) -> Result<()> {
    let shopify = credentials.shopify()?;
    let client = ShopifyClient::new(&shopify, &config.publish)?;
    let stores = Stores::open(&config.paths);

    let reporter = CliProgress::new()?;
    let report = publish_pending(&stores.archive, &client, &reporter).await?;
    reporter.finish();

    if report.entries.is_empty() {
        println!("Nothing to publish.");
        return Ok(());
    }

    println!();
    println!("  Published: {}  Failed: {}", report.published, report.failed);
    println!();
    Ok(())
}

fn cmd_config_init(path: Option<&Path>) -> Result<()> {
    let target = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let path = init_config(&target)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Ok(Self { spinner })
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn keyword_started(&self, keyword: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {keyword}"));
    }

    fn keyword_finished(&self, keyword: &str, summary: &str) {
        self.spinner.println(format!("  {keyword}: {summary}"));
    }
}
