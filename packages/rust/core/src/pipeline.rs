//! Per-keyword generation run: references → prompt → draft → artifact → archive.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use seoranker_artifacts::{paragraph_word_count, write_artifact};
use seoranker_retrieval::{FixedDelay, Retriever, WaitPolicy};
use seoranker_shared::{
    BrandConfig, ContentRecord, GeneratedDraft, PipelineConfig, ReferenceDocument,
    RetrievalConfig, SeoRankerError, SourceType, normalize_keyword,
};
use seoranker_storage::{ArchiveStore, DedupIndex, RawContentStore};

use crate::generation::Generator;
use crate::parsing::{parse, validate};

/// Query label given to references loaded from the raw-content cache.
pub const CACHED_QUERY_TYPE: &str = "cached";

/// What happened to one keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum KeywordOutcome {
    /// Draft written and archived.
    Generated {
        id: usize,
        title: String,
        word_count: usize,
        source_count: usize,
        path: PathBuf,
    },
    /// Nothing to do (already archived, empty keyword).
    Skipped { reason: String },
    /// Model output failed parsing or validation.
    Rejected { reason: String },
    /// Generation or persistence failed.
    Failed { reason: String },
}

impl KeywordOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Generated { .. } => "generated",
            Self::Skipped { .. } => "skipped",
            Self::Rejected { .. } => "rejected",
            Self::Failed { .. } => "failed",
        }
    }

    fn from_error(err: SeoRankerError) -> Self {
        match err {
            SeoRankerError::ContentRejected { message } => Self::Rejected { reason: message },
            SeoRankerError::Parse { message } => Self::Rejected { reason: message },
            SeoRankerError::DuplicateKey { keyword } => Self::Skipped {
                reason: format!("'{keyword}' is already archived"),
            },
            other => Self::Failed {
                reason: other.to_string(),
            },
        }
    }
}

/// Per-keyword outcomes of a batch, in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<(String, KeywordOutcome)>,
    pub elapsed: std::time::Duration,
}

impl BatchSummary {
    fn count(&self, label: &str) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.label() == label).count()
    }

    pub fn generated(&self) -> usize {
        self.count("generated")
    }

    pub fn skipped(&self) -> usize {
        self.count("skipped")
    }

    pub fn rejected(&self) -> usize {
        self.count("rejected")
    }

    pub fn failed(&self) -> usize {
        self.count("failed")
    }
}

/// Progress callback for long-running commands.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a keyword is processed.
    fn keyword_started(&self, keyword: &str, current: usize, total: usize);
    /// Called after a keyword is processed with a one-line result.
    fn keyword_finished(&self, keyword: &str, summary: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn keyword_started(&self, _keyword: &str, _current: usize, _total: usize) {}
    fn keyword_finished(&self, _keyword: &str, _summary: &str) {}
}

/// The generation pipeline for keywords.
pub struct ContentPipeline {
    archive: Arc<dyn ArchiveStore>,
    raw_content: RawContentStore,
    retriever: Option<Retriever>,
    generator: Generator,
    brand: BrandConfig,
    output_dir: PathBuf,
    max_references: usize,
    wait: Box<dyn WaitPolicy>,
}

impl ContentPipeline {
    pub fn new(
        archive: Arc<dyn ArchiveStore>,
        raw_content: RawContentStore,
        generator: Generator,
        brand: BrandConfig,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            archive,
            raw_content,
            retriever: None,
            generator,
            brand,
            output_dir,
            max_references: RetrievalConfig::default().max_references,
            wait: Box::new(FixedDelay::from_millis(PipelineConfig::default().keyword_delay_ms)),
        }
    }

    /// Enable live retrieval for keywords with no cached references.
    pub fn with_retriever(mut self, retriever: Retriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_max_references(mut self, max: usize) -> Self {
        self.max_references = max;
        self
    }

    /// Courtesy wait between keywords of a batch.
    pub fn with_wait_policy(mut self, wait: Box<dyn WaitPolicy>) -> Self {
        self.wait = wait;
        self
    }

    /// Generate, validate, persist and archive a draft for one keyword.
    #[instrument(skip_all, fields(keyword = %keyword))]
    pub async fn run_keyword(&self, keyword: &str) -> KeywordOutcome {
        let keyword = normalize_keyword(keyword);
        if keyword.is_empty() {
            return KeywordOutcome::Skipped {
                reason: "empty keyword".into(),
            };
        }

        // --- Phase 1: Dedup ---
        let index = DedupIndex::load(self.archive.as_ref(), &self.raw_content);
        if index.is_archived(&keyword) {
            info!("already archived, skipping");
            return KeywordOutcome::Skipped {
                reason: format!("'{keyword}' is already archived"),
            };
        }

        // --- Phase 2: References ---
        let references = self.references(&keyword, index.is_researched(&keyword)).await;

        // --- Phase 3: Generate + parse + validate ---
        let draft = match self.draft(&keyword, &references).await {
            Ok(draft) => draft,
            Err(e) => return KeywordOutcome::from_error(e),
        };

        // --- Phase 4: Persist ---
        match self.persist(&keyword, &draft) {
            Ok(outcome) => outcome,
            Err(e) => KeywordOutcome::from_error(e),
        }
    }

    /// Run keywords sequentially with a courtesy wait between them.
    #[instrument(skip_all, fields(count = keywords.len()))]
    pub async fn run_batch(
        &self,
        keywords: &[String],
        progress: &dyn ProgressReporter,
    ) -> BatchSummary {
        let start = Instant::now();
        let total = keywords.len();
        let mut summary = BatchSummary::default();
        progress.phase("Generating content");

        for (i, keyword) in keywords.iter().enumerate() {
            if i > 0 {
                self.wait.wait().await;
            }
            progress.keyword_started(keyword, i + 1, total);
            let outcome = self.run_keyword(keyword).await;
            progress.keyword_finished(keyword, &describe(&outcome));
            summary.outcomes.push((normalize_keyword(keyword), outcome));
        }

        summary.elapsed = start.elapsed();
        info!(
            generated = summary.generated(),
            skipped = summary.skipped(),
            rejected = summary.rejected(),
            failed = summary.failed(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "batch complete"
        );
        summary
    }

    async fn references(&self, keyword: &str, researched: bool) -> Vec<ReferenceDocument> {
        if researched {
            match self.raw_content.for_keyword(keyword) {
                Ok(entries) if !entries.is_empty() => {
                    info!(count = entries.len(), "using cached references");
                    return entries
                        .into_iter()
                        .take(self.max_references)
                        .map(|e| ReferenceDocument {
                            url: e.url,
                            title: e.title,
                            extracted_text: e.content,
                            source_type: SourceType::Article,
                            relevance_score: 0.0,
                            query_type: CACHED_QUERY_TYPE.into(),
                        })
                        .collect();
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "raw content unreadable"),
            }
        }

        match &self.retriever {
            Some(retriever) => retriever.retrieve(keyword).await,
            None => {
                warn!("no cached references and live retrieval is disabled");
                Vec::new()
            }
        }
    }

    async fn draft(
        &self,
        keyword: &str,
        references: &[ReferenceDocument],
    ) -> seoranker_shared::Result<GeneratedDraft> {
        if references.is_empty() {
            warn!("generating without reference sources");
        }
        let raw = self
            .generator
            .generate(keyword, references, &self.brand)
            .await?;

        let parsed = parse(&raw).ok_or_else(|| {
            SeoRankerError::rejected("model output is missing the metadata or content block")
        })?;
        let report = validate(&parsed, self.generator.config().min_word_count);
        if let Some(reason) = report.failure {
            return Err(SeoRankerError::rejected(reason));
        }

        let title = if parsed.title.is_empty() {
            warn!("model output has no title, using the keyword");
            keyword.to_string()
        } else {
            parsed.title
        };

        Ok(GeneratedDraft {
            title,
            meta_description: parsed.meta_description,
            body: parsed.body,
            validation_passed: true,
            source_count: references.len(),
        })
    }

    fn persist(&self, keyword: &str, draft: &GeneratedDraft) -> seoranker_shared::Result<KeywordOutcome> {
        // The archive may have changed since the dedup check; an archived
        // keyword's artifact must not be overwritten.
        if self.archive.keys()?.iter().any(|k| k == keyword) {
            return Err(SeoRankerError::DuplicateKey {
                keyword: keyword.to_string(),
            });
        }

        let path = write_artifact(
            &self.output_dir,
            keyword,
            &draft.title,
            &draft.meta_description,
            &draft.body,
        )?;
        let absolute = std::path::absolute(&path).unwrap_or_else(|_| path.clone());
        let word_count = paragraph_word_count(&draft.body);

        let id = self.archive.append(ContentRecord::draft(
            keyword,
            draft.title.clone(),
            draft.meta_description.clone(),
            absolute.to_string_lossy(),
            word_count,
            draft.body.clone(),
        ))?;

        info!(id, title = %draft.title, word_count, path = %absolute.display(), "draft archived");
        Ok(KeywordOutcome::Generated {
            id,
            title: draft.title.clone(),
            word_count,
            source_count: draft.source_count,
            path: absolute,
        })
    }
}

/// One-line human summary of an outcome.
pub fn describe(outcome: &KeywordOutcome) -> String {
    match outcome {
        KeywordOutcome::Generated {
            id,
            title,
            word_count,
            source_count,
            ..
        } => format!("#{id} \"{title}\" ({word_count} words, {source_count} sources)"),
        KeywordOutcome::Skipped { reason } => format!("skipped: {reason}"),
        KeywordOutcome::Rejected { reason } => format!("rejected: {reason}"),
        KeywordOutcome::Failed { reason } => format!("failed: {reason}"),
    }
}
