//! Knowledge-base building: research keywords ahead of generation.

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, instrument, warn};

use seoranker_retrieval::{FixedDelay, Retriever, WaitPolicy};
use seoranker_shared::{PipelineConfig, Result, SeoRankerError, normalize_keyword};
use seoranker_storage::RawContentStore;

use crate::pipeline::ProgressReporter;

/// Result for one keyword of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnowledgeStatus {
    /// Retrieval ran and stored this many references.
    Researched { references: usize },
    /// The raw-content store already covers the keyword.
    AlreadyPresent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeReport {
    pub entries: Vec<(String, KnowledgeStatus)>,
}

impl KnowledgeReport {
    pub fn researched(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, s)| matches!(s, KnowledgeStatus::Researched { .. }))
            .count()
    }

    pub fn already_present(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, s)| *s == KnowledgeStatus::AlreadyPresent)
            .count()
    }
}

/// Runs retrieval for keywords not yet in the raw-content store.
pub struct KnowledgeBuilder {
    retriever: Retriever,
    wait: Box<dyn WaitPolicy>,
}

impl KnowledgeBuilder {
    pub fn new(retriever: Retriever) -> Self {
        Self {
            retriever,
            wait: Box::new(FixedDelay::from_millis(PipelineConfig::default().keyword_delay_ms)),
        }
    }

    /// Courtesy wait between researched keywords.
    pub fn with_wait_policy(mut self, wait: Box<dyn WaitPolicy>) -> Self {
        self.wait = wait;
        self
    }

    /// Research each keyword once. Input is normalized and deduplicated in
    /// order; empty keywords are dropped.
    #[instrument(skip_all, fields(count = keywords.len()))]
    pub async fn build(&self, keywords: &[String], progress: &dyn ProgressReporter) -> KnowledgeReport {
        let keywords = dedupe_keywords(keywords);
        let present: HashSet<String> = match self.retriever.raw_content().keywords() {
            Ok(existing) => existing.into_iter().collect(),
            Err(e) => {
                warn!(error = %e, "raw content unreadable, researching everything");
                HashSet::new()
            }
        };

        progress.phase("Building knowledge base");
        let total = keywords.len();
        let mut report = KnowledgeReport::default();
        let mut researched_any = false;

        for (i, keyword) in keywords.into_iter().enumerate() {
            progress.keyword_started(&keyword, i + 1, total);
            if present.contains(&keyword) {
                info!(keyword = %keyword, "already in knowledge base");
                progress.keyword_finished(&keyword, "already present");
                report.entries.push((keyword, KnowledgeStatus::AlreadyPresent));
                continue;
            }

            if researched_any {
                self.wait.wait().await;
            }
            researched_any = true;

            let references = self.retriever.retrieve(&keyword).await.len();
            progress.keyword_finished(&keyword, &format!("{references} references"));
            report
                .entries
                .push((keyword, KnowledgeStatus::Researched { references }));
        }

        info!(
            researched = report.researched(),
            already_present = report.already_present(),
            "knowledge base build complete"
        );
        report
    }
}

/// Sorted unique keywords with cached references.
pub fn available_keywords(raw_content: &RawContentStore) -> Result<Vec<String>> {
    raw_content.keywords()
}

/// Normalize, drop empties, and keep the first occurrence of each keyword.
pub fn dedupe_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .iter()
        .map(|k| normalize_keyword(k))
        .filter(|k| !k.is_empty() && seen.insert(k.clone()))
        .collect()
}

/// Read keywords from a text file: one per line, `#` starts a comment line.
pub fn read_keyword_file(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| SeoRankerError::io(path, e))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}
