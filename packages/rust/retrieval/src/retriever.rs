//! The retrieval stage: query variants → filter → extract (cached) → rank.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, instrument, warn};

use seoranker_shared::{
    RawContentEntry, ReferenceDocument, RetrievalConfig, SourceType, Suggestion,
    normalize_keyword,
};
use seoranker_storage::{RawContentStore, SuggestionStore};

use crate::extract::ExtractionService;
use crate::filter::ResultFilter;
use crate::search::{SearchResponse, SearchService};
use crate::throttle::{FixedDelay, WaitPolicy};

/// Placeholder replaced by the keyword in query templates.
const KEYWORD_PLACEHOLDER: &str = "{keyword}";

/// Base score for question-panel results before signal hits.
const QUESTION_BASE_SCORE: f64 = 0.5;

/// A search result that survived filtering, not yet extracted.
#[derive(Debug, Clone)]
struct Candidate {
    url: String,
    title: String,
    source_type: SourceType,
    score: f64,
    query_type: String,
}

/// Gathers reference documents for a keyword.
pub struct Retriever {
    config: RetrievalConfig,
    filter: ResultFilter,
    search: Box<dyn SearchService>,
    extraction: Box<dyn ExtractionService>,
    raw_content: RawContentStore,
    suggestions: SuggestionStore,
    wait: Box<dyn WaitPolicy>,
}

impl Retriever {
    pub fn new(
        config: RetrievalConfig,
        search: Box<dyn SearchService>,
        extraction: Box<dyn ExtractionService>,
        raw_content: RawContentStore,
        suggestions: SuggestionStore,
    ) -> Self {
        let filter = ResultFilter::new(&config.denylist, &config.signal_terms);
        let wait = Box::new(FixedDelay::from_millis(config.request_delay_ms));
        Self {
            config,
            filter,
            search,
            extraction,
            raw_content,
            suggestions,
            wait,
        }
    }

    /// Replace the pacing policy (e.g. `NoWait` in tests).
    pub fn with_wait_policy(mut self, wait: Box<dyn WaitPolicy>) -> Self {
        self.wait = wait;
        self
    }

    pub fn raw_content(&self) -> &RawContentStore {
        &self.raw_content
    }

    /// Retrieve ranked reference documents for `keyword`.
    ///
    /// Never fails: search and extraction errors are logged and skipped, and
    /// an empty vector is returned when every query variant failed.
    #[instrument(skip_all, fields(keyword = %keyword))]
    pub async fn retrieve(&self, keyword: &str) -> Vec<ReferenceDocument> {
        let keyword = normalize_keyword(keyword);
        if keyword.is_empty() || self.config.query_templates.is_empty() {
            return Vec::new();
        }

        let mut calls = 0usize;
        let mut failed_variants = 0usize;
        let mut seen_urls = HashSet::new();
        let mut candidates = Vec::new();
        let mut harvested = Vec::new();

        for template in &self.config.query_templates {
            let query = expand_template(template, &keyword);
            let label = query_label(template);

            self.pace(&mut calls).await;
            let response = match self
                .search
                .search(&query, self.config.results_per_query)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(query = %query, error = %e, "search variant failed");
                    failed_variants += 1;
                    continue;
                }
            };

            harvested.extend(response.questions.iter().filter_map(|q| {
                (!q.question.trim().is_empty()).then(|| Suggestion {
                    source_keyword: keyword.clone(),
                    question: q.question.clone(),
                    title: q.title.clone(),
                    url: q.link.clone(),
                })
            }));

            for candidate in self.screen(&response, &label) {
                if seen_urls.insert(candidate.url.clone()) {
                    candidates.push(candidate);
                }
            }
        }

        if failed_variants == self.config.query_templates.len() {
            warn!("every search variant failed, no references");
            return Vec::new();
        }

        if !harvested.is_empty() {
            match self.suggestions.insert_many(harvested) {
                Ok(added) => debug!(added, "suggestions stored"),
                Err(e) => warn!(error = %e, "failed to store suggestions"),
            }
        }

        // Stable: equal scores keep encounter order.
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut cached: HashMap<String, RawContentEntry> = match self.raw_content.for_keyword(&keyword) {
            Ok(entries) => entries.into_iter().map(|e| (e.url.clone(), e)).collect(),
            Err(e) => {
                warn!(error = %e, "raw content store unreadable, extracting everything");
                HashMap::new()
            }
        };

        let mut documents = Vec::new();
        let mut extracted = 0usize;
        for candidate in candidates {
            if documents.len() >= self.config.max_references {
                break;
            }

            let (title, text) = match cached.remove(&candidate.url) {
                Some(entry) => (
                    if entry.title.is_empty() {
                        candidate.title.clone()
                    } else {
                        entry.title
                    },
                    entry.content,
                ),
                None => {
                    self.pace(&mut calls).await;
                    match self.extraction.extract(&candidate.url).await {
                        Ok(page) => {
                            extracted += 1;
                            let title = if page.title.trim().is_empty() {
                                candidate.title.clone()
                            } else {
                                page.title
                            };
                            let entry = RawContentEntry {
                                keyword: keyword.clone(),
                                url: candidate.url.clone(),
                                title: title.clone(),
                                content: page.text.clone(),
                            };
                            if let Err(e) = self.raw_content.insert(entry) {
                                warn!(url = %candidate.url, error = %e, "failed to cache extracted text");
                            }
                            (title, page.text)
                        }
                        Err(e) => {
                            warn!(url = %candidate.url, error = %e, "extraction failed, dropping reference");
                            continue;
                        }
                    }
                }
            };

            documents.push(ReferenceDocument {
                url: candidate.url,
                title,
                extracted_text: text,
                source_type: candidate.source_type,
                relevance_score: candidate.score,
                query_type: candidate.query_type,
            });
        }

        info!(
            references = documents.len(),
            extracted,
            failed_variants,
            "retrieval complete"
        );
        documents
    }

    /// Apply the denylist and signal-term rules to one response.
    fn screen(&self, response: &SearchResponse, label: &str) -> Vec<Candidate> {
        let mut out = Vec::new();

        for (index, hit) in response
            .organic
            .iter()
            .take(self.config.results_per_query as usize)
            .enumerate()
        {
            if hit.link.is_empty() || self.filter.is_denylisted(&hit.link) {
                debug!(url = %hit.link, "denylisted or empty result");
                continue;
            }
            let hits = self.filter.signal_hits(&hit.title, &hit.snippet);
            if hits == 0 {
                debug!(url = %hit.link, "no informational signal");
                continue;
            }
            let position = hit.position.unwrap_or(index as u32 + 1).max(1);
            out.push(Candidate {
                url: hit.link.clone(),
                title: hit.title.clone(),
                source_type: SourceType::Article,
                score: hits as f64 + 1.0 / f64::from(position),
                query_type: label.to_string(),
            });
        }

        for question in &response.questions {
            if question.link.is_empty() || self.filter.is_denylisted(&question.link) {
                continue;
            }
            let title = if question.title.is_empty() {
                question.question.clone()
            } else {
                question.title.clone()
            };
            let hits = self.filter.signal_hits(&question.question, &question.snippet);
            out.push(Candidate {
                url: question.link.clone(),
                title,
                source_type: SourceType::Qa,
                score: QUESTION_BASE_SCORE + hits as f64,
                query_type: label.to_string(),
            });
        }

        out
    }

    /// Wait before every external call except the first.
    async fn pace(&self, calls: &mut usize) {
        if *calls > 0 {
            self.wait.wait().await;
        }
        *calls += 1;
    }
}

fn expand_template(template: &str, keyword: &str) -> String {
    if template.contains(KEYWORD_PLACEHOLDER) {
        template.replace(KEYWORD_PLACEHOLDER, keyword)
    } else {
        format!("{template} {keyword}")
    }
}

/// Label of a query variant: the template text without the placeholder.
fn query_label(template: &str) -> String {
    let label = template.replace(KEYWORD_PLACEHOLDER, " ");
    let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
    if label.is_empty() {
        "general".to_string()
    } else {
        label
    }
}
