//! Core domain types for SEO Ranker content work.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Keyword identity
// ---------------------------------------------------------------------------

/// Normalize a keyword into its identity form: trimmed, lower-cased, with
/// internal whitespace runs collapsed to a single space.
pub fn normalize_keyword(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// ContentStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a [`ContentRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Draft,
    Published,
    Failed,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// Allowed: draft→published, draft→failed, failed→published.
    /// Published is terminal.
    pub fn can_transition_to(&self, next: ContentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Published)
                | (Self::Draft, Self::Failed)
                | (Self::Failed, Self::Published)
        )
    }

    /// Records in these states are picked up by a publish batch.
    pub fn is_publishable(&self) -> bool {
        matches!(self, Self::Draft | Self::Failed)
    }
}

impl std::fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown content status '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// ContentRecord
// ---------------------------------------------------------------------------

/// One archived piece of content, identified by its normalized keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Normalized keyword (identity).
    pub keyword: String,
    pub title: String,
    pub meta_description: String,
    /// Path to the HTML artifact on disk.
    pub file_path: String,
    pub status: ContentStatus,
    pub word_count: usize,
    /// Raw body markup.
    pub body: String,
}

impl ContentRecord {
    /// Build a fresh draft record. The keyword is normalized here.
    pub fn draft(
        keyword: &str,
        title: impl Into<String>,
        meta_description: impl Into<String>,
        file_path: impl Into<String>,
        word_count: usize,
        body: impl Into<String>,
    ) -> Self {
        Self {
            keyword: normalize_keyword(keyword),
            title: title.into(),
            meta_description: meta_description.into(),
            file_path: file_path.into(),
            status: ContentStatus::Draft,
            word_count,
            body: body.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Retrieval types
// ---------------------------------------------------------------------------

/// Where a reference document was found in the search response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Regular organic result.
    Article,
    /// Question-style secondary panel ("people also ask").
    Qa,
}

/// A reference document retrieved to inform generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDocument {
    pub url: String,
    pub title: String,
    pub extracted_text: String,
    pub source_type: SourceType,
    /// Ranking only; ties keep encounter order.
    pub relevance_score: f64,
    /// Label of the query variant that surfaced this document (e.g. "guide").
    pub query_type: String,
}

impl ReferenceDocument {
    /// Host of the document URL, if it parses.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

/// Cached scraped text for one (keyword, url) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawContentEntry {
    /// Normalized keyword; empty for rows migrated from the url-only format.
    pub keyword: String,
    pub url: String,
    pub title: String,
    pub content: String,
}

/// A question harvested from the question-style result panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub source_keyword: String,
    pub question: String,
    pub title: String,
    pub url: String,
}

// ---------------------------------------------------------------------------
// GeneratedDraft
// ---------------------------------------------------------------------------

/// Output of the generation + parsing stages for one keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDraft {
    pub title: String,
    pub meta_description: String,
    pub body: String,
    pub validation_passed: bool,
    /// Number of reference documents fed into the prompt (reporting only).
    pub source_count: usize,
}
