//! Parsing and validating raw model output.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, error};

/// Marker after which model output is discarded.
pub const IMAGE_SUGGESTIONS_MARKER: &str = "Suggested Image Placements";

/// Structured fields recovered from a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContent {
    pub title: String,
    pub meta_description: String,
    pub body: String,
}

static METADATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<metadata>(.*?)</metadata>").expect("valid regex"));
static CONTENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<content>(.*?)</content>").expect("valid regex"));
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)title:[ \t]*(.*?)[ \t]*\r?$").expect("valid regex"));
static META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)meta_description:[ \t]*(.*?)[ \t]*\r?$").expect("valid regex")
});

/// Extract the metadata and content blocks.
///
/// Returns `None` when either block is missing. Absent `title:` or
/// `meta_description:` lines yield empty strings.
pub fn parse(raw: &str) -> Option<ParsedContent> {
    let Some(metadata) = METADATA_RE.captures(raw).and_then(|c| c.get(1)) else {
        error!("model output has no <metadata> block");
        return None;
    };
    let Some(content) = CONTENT_RE.captures(raw).and_then(|c| c.get(1)) else {
        error!("model output has no <content> block");
        return None;
    };

    let metadata = metadata.as_str();
    let title = capture_line(&TITLE_RE, metadata);
    let meta_description = capture_line(&META_RE, metadata);

    let body = content.as_str().trim();
    let body = match body.find(IMAGE_SUGGESTIONS_MARKER) {
        Some(idx) => body[..idx].trim(),
        None => body,
    };

    debug!(title = %title, body_chars = body.len(), "model output parsed");
    Some(ParsedContent {
        title,
        meta_description,
        body: body.to_string(),
    })
}

fn capture_line(re: &Regex, text: &str) -> String {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub word_count: usize,
    pub h1_count: usize,
    pub h2_count: usize,
    /// Why validation failed; `None` when it passed.
    pub failure: Option<String>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Check that the body is non-empty and holds at least `min_words`
/// whitespace-delimited words. Heading counts are reported only.
pub fn validate(parsed: &ParsedContent, min_words: usize) -> ValidationReport {
    let body = parsed.body.trim();
    let lower = body.to_lowercase();
    let word_count = body.split_whitespace().count();
    let h1_count = lower.matches("<h1").count();
    let h2_count = lower.matches("<h2").count();

    let failure = if body.is_empty() {
        Some("content body is empty".to_string())
    } else if word_count < min_words {
        Some(format!("content too short: {word_count} words (minimum {min_words})"))
    } else {
        None
    };

    debug!(word_count, h1_count, h2_count, passed = failure.is_none(), "content validated");
    if let Some(reason) = &failure {
        error!(reason = %reason, "content failed validation");
    }

    ValidationReport {
        word_count,
        h1_count,
        h2_count,
        failure,
    }
}
