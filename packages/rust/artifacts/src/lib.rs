//! Per-keyword HTML artifacts: naming, rendering, and reading back.
//!
//! An artifact is `<output_dir>/<safe_keyword>.html`, a minimal HTML5
//! document carrying the meta description, the title, and the post body.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use seoranker_shared::{Result, SeoRankerError, normalize_keyword};

/// File extension of generated artifacts.
pub const ARTIFACT_EXTENSION: &str = "html";

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Map a keyword to its file stem: every non-alphanumeric character of the
/// normalized keyword becomes `_`.
pub fn safe_file_stem(keyword: &str) -> String {
    normalize_keyword(keyword)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

pub fn artifact_path(output_dir: &Path, keyword: &str) -> PathBuf {
    output_dir.join(format!("{}.{ARTIFACT_EXTENSION}", safe_file_stem(keyword)))
}

/// Recover a keyword from an artifact file name (`_` → space, normalized).
pub fn keyword_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let keyword = normalize_keyword(&stem.replace('_', " "));
    (!keyword.is_empty()).then_some(keyword)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the full HTML document for a post.
pub fn render_document(title: &str, meta_description: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"description\" content=\"{}\">\n\
         <title>{}</title>\n\
         </head>\n\
         <body>\n\
         {}\n\
         </body>\n\
         </html>\n",
        escape_html(meta_description),
        escape_html(title),
        body.trim()
    )
}

/// Write the artifact for `keyword`, creating the output directory.
pub fn write_artifact(
    output_dir: &Path,
    keyword: &str,
    title: &str,
    meta_description: &str,
    body: &str,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| SeoRankerError::io(output_dir, e))?;
    let path = artifact_path(output_dir, keyword);
    std::fs::write(&path, render_document(title, meta_description, body))
        .map_err(|e| SeoRankerError::io(&path, e))?;
    debug!(path = %path.display(), "artifact written");
    Ok(path)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Fields recovered from an artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactContent {
    pub keyword: String,
    pub title: String,
    pub meta_description: String,
    /// Element children of `<body>`, scripts and styles removed.
    pub body: String,
    pub word_count: usize,
}

/// Read and parse an artifact file.
pub fn read_artifact(path: &Path) -> Result<ArtifactContent> {
    let keyword = keyword_from_path(path).ok_or_else(|| {
        SeoRankerError::parse(format!("{}: no keyword in file name", path.display()))
    })?;
    let html = std::fs::read_to_string(path).map_err(|e| SeoRankerError::io(path, e))?;
    let parsed = parse_document(&html);

    Ok(ArtifactContent {
        keyword,
        title: parsed.title,
        meta_description: parsed.meta_description,
        body: parsed.body,
        word_count: parsed.word_count,
    })
}

struct ParsedDocument {
    title: String,
    meta_description: String,
    body: String,
    word_count: usize,
}

fn parse_document(html: &str) -> ParsedDocument {
    static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
    static META: LazyLock<Selector> = LazyLock::new(|| selector("meta[name=\"description\"]"));
    static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));

    let doc = Html::parse_document(html);

    let title = doc
        .select(&TITLE)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let meta_description = doc
        .select(&META)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(|c| c.trim().to_string())
        .unwrap_or_default();

    let body = doc
        .select(&BODY)
        .next()
        .map(|body| {
            body.children()
                .filter_map(scraper::ElementRef::wrap)
                .filter(|el| !matches!(el.value().name(), "script" | "style"))
                .map(|el| strip_scripts(&el.html()))
                .collect::<String>()
        })
        .unwrap_or_default();

    ParsedDocument {
        title,
        meta_description,
        body: body.trim().to_string(),
        word_count: paragraph_word_count_doc(&doc),
    }
}

fn selector(s: &str) -> Selector {
    Selector::parse(s).expect("valid selector")
}

fn strip_scripts(html: &str) -> String {
    static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("valid regex")
    });
    SCRIPT_RE.replace_all(html, "").into_owned()
}

/// Whitespace-delimited words across the text of every `<p>` element.
pub fn paragraph_word_count(html: &str) -> usize {
    paragraph_word_count_doc(&Html::parse_document(html))
}

fn paragraph_word_count_doc(doc: &Html) -> usize {
    static P: LazyLock<Selector> = LazyLock::new(|| selector("p"));
    doc.select(&P)
        .map(|p| p.text().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .count()
}

/// Remove every `<h1>…</h1>` element from a body.
pub fn strip_title_markup(body: &str) -> String {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?is)<h1\b[^>]*>.*?</h1\s*>").expect("valid regex"));
    H1_RE.replace_all(body, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn file_stem_mapping() {
        assert_eq!(safe_file_stem("Pour Over Coffee"), "pour_over_coffee");
        assert_eq!(safe_file_stem("c++ tips & tricks"), "c___tips___tricks");
        assert_eq!(
            keyword_from_path(Path::new("/out/pour_over_coffee.html")).as_deref(),
            Some("pour over coffee")
        );
        assert_eq!(keyword_from_path(Path::new("/out/___.html")), None);
    }

    #[test]
    fn render_then_read_back() {
        let dir = std::env::temp_dir().join(format!("seoranker_artifacts_{}", Uuid::now_v7()));
        let body = "<h1>Pour Over</h1>\n<p>One two three.</p>\n<p>Four five.</p>";
        let path = write_artifact(
            &dir,
            "pour over coffee",
            "Pour Over & You",
            "Brew \"better\" coffee",
            body,
        )
        .unwrap();
        assert!(path.ends_with("pour_over_coffee.html"));

        let content = read_artifact(&path).unwrap();
        assert_eq!(content.keyword, "pour over coffee");
        assert_eq!(content.title, "Pour Over & You");
        assert_eq!(content.meta_description, "Brew \"better\" coffee");
        assert_eq!(content.word_count, 5);
        assert!(content.body.starts_with("<h1>Pour Over</h1>"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn body_excludes_scripts_and_text_nodes() {
        let parsed = parse_document(
            "<html><head><title> T </title></head><body>loose text\
             <script>track()</script><div><p>Kept</p><style>p{}</style></div></body></html>",
        );
        assert_eq!(parsed.title, "T");
        assert_eq!(parsed.body, "<div><p>Kept</p></div>");
        assert_eq!(parsed.meta_description, "");
    }

    #[test]
    fn word_count_only_counts_paragraphs() {
        let html = "<h2>Heading words here</h2><p>alpha beta</p><ul><li>gamma</li></ul><p>delta</p>";
        assert_eq!(paragraph_word_count(html), 3);
    }

    #[test]
    fn strips_every_h1() {
        let body = "<h1 class=\"x\">Title</h1>\n<p>Text</p><H1>Again\n</H1>";
        assert_eq!(strip_title_markup(body), "<p>Text</p>");
    }
}
