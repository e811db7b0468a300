//! Prompt assembly and the generation call.
//!
//! The prompt template is data: `${name}` placeholders are filled from the
//! keyword, the reference documents, stored questions, related archive
//! records and the brand profile. Unknown placeholders are left as written.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use tracing::{debug, info, instrument, warn};

use seoranker_llm::TextGenerator;
use seoranker_shared::{
    BrandConfig, ContentRecord, GenerationConfig, ReferenceDocument, Result, SourceType,
    Suggestion, normalize_keyword,
};
use seoranker_storage::{ArchiveStore, SuggestionStore};

/// Maximum number of related archive records offered as internal links.
pub const MAX_INTERNAL_LINKS: usize = 3;

/// Built-in prompt used when `generation.prompt_template` is unset.
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"Write a comprehensive, SEO-optimized blog post about ${keyword} for ${brand_name}.

Brand voice:
- Tagline: ${tagline}
- Tone: ${tone}
- Audience: ${audience}
- Balance expert knowledge with accessible language.

Content structure:
1. Introduction: open with a strong hook about ${keyword} and preview the value for the reader.
2. Two or three main sections based on the reference material below, each with expert insight and cited sources.
3. A section showing how ${product_name} fits into the topic.
4. Conclusion with one call to action.

Product references (mention naturally, link to ${product_url}):
${product_details}

Calls to action (use one):
${cta}

Questions readers ask:
${questions}

Internal blog posts to link where relevant:
${internal_links}

Reference sources:
${sources}

SEO requirements:
- Primary keyword: ${keyword}
- Use the keyword naturally throughout
- Include two or three external authority links for educational claims only
- Minimum length: 2000 words
- Provide a meta description of about 155 characters
"#;

/// Fixed response contract appended to every prompt. The parser relies on it.
pub const OUTPUT_CONTRACT: &str = r#"Respond ONLY with the following structure, with no suggestions or extra sections:

<metadata>
title: [Blog post title]
meta_description: [155 character meta description]
</metadata>

<content>
[Full HTML blog post content]
</content>

Formatting rules:
1. Use HTML tags (<h1>, <h2>, <h3>, <p>, <ul>, <li>)
2. Include exactly one <h1> tag
3. Include two or three <h2> tags
4. Format links as <a href="url" target="_blank">text</a>
"#;

const NONE_TEXT: &str = "None";

// ---------------------------------------------------------------------------
// Template rendering
// ---------------------------------------------------------------------------

/// Substitute `${name}` placeholders. Unknown names stay verbatim and
/// substituted values are not expanded again.
pub fn render_template(template: &str, vars: &HashMap<&str, String>) -> String {
    static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex")
    });
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Longest prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn format_sources(references: &[ReferenceDocument], snippet_chars: usize) -> String {
    if references.is_empty() {
        return NONE_TEXT.to_string();
    }
    references
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let kind = match doc.source_type {
                SourceType::Article => "article",
                SourceType::Qa => "q&a",
            };
            format!(
                "[{}] {}\nURL: {}\nType: {} ({})\nExcerpt: {}",
                i + 1,
                doc.title,
                doc.url,
                kind,
                doc.query_type,
                truncate_chars(doc.extracted_text.trim(), snippet_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_questions(questions: &[Suggestion]) -> String {
    if questions.is_empty() {
        return NONE_TEXT.to_string();
    }
    questions
        .iter()
        .map(|q| {
            if q.url.is_empty() {
                format!("- {}", q.question)
            } else {
                format!("- {} (see: {} <{}>)", q.question, q.title, q.url)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_internal_links(records: &[ContentRecord]) -> String {
    if records.is_empty() {
        return NONE_TEXT.to_string();
    }
    records
        .iter()
        .map(|r| format!("- {} (keyword: {}, file: {})", r.title, r.keyword, r.file_path))
        .collect::<Vec<_>>()
        .join("\n")
}

fn bullet_list(items: &[String]) -> String {
    let lines: Vec<_> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| format!("- {s}"))
        .collect();
    if lines.is_empty() {
        NONE_TEXT.to_string()
    } else {
        lines.join("\n")
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Assembles prompts and calls the configured provider chain.
pub struct Generator {
    config: GenerationConfig,
    provider: Box<dyn TextGenerator>,
    archive: Arc<dyn ArchiveStore>,
    suggestions: SuggestionStore,
}

impl Generator {
    pub fn new(
        config: GenerationConfig,
        provider: Box<dyn TextGenerator>,
        archive: Arc<dyn ArchiveStore>,
        suggestions: SuggestionStore,
    ) -> Self {
        Self {
            config,
            provider,
            archive,
            suggestions,
        }
    }

    pub fn provider_name(&self) -> String {
        self.provider.name()
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Up to [`MAX_INTERNAL_LINKS`] other archive records whose keyword or
    /// title contains `keyword`.
    pub fn related_records(&self, keyword: &str) -> Vec<ContentRecord> {
        let keyword = normalize_keyword(keyword);
        if keyword.is_empty() {
            return Vec::new();
        }
        match self.archive.scan() {
            Ok(records) => records
                .filter(|r| r.keyword != keyword)
                .filter(|r| r.keyword.contains(&keyword) || r.title.to_lowercase().contains(&keyword))
                .take(MAX_INTERNAL_LINKS)
                .collect(),
            Err(e) => {
                warn!(error = %e, "archive unreadable, no internal links");
                Vec::new()
            }
        }
    }

    /// Build the full prompt: rendered template followed by the output contract.
    pub fn build_prompt(
        &self,
        keyword: &str,
        references: &[ReferenceDocument],
        brand: &BrandConfig,
    ) -> String {
        let keyword = normalize_keyword(keyword);
        let questions = self.suggestions.for_keyword(&keyword).unwrap_or_else(|e| {
            warn!(error = %e, "suggestions unreadable, no questions");
            Vec::new()
        });
        let related = self.related_records(&keyword);

        let vars: HashMap<&str, String> = HashMap::from([
            ("keyword", keyword.clone()),
            ("sources", format_sources(references, self.config.snippet_chars)),
            ("questions", format_questions(&questions)),
            ("internal_links", format_internal_links(&related)),
            ("brand_name", brand.name.clone()),
            ("tagline", brand.tagline.clone()),
            ("tone", brand.tone.clone()),
            ("audience", brand.audience.clone()),
            ("product_name", brand.product_name.clone()),
            ("product_url", brand.product_url.clone()),
            ("product_details", bullet_list(&brand.product_details)),
            ("cta", bullet_list(&brand.cta)),
        ]);

        let template = self
            .config
            .prompt_template
            .as_deref()
            .unwrap_or(DEFAULT_PROMPT_TEMPLATE);

        debug!(
            sources = references.len(),
            questions = questions.len(),
            internal_links = related.len(),
            "prompt assembled"
        );
        format!("{}\n\n{OUTPUT_CONTRACT}", render_template(template, &vars).trim_end())
    }

    /// Generate raw model output for `keyword`.
    #[instrument(skip_all, fields(keyword = %keyword, sources = references.len()))]
    pub async fn generate(
        &self,
        keyword: &str,
        references: &[ReferenceDocument],
        brand: &BrandConfig,
    ) -> Result<String> {
        let prompt = self.build_prompt(keyword, references, brand);
        info!(
            provider = %self.provider_name(),
            prompt_chars = prompt.len(),
            "generating draft"
        );
        self.provider.generate(&prompt, self.config.max_tokens).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use seoranker_storage::CsvArchive;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct Echo {
        prompts: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl TextGenerator for Echo {
        fn name(&self) -> String {
            "echo".into()
        }
        fn max_output_tokens(&self) -> u32 {
            4096
        }
        async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("ok".into())
        }
    }

    fn generator(config: GenerationConfig) -> (Generator, Arc<CsvArchive>, SuggestionStore, Arc<Mutex<Vec<String>>>) {
        let dir = std::env::temp_dir().join(format!("seoranker_generation_{}", Uuid::now_v7()));
        let archive = Arc::new(CsvArchive::new(dir.join("blog_archive.csv")));
        let suggestions = SuggestionStore::new(dir.join("suggestions_database.csv"));
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let generator = Generator::new(
            config,
            Box::new(Echo {
                prompts: prompts.clone(),
            }),
            archive.clone(),
            suggestions.clone(),
        );
        (generator, archive, suggestions, prompts)
    }

    fn reference(url: &str, text: &str) -> ReferenceDocument {
        ReferenceDocument {
            url: url.into(),
            title: format!("Title of {url}"),
            extracted_text: text.into(),
            source_type: SourceType::Article,
            relevance_score: 1.0,
            query_type: "guide".into(),
        }
    }

    #[test]
    fn unknown_placeholders_stay_verbatim() {
        let vars = HashMap::from([("keyword", "espresso".to_string())]);
        assert_eq!(
            render_template("about ${keyword} and ${unknown} cost $5 {keyword}", &vars),
            "about espresso and ${unknown} cost $5 {keyword}"
        );
    }

    #[test]
    fn substituted_values_are_not_reexpanded() {
        let vars = HashMap::from([
            ("a", "${b}".to_string()),
            ("b", "nope".to_string()),
        ]);
        assert_eq!(render_template("${a}", &vars), "${b}");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("short", 500), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn prompt_carries_sources_questions_links_and_contract() {
        let config = GenerationConfig {
            snippet_chars: 10,
            ..Default::default()
        };
        let (generator, archive, suggestions, _) = generator(config);
        archive
            .append(ContentRecord::draft(
                "pour over coffee ratio",
                "The Perfect Pour Over Ratio",
                "meta",
                "/out/pour_over_coffee_ratio.html",
                900,
                "<p>x</p>",
            ))
            .unwrap();
        archive
            .append(ContentRecord::draft("espresso", "Espresso Basics", "m", "/out/e.html", 10, ""))
            .unwrap();
        suggestions
            .insert_many([Suggestion {
                source_keyword: "pour over coffee".into(),
                question: "Is pour over stronger?".into(),
                title: "Strength".into(),
                url: "https://qa.test/strength".into(),
            }])
            .unwrap();

        let brand = BrandConfig {
            name: "Bean Co".into(),
            cta: vec!["Order today".into()],
            ..Default::default()
        };
        let prompt = generator.build_prompt(
            "Pour Over Coffee",
            &[reference("https://coffee.test/guide", "0123456789abcdef")],
            &brand,
        );

        assert!(prompt.contains("blog post about pour over coffee for Bean Co"));
        assert!(prompt.contains("Excerpt: 0123456789\n"));
        assert!(!prompt.contains("abcdef"));
        assert!(prompt.contains("Is pour over stronger?"));
        assert!(prompt.contains("The Perfect Pour Over Ratio"));
        assert!(!prompt.contains("Espresso Basics"));
        assert!(prompt.contains("- Order today"));
        assert!(prompt.trim_end().ends_with(OUTPUT_CONTRACT.trim_end()));
    }

    #[test]
    fn custom_template_is_used() {
        let config = GenerationConfig {
            prompt_template: Some("Topic=${keyword}; Brand=${brand_name}; ${mystery}".into()),
            ..Default::default()
        };
        let (generator, _, _, _) = generator(config);
        let prompt = generator.build_prompt("cold brew", &[], &BrandConfig::default());
        assert!(prompt.starts_with("Topic=cold brew; Brand=Our Brand; ${mystery}"));
    }

    #[test]
    fn internal_links_capped() {
        let (generator, archive, _, _) = generator(GenerationConfig::default());
        for suffix in ["a", "b", "c", "d"] {
            archive
                .append(ContentRecord::draft(
                    &format!("latte {suffix}"),
                    format!("Latte {suffix}"),
                    "",
                    "",
                    0,
                    "",
                ))
                .unwrap();
        }
        assert_eq!(generator.related_records("latte").len(), MAX_INTERNAL_LINKS);
    }

    #[tokio::test]
    async fn generate_sends_prompt_to_provider() {
        let (generator, _, _, prompts) = generator(GenerationConfig::default());
        let out = generator
            .generate("matcha", &[], &BrandConfig::default())
            .await
            .unwrap();
        assert_eq!(out, "ok");
        assert_eq!(generator.provider_name(), "echo");
        let sent = prompts.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("matcha"));
    }
}
