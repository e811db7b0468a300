//! Result filters: transactional-domain denylist and informational signal terms.

use url::Url;

/// Decides which search results are worth extracting.
#[derive(Debug, Clone)]
pub struct ResultFilter {
    denylist: Vec<String>,
    signal_terms: Vec<String>,
}

impl ResultFilter {
    pub fn new(denylist: &[String], signal_terms: &[String]) -> Self {
        Self {
            denylist: denylist
                .iter()
                .map(|d| d.trim().trim_start_matches("www.").to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
            signal_terms: signal_terms
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// True when the URL host equals, or is a subdomain of, a denylisted
    /// domain. Unparseable URLs are treated as denylisted.
    pub fn is_denylisted(&self, url: &str) -> bool {
        let Some(host) = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        else {
            return true;
        };

        self.denylist.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// Number of distinct signal terms found in title + snippet.
    pub fn signal_hits(&self, title: &str, snippet: &str) -> usize {
        let haystack = format!("{title} {snippet}").to_lowercase();
        self.signal_terms
            .iter()
            .filter(|term| haystack.contains(term.as_str()))
            .count()
    }

    pub fn has_signal(&self, title: &str, snippet: &str) -> bool {
        self.signal_hits(title, snippet) > 0
    }
}
