//! In-memory "already processed?" view over the archive and raw-content stores.

use std::collections::HashSet;

use seoranker_shared::normalize_keyword;

use crate::archive::ArchiveStore;
use crate::raw_content::RawContentStore;

/// Hash-set snapshot built from one scan of each store.
///
/// Loading never fails: an unreadable store is logged and contributes nothing.
#[derive(Debug, Default, Clone)]
pub struct DedupIndex {
    archived: HashSet<String>,
    researched: HashSet<String>,
    references: HashSet<(String, String)>,
}

impl DedupIndex {
    pub fn load(archive: &dyn ArchiveStore, raw_content: &RawContentStore) -> Self {
        let mut index = Self::default();

        // Keys rather than records: a row with an unrecognized status still
        // occupies its keyword.
        match archive.keys() {
            Ok(keys) => index.archived.extend(keys),
            Err(e) => tracing::warn!(error = %e, "archive unreadable, dedup index treats it as empty"),
        }

        match raw_content.entries() {
            Ok(entries) => {
                for entry in entries.into_iter().filter(|e| !e.keyword.is_empty()) {
                    index.researched.insert(entry.keyword.clone());
                    index.references.insert((entry.keyword, entry.url));
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "raw content unreadable, dedup index treats it as empty")
            }
        }

        tracing::debug!(
            archived = index.archived.len(),
            researched = index.researched.len(),
            references = index.references.len(),
            "dedup index loaded"
        );
        index
    }

    /// Whether the keyword is archived or has cached references.
    pub fn exists(&self, keyword: &str) -> bool {
        let key = normalize_keyword(keyword);
        self.archived.contains(&key) || self.researched.contains(&key)
    }

    /// Whether an archive record exists for the keyword.
    pub fn is_archived(&self, keyword: &str) -> bool {
        self.archived.contains(&normalize_keyword(keyword))
    }

    /// Whether the raw-content store holds any reference for the keyword.
    pub fn is_researched(&self, keyword: &str) -> bool {
        self.researched.contains(&normalize_keyword(keyword))
    }

    pub fn has_reference(&self, keyword: &str, url: &str) -> bool {
        self.references
            .contains(&(normalize_keyword(keyword), url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::CsvArchive;
    use seoranker_shared::{ContentRecord, RawContentEntry};
    use std::path::PathBuf;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("seoranker_dedup_{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn archived_keyword_exists_regardless_of_spacing() {
        let dir = temp_dir();
        let archive = CsvArchive::new(dir.join("blog_archive.csv"));
        let raw = RawContentStore::new(dir.join("content_database.csv"));
        archive
            .append(ContentRecord::draft("espresso guide", "T", "", "", 0, ""))
            .unwrap();

        let index = DedupIndex::load(&archive, &raw);
        assert!(index.exists("Espresso  Guide "));
        assert!(index.is_archived("espresso guide"));
        assert!(!index.exists("latte art"));
    }

    #[test]
    fn raw_content_keyword_exists() {
        let dir = temp_dir();
        let archive = CsvArchive::new(dir.join("blog_archive.csv"));
        let raw = RawContentStore::new(dir.join("content_database.csv"));
        raw.insert(RawContentEntry {
            keyword: "cold brew".into(),
            url: "https://a.test".into(),
            title: String::new(),
            content: "text".into(),
        })
        .unwrap();

        let index = DedupIndex::load(&archive, &raw);
        assert!(index.exists("cold brew"));
        assert!(!index.is_archived("cold brew"));
        assert!(index.is_researched("Cold Brew"));
        assert!(index.has_reference("cold brew", "https://a.test"));
        assert!(!index.has_reference("cold brew", "https://b.test"));
    }

    #[test]
    fn tolerates_missing_and_malformed_stores() {
        let dir = temp_dir();
        std::fs::write(dir.join("blog_archive.csv"), "garbage header only").unwrap();
        std::fs::write(
            dir.join("content_database.csv"),
            "keyword,url,title,content\nmatcha,https://m.test,T,text\nmatcha latte,https://",
        )
        .unwrap();

        let archive = CsvArchive::new(dir.join("blog_archive.csv"));
        let raw = RawContentStore::new(dir.join("content_database.csv"));
        let index = DedupIndex::load(&archive, &raw);

        assert!(index.exists("matcha"));
        assert!(!index.exists("matcha latte"));

        let empty = DedupIndex::load(
            &CsvArchive::new(dir.join("nope.csv")),
            &RawContentStore::new(dir.join("nope2.csv")),
        );
        assert!(!empty.exists("matcha"));
    }

    #[test]
    fn row_with_unknown_status_still_counts_as_archived() {
        let dir = temp_dir();
        std::fs::write(
            dir.join("blog_archive.csv"),
            "keyword,title,meta_description,file_path,status,word_count,body\n\
             latte,Latte,desc,/x.html,pending,3,<p>hand edited</p>\n",
        )
        .unwrap();

        let archive = CsvArchive::new(dir.join("blog_archive.csv"));
        let raw = RawContentStore::new(dir.join("content_database.csv"));
        let index = DedupIndex::load(&archive, &raw);

        assert!(index.exists("latte"));
        assert!(index.is_archived("Latte"));
    }
}
