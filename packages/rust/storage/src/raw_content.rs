//! Raw-content store: scraped reference text keyed by (keyword, url).
//!
//! Files in the older url-only layout are still readable. Their rows carry
//! an empty keyword, so keyword lookups never match them, and the file is
//! rewritten in the keyed layout on the next insert.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use seoranker_shared::{RawContentEntry, Result, SeoRankerError, normalize_keyword};

use crate::table::{self, Layout, RAW_CONTENT, RAW_CONTENT_LEGACY};

const LAYOUTS: &[&Layout] = &[&RAW_CONTENT, &RAW_CONTENT_LEGACY];

/// Write-once cache of extracted reference text.
#[derive(Debug, Clone)]
pub struct RawContentStore {
    path: PathBuf,
}

impl RawContentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every entry in file order.
    pub fn entries(&self) -> Result<Vec<RawContentEntry>> {
        let Some(table) = table::load_table(&self.path, LAYOUTS)? else {
            return Ok(Vec::new());
        };
        let legacy = table.layout == &RAW_CONTENT_LEGACY;
        Ok(table
            .rows
            .iter()
            .map(|row| from_row(row, legacy))
            .collect())
    }

    /// Entries cached for one keyword, in file order.
    pub fn for_keyword(&self, keyword: &str) -> Result<Vec<RawContentEntry>> {
        let wanted = normalize_keyword(keyword);
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.keyword == wanted)
            .collect())
    }

    pub fn contains(&self, keyword: &str, url: &str) -> Result<bool> {
        Ok(self.for_keyword(keyword)?.iter().any(|e| e.url == url))
    }

    /// Sorted, unique, non-empty keywords present in the store.
    pub fn keywords(&self) -> Result<Vec<String>> {
        let set: BTreeSet<String> = self
            .entries()?
            .into_iter()
            .map(|e| e.keyword)
            .filter(|k| !k.is_empty())
            .collect();
        Ok(set.into_iter().collect())
    }

    /// Insert an entry unless (keyword, url) is already present.
    ///
    /// Returns `true` when a row was written.
    pub fn insert(&self, entry: RawContentEntry) -> Result<bool> {
        let keyword = normalize_keyword(&entry.keyword);
        if keyword.is_empty() {
            return Err(SeoRankerError::validation("raw content keyword must not be empty"));
        }
        if table::is_foreign(&self.path, LAYOUTS)? {
            return Err(SeoRankerError::storage(format!(
                "{} has an unrecognized header; refusing to overwrite",
                self.path.display()
            )));
        }

        let mut entries = self.entries()?;
        if entries.iter().any(|e| e.keyword == keyword && e.url == entry.url) {
            return Ok(false);
        }
        entries.push(RawContentEntry { keyword, ..entry });

        let rows: Vec<StringRecord> = entries.iter().map(to_row).collect();
        table::write_table(&self.path, &RAW_CONTENT, &rows)?;
        Ok(true)
    }
}

fn to_row(entry: &RawContentEntry) -> StringRecord {
    StringRecord::from(vec![
        entry.keyword.as_str(),
        entry.url.as_str(),
        entry.title.as_str(),
        entry.content.as_str(),
    ])
}

fn from_row(row: &StringRecord, legacy: bool) -> RawContentEntry {
    if legacy {
        RawContentEntry {
            keyword: String::new(),
            url: row[0].to_string(),
            title: row[1].to_string(),
            content: row[2].to_string(),
        }
    } else {
        RawContentEntry {
            keyword: normalize_keyword(&row[0]),
            url: row[1].to_string(),
            title: row[2].to_string(),
            content: row[3].to_string(),
        }
    }
}
