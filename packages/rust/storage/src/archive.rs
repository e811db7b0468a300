//! Archive store: one content record per normalized keyword.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use csv::StringRecord;
use seoranker_shared::{ContentRecord, ContentStatus, Result, SeoRankerError, normalize_keyword};

use crate::table::{self, ARCHIVE, Layout, Table};

const LAYOUTS: &[&Layout] = &[&ARCHIVE];

/// Prefix marking a base64-encoded body cell.
const BODY_PREFIX: &str = "b64:";

/// Repository interface over the content archive.
pub trait ArchiveStore: Send + Sync {
    /// Add a record as a draft. Returns its 1-based position.
    fn append(&self, record: ContentRecord) -> Result<usize>;

    /// Lookup by keyword, insensitive to case and spacing.
    fn get(&self, keyword: &str) -> Result<Option<ContentRecord>>;

    /// Normalized keyword of every well-formed row, including rows whose
    /// status is unrecognized. Each call re-reads the store.
    fn keys(&self) -> Result<Vec<String>>;

    /// Every record in insertion order. Each call re-reads the store.
    fn scan(&self) -> Result<Box<dyn Iterator<Item = ContentRecord> + '_>>;

    /// Change the status of the record with this keyword.
    fn update_status(&self, keyword: &str, status: ContentStatus) -> Result<()>;

    /// Change the status of the first record whose title matches exactly.
    ///
    /// Titles are not unique; prefer [`ArchiveStore::update_status`].
    fn update_status_by_title(&self, title: &str, status: ContentStatus) -> Result<()>;
}

/// [`ArchiveStore`] backed by a single CSV file.
#[derive(Debug, Clone)]
pub struct CsvArchive {
    path: PathBuf,
}

impl CsvArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<StringRecord>> {
        Ok(table::load_table(&self.path, LAYOUTS)?
            .map(|t: Table| t.rows)
            .unwrap_or_default())
    }

    fn ensure_writable(&self) -> Result<()> {
        if table::is_foreign(&self.path, LAYOUTS)? {
            return Err(SeoRankerError::storage(format!(
                "{} has an unrecognized header; refusing to overwrite",
                self.path.display()
            )));
        }
        Ok(())
    }

    /// Apply a status change to the first row selected by `matches`.
    fn rewrite_status(
        &self,
        status: ContentStatus,
        label: &str,
        matches: impl Fn(&StringRecord) -> bool,
    ) -> Result<()> {
        self.ensure_writable()?;
        let mut rows = self.load()?;

        let Some(row) = rows.iter_mut().find(|r| matches(r)) else {
            tracing::warn!(target_record = label, "no archive record matched, status unchanged");
            return Ok(());
        };

        let keyword = row[0].to_string();
        let current: ContentStatus = row[4]
            .parse()
            .map_err(|e: String| SeoRankerError::storage(format!("{keyword}: {e}")))?;

        if current == status {
            tracing::debug!(keyword = %keyword, status = %status, "status already set");
            return Ok(());
        }
        if !current.can_transition_to(status) {
            return Err(SeoRankerError::InvalidTransition {
                keyword,
                from: current,
                to: status,
            });
        }

        *row = replace_field(row, 4, status.as_str());
        table::write_table(&self.path, &ARCHIVE, &rows)?;
        tracing::info!(keyword = %keyword, from = %current, to = %status, "status updated");
        Ok(())
    }
}

impl ArchiveStore for CsvArchive {
    fn append(&self, record: ContentRecord) -> Result<usize> {
        let keyword = normalize_keyword(&record.keyword);
        if keyword.is_empty() {
            return Err(SeoRankerError::validation("archive keyword must not be empty"));
        }
        self.ensure_writable()?;

        let mut rows = self.load()?;
        if rows.iter().any(|r| normalize_keyword(&r[0]) == keyword) {
            return Err(SeoRankerError::DuplicateKey { keyword });
        }

        let record = ContentRecord {
            keyword,
            status: ContentStatus::Draft,
            ..record
        };
        rows.push(to_row(&record));
        table::write_table(&self.path, &ARCHIVE, &rows)?;

        let id = rows.len();
        tracing::debug!(keyword = %record.keyword, id, "archived record");
        Ok(id)
    }

    fn get(&self, keyword: &str) -> Result<Option<ContentRecord>> {
        let wanted = normalize_keyword(keyword);
        Ok(self.scan()?.find(|r| r.keyword == wanted))
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .load()?
            .iter()
            .map(|r| normalize_keyword(&r[0]))
            .filter(|k| !k.is_empty())
            .collect())
    }

    fn scan(&self) -> Result<Box<dyn Iterator<Item = ContentRecord> + '_>> {
        match table::open_table(&self.path, LAYOUTS)? {
            Some(reader) => Ok(Box::new(reader.filter_map(|row| from_row(&row)))),
            None => Ok(Box::new(std::iter::empty())),
        }
    }

    fn update_status(&self, keyword: &str, status: ContentStatus) -> Result<()> {
        let wanted = normalize_keyword(keyword);
        self.rewrite_status(status, &wanted, |r| normalize_keyword(&r[0]) == wanted)
    }

    fn update_status_by_title(&self, title: &str, status: ContentStatus) -> Result<()> {
        self.rewrite_status(status, title, |r| &r[1] == title)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn to_row(record: &ContentRecord) -> StringRecord {
    let word_count = record.word_count.to_string();
    let body = encode_body(&record.body);
    StringRecord::from(vec![
        record.keyword.as_str(),
        record.title.as_str(),
        record.meta_description.as_str(),
        record.file_path.as_str(),
        record.status.as_str(),
        word_count.as_str(),
        body.as_str(),
    ])
}

/// Map a row to a record; rows with an unknown status are skipped.
fn from_row(row: &StringRecord) -> Option<ContentRecord> {
    let status = match row[4].parse::<ContentStatus>() {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(keyword = &row[0], error = %e, "skipping archive row");
            return None;
        }
    };

    Some(ContentRecord {
        keyword: normalize_keyword(&row[0]),
        title: row[1].to_string(),
        meta_description: row[2].to_string(),
        file_path: row[3].to_string(),
        status,
        word_count: row[5].trim().parse().unwrap_or(0),
        body: decode_body(&row[6]),
    })
}

fn replace_field(row: &StringRecord, index: usize, value: &str) -> StringRecord {
    row.iter()
        .enumerate()
        .map(|(i, field)| if i == index { value } else { field })
        .collect()
}

fn encode_body(body: &str) -> String {
    format!("{BODY_PREFIX}{}", STANDARD.encode(body.as_bytes()))
}

/// Decode a body cell. Unprefixed or undecodable cells are returned verbatim.
fn decode_body(cell: &str) -> String {
    cell.strip_prefix(BODY_PREFIX)
        .and_then(|encoded| STANDARD.decode(encoded.trim()).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| cell.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_archive() -> CsvArchive {
        let dir = std::env::temp_dir().join(format!("seoranker_archive_{}", Uuid::now_v7()));
        CsvArchive::new(dir.join("blog_archive.csv"))
    }

    fn record(keyword: &str, title: &str) -> ContentRecord {
        ContentRecord::draft(
            keyword,
            title,
            "A short description.",
            format!("/tmp/{}.html", keyword.replace(' ', "_")),
            42,
            "<h2>Intro</h2>\n<p>Hello, \"world\".</p>",
        )
    }

    #[test]
    fn append_then_get() {
        let archive = test_archive();
        let id = archive
            .append(record("espresso guide", "Espresso Guide"))
            .expect("append");
        assert_eq!(id, 1);

        let found = archive.get("Espresso  Guide ").unwrap().expect("found");
        assert_eq!(found.title, "Espresso Guide");
        assert_eq!(found.word_count, 42);
        assert_eq!(found.body, "<h2>Intro</h2>\n<p>Hello, \"world\".</p>");
        assert_eq!(found.status, ContentStatus::Draft);

        assert!(archive.get("latte art").unwrap().is_none());
    }

    #[test]
    fn duplicate_keyword_rejected() {
        let archive = test_archive();
        archive.append(record("cold brew", "Cold Brew")).unwrap();
        let err = archive
            .append(record("Cold  Brew", "Another Title"))
            .unwrap_err();
        assert!(matches!(err, SeoRankerError::DuplicateKey { keyword } if keyword == "cold brew"));
    }

    #[test]
    fn append_forces_draft_and_numbers_sequentially() {
        let archive = test_archive();
        let mut published = record("french press", "French Press");
        published.status = ContentStatus::Published;
        assert_eq!(archive.append(published).unwrap(), 1);
        assert_eq!(archive.append(record("moka pot", "Moka Pot")).unwrap(), 2);

        let found = archive.get("french press").unwrap().unwrap();
        assert_eq!(found.status, ContentStatus::Draft);
    }

    #[test]
    fn scan_is_ordered_and_restartable() {
        let archive = test_archive();
        assert_eq!(archive.scan().unwrap().count(), 0);

        for kw in ["a", "b", "c"] {
            archive.append(record(kw, &kw.to_uppercase())).unwrap();
        }
        let first: Vec<_> = archive.scan().unwrap().map(|r| r.keyword).collect();
        let second: Vec<_> = archive.scan().unwrap().map(|r| r.keyword).collect();
        assert_eq!(first, vec!["a", "b", "c"]);
        assert_eq!(first, second);
    }

    #[test]
    fn status_lifecycle() {
        let archive = test_archive();
        archive.append(record("pour over", "Pour Over")).unwrap();

        archive
            .update_status("pour over", ContentStatus::Failed)
            .unwrap();
        // Repeated failure is a no-op, not an error.
        archive
            .update_status("pour over", ContentStatus::Failed)
            .unwrap();
        archive
            .update_status("Pour Over", ContentStatus::Published)
            .unwrap();
        assert_eq!(
            archive.get("pour over").unwrap().unwrap().status,
            ContentStatus::Published
        );

        let err = archive
            .update_status("pour over", ContentStatus::Failed)
            .unwrap_err();
        assert!(matches!(err, SeoRankerError::InvalidTransition { .. }));
    }

    #[test]
    fn update_by_title_touches_first_match_only() {
        let archive = test_archive();
        archive.append(record("latte", "Shared Title")).unwrap();
        archive.append(record("mocha", "Shared Title")).unwrap();

        archive
            .update_status_by_title("Shared Title", ContentStatus::Published)
            .unwrap();
        assert_eq!(
            archive.get("latte").unwrap().unwrap().status,
            ContentStatus::Published
        );
        assert_eq!(
            archive.get("mocha").unwrap().unwrap().status,
            ContentStatus::Draft
        );

        // Unknown title is a logged no-op.
        archive
            .update_status_by_title("Nope", ContentStatus::Published)
            .unwrap();
    }

    #[test]
    fn unprefixed_body_read_verbatim() {
        let archive = test_archive();
        std::fs::create_dir_all(archive.path().parent().unwrap()).unwrap();
        std::fs::write(
            archive.path(),
            "keyword,title,meta_description,file_path,status,word_count,body\n\
             chai,Chai,desc,/x.html,draft,3,<p>hand edited</p>\n",
        )
        .unwrap();

        let found = archive.get("chai").unwrap().unwrap();
        assert_eq!(found.body, "<p>hand edited</p>");
    }

    #[test]
    fn keys_include_rows_with_unknown_status() {
        let archive = test_archive();
        std::fs::create_dir_all(archive.path().parent().unwrap()).unwrap();
        std::fs::write(
            archive.path(),
            "keyword,title,meta_description,file_path,status,word_count,body\n\
             Latte,Latte,desc,/x.html,pending,3,<p>hand edited</p>\n\
             chai,Chai,desc,/y.html,draft,3,<p>tea</p>\n",
        )
        .unwrap();

        assert_eq!(archive.keys().unwrap(), vec!["latte", "chai"]);
        assert_eq!(archive.scan().unwrap().count(), 1);
        assert!(matches!(
            archive.append(record("latte", "Again")),
            Err(SeoRankerError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn foreign_file_is_not_clobbered() {
        let archive = test_archive();
        std::fs::create_dir_all(archive.path().parent().unwrap()).unwrap();
        std::fs::write(archive.path(), "name,value\nx,1\n").unwrap();

        assert_eq!(archive.scan().unwrap().count(), 0);
        assert!(archive.append(record("tea", "Tea")).is_err());
        let content = std::fs::read_to_string(archive.path()).unwrap();
        assert!(content.starts_with("name,value"));
    }
}
