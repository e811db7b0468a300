//! Flat CSV table layouts and the read/rewrite primitives shared by every
//! store.
//!
//! Each store recognizes one or more header layouts. A file whose header is
//! missing or unrecognized reads as empty; rows whose field count does not
//! match the header (e.g. a truncated final row) are skipped.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use seoranker_shared::{Result, SeoRankerError};
use uuid::Uuid;

/// A recognized CSV header layout.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Layout {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

impl Layout {
    fn matches(&self, header: &StringRecord) -> bool {
        header.len() == self.columns.len()
            && header.iter().zip(self.columns).all(|(found, expected)| {
                found
                    .trim_start_matches('\u{feff}')
                    .trim()
                    .eq_ignore_ascii_case(expected)
            })
    }

    pub fn header(&self) -> StringRecord {
        StringRecord::from(self.columns.to_vec())
    }
}

pub(crate) const ARCHIVE: Layout = Layout {
    name: "archive",
    columns: &[
        "keyword",
        "title",
        "meta_description",
        "file_path",
        "status",
        "word_count",
        "body",
    ],
};

pub(crate) const RAW_CONTENT: Layout = Layout {
    name: "raw_content",
    columns: &["keyword", "url", "title", "content"],
};

/// Url-keyed layout written before references were keyed by keyword.
pub(crate) const RAW_CONTENT_LEGACY: Layout = Layout {
    name: "raw_content_legacy",
    columns: &["url", "title", "content"],
};

pub(crate) const SUGGESTIONS: Layout = Layout {
    name: "suggestions",
    columns: &["source_keyword", "question", "title", "url"],
};

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Streaming row reader over one table file.
pub(crate) struct TableReader {
    pub layout: &'static Layout,
    path: PathBuf,
    records: csv::StringRecordsIntoIter<File>,
}

impl Iterator for TableReader {
    type Item = StringRecord;

    fn next(&mut self) -> Option<StringRecord> {
        loop {
            match self.records.next()? {
                Ok(record) if record.len() == self.layout.columns.len() => return Some(record),
                Ok(record) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        fields = record.len(),
                        expected = self.layout.columns.len(),
                        "skipping malformed row"
                    );
                }
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "skipping unreadable row");
                }
            }
        }
    }
}

/// Open a table for streaming.
///
/// Returns `None` when the file is missing, empty, or carries a header that
/// matches none of `layouts`.
pub(crate) fn open_table(
    path: &Path,
    layouts: &'static [&'static Layout],
) -> Result<Option<TableReader>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SeoRankerError::io(path, e)),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let header = match reader.headers() {
        Ok(header) if !header.is_empty() => header.clone(),
        Ok(_) => return Ok(None),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable header, treating store as empty");
            return Ok(None);
        }
    };

    let Some(layout) = layouts.iter().copied().find(|l| l.matches(&header)) else {
        tracing::warn!(
            path = %path.display(),
            header = ?header.iter().collect::<Vec<_>>(),
            "unrecognized header, treating store as empty"
        );
        return Ok(None);
    };

    Ok(Some(TableReader {
        layout,
        path: path.to_path_buf(),
        records: reader.into_records(),
    }))
}

/// Fully materialized table.
pub(crate) struct Table {
    pub layout: &'static Layout,
    pub rows: Vec<StringRecord>,
}

/// Read a whole table into memory (`None` under the same rules as [`open_table`]).
pub(crate) fn load_table(
    path: &Path,
    layouts: &'static [&'static Layout],
) -> Result<Option<Table>> {
    Ok(open_table(path, layouts)?.map(|reader| Table {
        layout: reader.layout,
        rows: reader.collect(),
    }))
}

/// Whether a file exists with content that no layout recognizes. Writers
/// refuse to clobber such files.
pub(crate) fn is_foreign(path: &Path, layouts: &'static [&'static Layout]) -> Result<bool> {
    let non_empty = match std::fs::metadata(path) {
        Ok(meta) => meta.len() > 0,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => return Err(SeoRankerError::io(path, e)),
    };
    Ok(non_empty && open_table(path, layouts)?.is_none())
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Rewrite the whole table: write a sibling temp file, then rename over the
/// target.
pub(crate) fn write_table(path: &Path, layout: &Layout, rows: &[StringRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SeoRankerError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table.csv".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::now_v7()));

    let result = write_rows(&tmp, layout, rows).and_then(|()| {
        std::fs::rename(&tmp, path).map_err(|e| SeoRankerError::io(path, e))
    });
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

fn write_rows(path: &Path, layout: &Layout, rows: &[StringRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| SeoRankerError::storage(format!("{}: {e}", path.display())))?;

    writer
        .write_record(&layout.header())
        .map_err(|e| SeoRankerError::storage(e.to_string()))?;
    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| SeoRankerError::storage(e.to_string()))?;
    }
    writer.flush().map_err(|e| SeoRankerError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("seoranker_table_{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir.join(name)
    }

    #[test]
    fn missing_file_reads_as_none() {
        let path = temp_file("absent.csv");
        assert!(load_table(&path, &[&SUGGESTIONS]).unwrap().is_none());
        assert!(!is_foreign(&path, &[&SUGGESTIONS]).unwrap());
    }

    #[test]
    fn unrecognized_header_reads_as_none() {
        let path = temp_file("odd.csv");
        std::fs::write(&path, "a,b,c\n1,2,3\n").unwrap();
        assert!(load_table(&path, &[&SUGGESTIONS]).unwrap().is_none());
        assert!(is_foreign(&path, &[&SUGGESTIONS]).unwrap());
    }

    #[test]
    fn header_match_ignores_case_and_bom() {
        let path = temp_file("bom.csv");
        std::fs::write(
            &path,
            "\u{feff}Source_Keyword,Question,Title,URL\nk,q?,t,https://x.test\n",
        )
        .unwrap();
        let table = load_table(&path, &[&SUGGESTIONS]).unwrap().expect("table");
        assert_eq!(table.layout, &SUGGESTIONS);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn truncated_final_row_is_skipped() {
        let path = temp_file("trunc.csv");
        std::fs::write(
            &path,
            "source_keyword,question,title,url\nk,q1,t,https://a.test\nk,q2",
        )
        .unwrap();
        let table = load_table(&path, &[&SUGGESTIONS]).unwrap().expect("table");
        assert_eq!(table.rows.len(), 1);
        assert_eq!(&table.rows[0][1], "q1");
    }

    #[test]
    fn rewrite_preserves_multiline_fields() {
        let path = temp_file("rw.csv");
        let rows = vec![StringRecord::from(vec![
            "k",
            "line one\nline \"two\"",
            "t",
            "u",
        ])];
        write_table(&path, &SUGGESTIONS, &rows).unwrap();

        let table = load_table(&path, &[&SUGGESTIONS]).unwrap().expect("table");
        assert_eq!(&table.rows[0][1], "line one\nline \"two\"");

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
