//! Question-panel harvest, identity = (normalized source keyword, question).

use std::path::{Path, PathBuf};

use csv::StringRecord;
use seoranker_shared::{Result, SeoRankerError, Suggestion, normalize_keyword};

use crate::table::{self, Layout, SUGGESTIONS};

const LAYOUTS: &[&Layout] = &[&SUGGESTIONS];

#[derive(Debug, Clone)]
pub struct SuggestionStore {
    path: PathBuf,
}

impl SuggestionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn all(&self) -> Result<Vec<Suggestion>> {
        Ok(table::load_table(&self.path, LAYOUTS)?
            .map(|t| t.rows.iter().map(from_row).collect())
            .unwrap_or_default())
    }

    pub fn for_keyword(&self, keyword: &str) -> Result<Vec<Suggestion>> {
        let wanted = normalize_keyword(keyword);
        Ok(self
            .all()?
            .into_iter()
            .filter(|s| s.source_keyword == wanted)
            .collect())
    }

    /// Append suggestions not already stored. Returns how many were added.
    pub fn insert_many(&self, suggestions: impl IntoIterator<Item = Suggestion>) -> Result<usize> {
        if table::is_foreign(&self.path, LAYOUTS)? {
            return Err(SeoRankerError::storage(format!(
                "{} has an unrecognized header; refusing to overwrite",
                self.path.display()
            )));
        }

        let mut stored = self.all()?;
        let before = stored.len();
        for suggestion in suggestions {
            let suggestion = Suggestion {
                source_keyword: normalize_keyword(&suggestion.source_keyword),
                question: suggestion.question.trim().to_string(),
                ..suggestion
            };
            if suggestion.question.is_empty() {
                continue;
            }
            let seen = stored.iter().any(|s| {
                s.source_keyword == suggestion.source_keyword && s.question == suggestion.question
            });
            if !seen {
                stored.push(suggestion);
            }
        }

        let added = stored.len() - before;
        if added > 0 {
            let rows: Vec<StringRecord> = stored.iter().map(to_row).collect();
            table::write_table(&self.path, &SUGGESTIONS, &rows)?;
        }
        Ok(added)
    }
}

fn to_row(s: &Suggestion) -> StringRecord {
    StringRecord::from(vec![
        s.source_keyword.as_str(),
        s.question.as_str(),
        s.title.as_str(),
        s.url.as_str(),
    ])
}

fn from_row(row: &StringRecord) -> Suggestion {
    Suggestion {
        source_keyword: normalize_keyword(&row[0]),
        question: row[1].trim().to_string(),
        title: row[2].to_string(),
        url: row[3].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn suggestion(keyword: &str, question: &str) -> Suggestion {
        Suggestion {
            source_keyword: keyword.into(),
            question: question.into(),
            title: "Some page".into(),
            url: "https://q.test/page".into(),
        }
    }

    #[test]
    fn dedupes_on_keyword_and_question() {
        let dir = std::env::temp_dir().join(format!("seoranker_sugg_{}", Uuid::now_v7()));
        let store = SuggestionStore::new(dir.join("suggestions_database.csv"));

        let added = store
            .insert_many([
                suggestion("Pour Over", "What grind size for pour over?"),
                suggestion("pour over", "What grind size for pour over?"),
                suggestion("pour over", "How long should it brew?"),
                suggestion("espresso", "What grind size for pour over?"),
            ])
            .unwrap();
        assert_eq!(added, 3);

        let added_again = store
            .insert_many([suggestion("POUR OVER", " How long should it brew? ")])
            .unwrap();
        assert_eq!(added_again, 0);

        assert_eq!(store.for_keyword("pour over").unwrap().len(), 2);
        assert_eq!(store.all().unwrap().len(), 3);
    }
}
