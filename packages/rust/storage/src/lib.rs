//! Flat-file stores for SEO Ranker.
//!
//! Three CSV files live under the knowledge-base directory:
//! - the content archive ([`CsvArchive`] behind [`ArchiveStore`])
//! - cached reference text ([`RawContentStore`])
//! - question-panel suggestions ([`SuggestionStore`])
//!
//! [`DedupIndex`] is a derived view over the first two.
//!
//! **Access rules:** every write reads the full file, mutates it in memory,
//! and rewrites it through a temp file + rename. A single active process is
//! assumed; there is no locking.

mod table;

pub mod archive;
pub mod dedup;
pub mod raw_content;
pub mod suggestions;

pub use archive::{ArchiveStore, CsvArchive};
pub use dedup::DedupIndex;
pub use raw_content::RawContentStore;
pub use suggestions::SuggestionStore;

use seoranker_shared::PathsConfig;

/// The three stores opened from one set of configured paths.
#[derive(Debug, Clone)]
pub struct Stores {
    pub archive: CsvArchive,
    pub raw_content: RawContentStore,
    pub suggestions: SuggestionStore,
}

impl Stores {
    pub fn open(paths: &PathsConfig) -> Self {
        Self {
            archive: CsvArchive::new(paths.archive_path()),
            raw_content: RawContentStore::new(paths.raw_content_path()),
            suggestions: SuggestionStore::new(paths.suggestions_path()),
        }
    }

    pub fn dedup_index(&self) -> DedupIndex {
        DedupIndex::load(&self.archive, &self.raw_content)
    }
}
