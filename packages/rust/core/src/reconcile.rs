//! Register artifact files that were created outside a generation run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use seoranker_artifacts::{ARTIFACT_EXTENSION, keyword_from_path, read_artifact};
use seoranker_shared::{ContentRecord, Result, SeoRankerError};
use seoranker_storage::ArchiveStore;

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Artifact files found.
    pub total: usize,
    /// Files appended to the archive as drafts.
    pub new: usize,
    /// Files whose keyword was already archived.
    pub skipped: usize,
    /// Files that could not be read or recorded.
    pub failed: usize,
}

/// Append a draft record for every `*.html` artifact in `output_dir` whose
/// keyword is not yet archived. Files are visited in name order. A missing
/// directory yields an empty report.
#[instrument(skip_all, fields(output_dir = %output_dir.display()))]
pub fn reconcile(archive: &dyn ArchiveStore, output_dir: &Path) -> Result<ReconcileReport> {
    let files = artifact_files(output_dir)?;
    let mut known: HashSet<String> = archive.keys()?.into_iter().collect();
    let mut report = ReconcileReport {
        total: files.len(),
        ..Default::default()
    };

    for path in files {
        let Some(keyword) = keyword_from_path(&path) else {
            warn!(path = %path.display(), "no keyword in artifact file name");
            report.failed += 1;
            continue;
        };
        if known.contains(&keyword) {
            debug!(keyword = %keyword, "already archived");
            report.skipped += 1;
            continue;
        }

        let content = match read_artifact(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable artifact");
                report.failed += 1;
                continue;
            }
        };

        let absolute = std::path::absolute(&path).unwrap_or_else(|_| path.clone());
        let record = ContentRecord::draft(
            &keyword,
            content.title,
            content.meta_description,
            absolute.to_string_lossy(),
            content.word_count,
            content.body,
        );

        match archive.append(record) {
            Ok(id) => {
                info!(keyword = %keyword, id, "archived orphaned artifact");
                known.insert(keyword);
                report.new += 1;
            }
            Err(SeoRankerError::DuplicateKey { .. }) => {
                known.insert(keyword);
                report.skipped += 1;
            }
            Err(e) => {
                warn!(keyword = %keyword, error = %e, "failed to archive artifact");
                report.failed += 1;
            }
        }
    }

    info!(
        total = report.total,
        new = report.new,
        skipped = report.skipped,
        failed = report.failed,
        "reconciliation complete"
    );
    Ok(report)
}

fn artifact_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SeoRankerError::io(dir, e)),
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ARTIFACT_EXTENSION))
        })
        .collect();
    files.sort();
    Ok(files)
}
