//! Publish pending drafts to the CMS.

use std::path::Path;

use tracing::{error, info, instrument, warn};

use seoranker_artifacts::{read_artifact, strip_title_markup};
use seoranker_cms::{ArticleDraft, CmsPublisher};
use seoranker_shared::{ContentRecord, ContentStatus, Result};
use seoranker_storage::ArchiveStore;

use crate::pipeline::ProgressReporter;

/// Result of publishing one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published { article_id: String },
    Failed { reason: String },
}

/// Counts and per-keyword outcomes of one publish pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub published: usize,
    pub failed: usize,
    pub entries: Vec<(String, PublishOutcome)>,
}

/// Publish every record whose status is draft or failed.
///
/// A failure is recorded on the record and never aborts the batch; failed
/// records are selected again on the next pass.
#[instrument(skip_all)]
pub async fn publish_pending(
    archive: &dyn ArchiveStore,
    cms: &dyn CmsPublisher,
    progress: &dyn ProgressReporter,
) -> Result<PublishReport> {
    let pending: Vec<ContentRecord> = archive
        .scan()?
        .filter(|r| r.status.is_publishable())
        .collect();
    info!(pending = pending.len(), "publishing pending records");
    progress.phase("Publishing");

    let mut report = PublishReport::default();
    let total = pending.len();

    for (i, record) in pending.into_iter().enumerate() {
        progress.keyword_started(&record.keyword, i + 1, total);
        let draft = ArticleDraft {
            title: record.title.clone(),
            body_html: strip_title_markup(&body_of(&record)),
            summary: record.meta_description.clone(),
        };

        let (status, outcome) = match cms.publish(&draft).await {
            Ok(article) => {
                info!(keyword = %record.keyword, id = %article.id, "published");
                report.published += 1;
                (
                    ContentStatus::Published,
                    PublishOutcome::Published {
                        article_id: article.id,
                    },
                )
            }
            Err(e) => {
                warn!(keyword = %record.keyword, error = %e, "publish failed");
                report.failed += 1;
                (
                    ContentStatus::Failed,
                    PublishOutcome::Failed {
                        reason: e.to_string(),
                    },
                )
            }
        };

        if let Err(e) = archive.update_status(&record.keyword, status) {
            error!(keyword = %record.keyword, error = %e, "failed to record publish status");
        }

        let line = match &outcome {
            PublishOutcome::Published { article_id } => format!("published {article_id}"),
            PublishOutcome::Failed { reason } => format!("failed: {reason}"),
        };
        progress.keyword_finished(&record.keyword, &line);
        report.entries.push((record.keyword, outcome));
    }

    info!(published = report.published, failed = report.failed, "publish complete");
    Ok(report)
}

/// The archived body, or the artifact's body when the archive cell is empty.
fn body_of(record: &ContentRecord) -> String {
    if !record.body.trim().is_empty() || record.file_path.is_empty() {
        return record.body.clone();
    }
    match read_artifact(Path::new(&record.file_path)) {
        Ok(content) => content.body,
        Err(e) => {
            warn!(keyword = %record.keyword, error = %e, "archived body empty and artifact unreadable");
            String::new()
        }
    }
}
