//! Content pipeline orchestration for SEO Ranker.
//!
//! This crate ties retrieval, generation, artifact persistence and the
//! archive together into end-to-end workflows:
//! - [`pipeline`]: per-keyword generation runs and batches
//! - [`knowledge`]: researching keywords ahead of generation
//! - [`reconcile`]: registering artifacts created out-of-band
//! - [`publish`]: pushing pending drafts to the CMS

pub mod generation;
pub mod knowledge;
pub mod parsing;
pub mod pipeline;
pub mod publish;
pub mod reconcile;

pub use generation::Generator;
pub use knowledge::{KnowledgeBuilder, KnowledgeReport, KnowledgeStatus, available_keywords};
pub use parsing::{ParsedContent, ValidationReport, parse, validate};
pub use pipeline::{
    BatchSummary, ContentPipeline, KeywordOutcome, ProgressReporter, SilentProgress,
};
pub use publish::{PublishOutcome, PublishReport, publish_pending};
pub use reconcile::{ReconcileReport, reconcile};
