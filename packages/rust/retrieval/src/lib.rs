//! Reference retrieval for SEO Ranker.
//!
//! This crate provides:
//! - [`search`]: web-search service trait and SerpAPI-compatible client
//! - [`extract`]: content-extraction trait and Exa-compatible client
//! - [`filter`]: denylist and informational signal-term rules
//! - [`throttle`]: injectable pacing between external calls
//! - [`Retriever`]: the retrieval stage itself

pub mod extract;
pub mod filter;
pub mod retriever;
pub mod search;
pub mod throttle;

pub use extract::{ExaClient, ExtractedPage, ExtractionService};
pub use filter::ResultFilter;
pub use retriever::Retriever;
pub use search::{QuestionHit, SearchHit, SearchResponse, SearchService, SerpApiClient};
pub use throttle::{FixedDelay, NoWait, WaitPolicy};

/// User-Agent string for outbound requests.
pub const USER_AGENT: &str = concat!("SEORanker/", env!("CARGO_PKG_VERSION"));
