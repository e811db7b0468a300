//! Error types for SEO Ranker.
//!
//! Library crates use [`SeoRankerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::ContentStatus;

/// Top-level error type for all SEO Ranker operations.
#[derive(Debug, thiserror::Error)]
pub enum SeoRankerError {
    /// Configuration loading or validation error (missing credentials included).
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the search, extraction, or CMS service.
    #[error("network error: {0}")]
    Network(String),

    /// Malformed external response or artifact.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Flat-file store read/write error.
    #[error("storage error: {0}")]
    Storage(String),

    /// A record with the same normalized keyword already exists.
    #[error("duplicate keyword: {keyword}")]
    DuplicateKey { keyword: String },

    /// A status change that the record lifecycle does not allow.
    #[error("invalid status transition for '{keyword}': {from} -> {to}")]
    InvalidTransition {
        keyword: String,
        from: ContentStatus,
        to: ContentStatus,
    },

    /// Text-generation provider error (init, API, or empty response).
    #[error("generation error: {0}")]
    Generation(String),

    /// Generated content failed parsing or validation.
    #[error("content rejected: {message}")]
    ContentRejected { message: String },

    /// CMS publish error.
    #[error("publish error: {0}")]
    Publish(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad input, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SeoRankerError>;

impl SeoRankerError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a storage error from any displayable message.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a content-rejected error from any displayable message.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::ContentRejected {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is a transient external failure worth retrying on a later run.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Generation(_) | Self::Publish(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = SeoRankerError::config("missing SERPAPI_API_KEY");
        assert_eq!(err.to_string(), "config error: missing SERPAPI_API_KEY");

        let err = SeoRankerError::DuplicateKey {
            keyword: "espresso guide".into(),
        };
        assert!(err.to_string().contains("espresso guide"));
    }

    #[test]
    fn transition_error_names_both_states() {
        let err = SeoRankerError::InvalidTransition {
            keyword: "cold brew".into(),
            from: ContentStatus::Published,
            to: ContentStatus::Failed,
        };
        assert_eq!(
            err.to_string(),
            "invalid status transition for 'cold brew': published -> failed"
        );
    }

    #[test]
    fn transient_classification() {
        assert!(SeoRankerError::Network("timeout".into()).is_transient());
        assert!(!SeoRankerError::rejected("too short").is_transient());
    }
}
