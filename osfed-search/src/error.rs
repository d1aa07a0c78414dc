//! Error types for the osfed-search crate.
//!
//! Source-level failures are normally caught inside a fetch round and turned
//! into [`SourceFailure`](crate::types::SourceFailure) annotations; only
//! configuration errors and programming errors reach the caller as
//! [`SearchError`].

/// Errors that can occur while querying sources or building a merged page.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// A source query did not finish before its deadline.
    #[error("search timed out: {0}")]
    Timeout(String),

    /// An HTTP request to a remote source failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A source answered with a document that could not be understood.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid federation configuration or source set.
    #[error("config error: {0}")]
    Config(String),

    /// The source answered, but reported an error of its own.
    #[error("upstream error: {message}")]
    Upstream {
        /// Message reported by (or derived from) the source.
        message: String,
        /// Where a user can read more about the failure, when known.
        help_link: Option<String>,
    },

    /// Local I/O failure (file-backed sources).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    /// Help link attached to this error, if the source provided one.
    pub fn help_link(&self) -> Option<&str> {
        match self {
            Self::Upstream { help_link, .. } => help_link.as_deref(),
            _ => None,
        }
    }
}

/// Convenience type alias for osfed-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
