//! Error types for the osfed application layer.

/// Top-level error type for configuration, source setup and queries.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Invalid or unreadable configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A source name that is not configured.
    #[error("unknown source: {0}")]
    UnknownSource(String),

    /// Logging could not be initialised.
    #[error("logging error: {0}")]
    Logging(String),

    /// Error raised by the federation engine.
    #[error(transparent)]
    Search(#[from] osfed_search::SearchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use osfed_search::SearchError;

    #[test]
    fn search_errors_pass_through() {
        let err: AppError = SearchError::Config("max_rounds must be greater than 0".into()).into();
        assert_eq!(err.to_string(), "config error: max_rounds must be greater than 0");
    }

    #[test]
    fn display_unknown_source() {
        let err = AppError::UnknownSource("archive".into());
        assert_eq!(err.to_string(), "unknown source: archive");
    }

    #[test]
    fn io_converts() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().contains("gone"));
    }
}
