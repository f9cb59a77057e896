use thiserror::Error;

/// Errors surfaced by the history capture pipeline.
///
/// Variants identify which stage failed (diff, metadata, persist) so
/// operators can diagnose audit gaps from the message alone. Absence of
/// attribution is never an error; records simply omit the field.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Diff error: {0}")]
    Diff(String),

    #[error("Metadata extraction failed for key '{key}': {message}")]
    Metadata { key: String, message: String },

    #[error("Persist error: {0}")]
    Persist(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unsupported document shape: {0}")]
    Unsupported(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, HistoryError>;

impl<T> From<std::sync::PoisonError<T>> for HistoryError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}
