use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("expected at least 5 comma-separated fields, found {found}")]
    TooFewFields { found: usize },

    #[error("invalid timestamp '{value}': {message}")]
    InvalidTimestamp { value: String, message: String },

    #[error("failed to parse field '{field}' as a number: '{value}'")]
    InvalidNumber { field: &'static str, value: String },
}
