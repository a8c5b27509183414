use quakefeed_parser::RecordError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid feed url '{url}': {message}")]
    InvalidFeedUrl { url: String, message: String },

    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Feed contained invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Line {line} could not be parsed: {source}")]
    MalformedRecord {
        line: usize,
        #[source]
        source: RecordError,
    },

    #[error("Reload was cancelled or superseded by a newer reload")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, FeedError>;
