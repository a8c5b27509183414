use crate::error::{FeedError, Result};

pub const DEFAULT_FEED_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_month.csv";

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// What to do when a data line fails to parse.
///
/// `Fail` aborts the reload (batches flushed before the failure stay
/// visible). `Skip` logs the line and keeps streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    #[default]
    Fail,
    Skip,
}

impl MalformedPolicy {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(MalformedPolicy::Fail),
            "skip" => Ok(MalformedPolicy::Skip),
            other => Err(FeedError::Config(format!(
                "unknown malformed-line policy '{other}' (expected 'fail' or 'skip')"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub feed_url: String,
    pub batch_size: usize,
    pub on_malformed: MalformedPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            on_malformed: MalformedPolicy::default(),
        }
    }
}

impl FeedConfig {
    /// Read overrides from `QUAKEFEED_FEED_URL`, `QUAKEFEED_BATCH_SIZE` and
    /// `QUAKEFEED_ON_MALFORMED`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("QUAKEFEED_FEED_URL") {
            config.feed_url = url;
        }

        if let Ok(raw) = std::env::var("QUAKEFEED_BATCH_SIZE") {
            config.batch_size = raw.trim().parse::<usize>().map_err(|_| {
                FeedError::Config(format!("QUAKEFEED_BATCH_SIZE is not a number: '{raw}'"))
            })?;
        }

        if let Ok(raw) = std::env::var("QUAKEFEED_ON_MALFORMED") {
            config.on_malformed = MalformedPolicy::parse(&raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(FeedError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
