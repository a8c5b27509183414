pub mod config;
pub mod error;
pub mod feed;
pub mod lines;
pub mod pipeline;
pub mod store;

pub use config::{FeedConfig, MalformedPolicy, DEFAULT_BATCH_SIZE, DEFAULT_FEED_URL};
pub use error::{FeedError, Result};
pub use feed::FeedClient;
pub use lines::{lines_of, LineDecoder};
pub use pipeline::{Ingestor, ReloadPhase, ReloadReport};
pub use store::{EarthquakeStore, StoreEvent};

pub use quakefeed_parser::{parse_line, Coordinates, Earthquake, RecordError};
