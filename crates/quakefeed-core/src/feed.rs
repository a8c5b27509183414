use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use reqwest::Url;

use crate::error::{FeedError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("quakefeed/", env!("CARGO_PKG_VERSION"));

/// Thin wrapper around the HTTP client for the feed resource.
#[derive(Debug)]
pub struct FeedClient {
    http: reqwest::Client,
    url: Url,
}

impl FeedClient {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|err| FeedError::InvalidFeedUrl {
            url: url.to_string(),
            message: err.to_string(),
        })?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self { http, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// GET the feed and return its body as a lazy chunk stream.
    pub async fn fetch(&self) -> Result<impl Stream<Item = reqwest::Result<Bytes>>> {
        let response = self
            .http
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes_stream())
    }
}
