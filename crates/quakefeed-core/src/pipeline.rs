use std::sync::Arc;

use futures::{Stream, StreamExt};
use quakefeed_parser::{parse_line, Earthquake, HEADER_PREFIX};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{FeedConfig, MalformedPolicy};
use crate::error::{FeedError, Result};
use crate::feed::FeedClient;
use crate::lines::lines_of;
use crate::store::EarthquakeStore;

/// Where a reload cycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadPhase {
    Idle,
    Reloading,
    Streaming,
    Draining,
}

/// Outcome of a completed reload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadReport {
    pub records: usize,
    pub batches: usize,
    pub skipped: usize,
}

/// Streaming ingestion pipeline: feed resource in, observable store out.
///
/// One reload cycle walks Idle -> Reloading -> Streaming -> Draining -> Idle.
/// Entering Reloading clears the store before any network activity, so an
/// observer never sees stale records mixed with fresh ones. Records are
/// accumulated into batches of `batch_size` and published in source order;
/// stream end flushes the remainder.
///
/// A reload started while another is in flight supersedes it: the store's
/// generation token makes the older cycle's next append a no-op and its loop
/// exits with [`FeedError::Cancelled`].
#[derive(Debug)]
pub struct Ingestor {
    config: FeedConfig,
    client: FeedClient,
    store: Arc<EarthquakeStore>,
    phase: watch::Sender<ReloadPhase>,
}

impl Ingestor {
    pub fn new(config: FeedConfig) -> Result<Self> {
        config.validate()?;
        let client = FeedClient::new(&config.feed_url)?;
        let (phase, _) = watch::channel(ReloadPhase::Idle);
        Ok(Self {
            config,
            client,
            store: Arc::new(EarthquakeStore::new()),
            phase,
        })
    }

    pub fn store(&self) -> &Arc<EarthquakeStore> {
        &self.store
    }

    /// Watch reload phase transitions.
    pub fn phases(&self) -> watch::Receiver<ReloadPhase> {
        self.phase.subscribe()
    }

    /// Stop any in-flight reload. The published records are left as they
    /// are. Takes effect immediately: a cycle parked on a stalled network
    /// read wakes up and exits rather than waiting for the next line.
    pub fn cancel(&self) {
        self.store.bump_generation();
    }

    /// Download the feed and replace the store's contents with its records.
    pub async fn reload(&self) -> Result<ReloadReport> {
        let generation = self.begin();
        self.set_phase(ReloadPhase::Streaming);
        let result = match self.client.fetch().await {
            Ok(bytes) => {
                let lines = lines_of(Box::pin(bytes));
                self.consume(generation, Box::pin(lines)).await
            }
            Err(err) => Err(err),
        };
        self.finish(result)
    }

    /// Run one reload cycle over an already-framed line stream. Same state
    /// machine as [`reload`], minus the network; callers can drive the
    /// pipeline from any source, including synchronously in tests.
    ///
    /// [`reload`]: Ingestor::reload
    pub async fn reload_from_lines<S>(&self, lines: S) -> Result<ReloadReport>
    where
        S: Stream<Item = Result<String>> + Unpin,
    {
        let generation = self.begin();
        let result = self.consume(generation, lines).await;
        self.finish(result)
    }

    /// Enter Reloading: clear the store (synchronously, before any I/O) and
    /// claim a fresh generation, superseding any in-flight cycle.
    fn begin(&self) -> u64 {
        self.set_phase(ReloadPhase::Reloading);
        self.store.begin_reload()
    }

    fn finish(&self, result: Result<ReloadReport>) -> Result<ReloadReport> {
        self.set_phase(ReloadPhase::Idle);
        match &result {
            Ok(report) => info!(
                records = report.records,
                batches = report.batches,
                skipped = report.skipped,
                "reload complete"
            ),
            Err(err) => warn!(error = %err, "reload aborted"),
        }
        result
    }

    async fn consume<S>(&self, generation: u64, mut lines: S) -> Result<ReloadReport>
    where
        S: Stream<Item = Result<String>> + Unpin,
    {
        self.set_phase(ReloadPhase::Streaming);

        let mut generation_changes = self.store.generation_changes();
        let mut buffer: Vec<Earthquake> = Vec::with_capacity(self.config.batch_size);
        let mut report = ReloadReport::default();
        let mut line_no = 0usize;

        loop {
            // Wake up on supersession even if the source has gone quiet.
            let next = tokio::select! {
                next = lines.next() => next,
                _ = generation_changes.wait_for(|current| *current != generation) => {
                    return Err(FeedError::Cancelled);
                }
            };
            let Some(line) = next else {
                break;
            };
            let line = line?;
            line_no += 1;

            if line_no == 1 && line.starts_with(HEADER_PREFIX) {
                debug!("dropping feed header line");
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
            if !self.store.is_current(generation) {
                return Err(FeedError::Cancelled);
            }

            match parse_line(&line) {
                Ok(record) => buffer.push(record),
                Err(err) => match self.config.on_malformed {
                    MalformedPolicy::Fail => {
                        return Err(FeedError::MalformedRecord {
                            line: line_no,
                            source: err,
                        });
                    }
                    MalformedPolicy::Skip => {
                        warn!(line = line_no, error = %err, "skipping malformed line");
                        report.skipped += 1;
                    }
                },
            }

            if buffer.len() >= self.config.batch_size {
                self.flush(generation, &mut buffer, &mut report)?;
            }
        }

        self.set_phase(ReloadPhase::Draining);
        if !buffer.is_empty() {
            self.flush(generation, &mut buffer, &mut report)?;
        }

        Ok(report)
    }

    /// Detach the accumulation buffer and publish it as one batch.
    fn flush(
        &self,
        generation: u64,
        buffer: &mut Vec<Earthquake>,
        report: &mut ReloadReport,
    ) -> Result<()> {
        let batch = std::mem::take(buffer);
        let count = batch.len();
        if !self.store.append_batch(generation, batch) {
            return Err(FeedError::Cancelled);
        }
        buffer.reserve(self.config.batch_size);
        report.records += count;
        report.batches += 1;
        debug!(count, total = report.records, "published batch");
        Ok(())
    }

    fn set_phase(&self, phase: ReloadPhase) {
        debug!(?phase, "reload phase");
        self.phase.send_replace(phase);
    }
}
