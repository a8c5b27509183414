use std::sync::RwLock;

use quakefeed_parser::Earthquake;
use tokio::sync::{broadcast, watch};

/// Change notification emitted by the store, at least once per flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// A reload began and discarded every published record.
    Cleared,
    /// A batch of `count` records was appended; `total` is the new length.
    BatchAppended { count: usize, total: usize },
}

const EVENT_CAPACITY: usize = 64;

#[derive(Debug)]
struct StoreInner {
    records: Vec<Earthquake>,
    generation: u64,
}

/// The published collection of records.
///
/// This is the only shared mutable resource in the crate. The write lock is
/// the publication context: every mutation serializes through it, and only
/// the ingestion pipeline writes. Observers read via [`snapshot`] and follow
/// change notifications via [`subscribe`].
///
/// The generation counter is the cancellation barrier for concurrent
/// reloads: [`begin_reload`] bumps it and clears the records in a single
/// write-lock acquisition, so a batch from a superseded reload can never
/// land after the newer reload's clear.
///
/// [`snapshot`]: EarthquakeStore::snapshot
/// [`subscribe`]: EarthquakeStore::subscribe
/// [`begin_reload`]: EarthquakeStore::begin_reload
#[derive(Debug)]
pub struct EarthquakeStore {
    inner: RwLock<StoreInner>,
    events: broadcast::Sender<StoreEvent>,
    generation_tx: watch::Sender<u64>,
}

impl Default for EarthquakeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EarthquakeStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (generation_tx, _) = watch::channel(0);
        Self {
            inner: RwLock::new(StoreInner {
                records: Vec::new(),
                generation: 0,
            }),
            events,
            generation_tx,
        }
    }

    /// Start a new reload cycle: discard all published records and return
    /// the generation token the cycle must present on every append.
    pub fn begin_reload(&self) -> u64 {
        let generation = {
            let mut inner = self.inner.write().expect("store lock poisoned");
            inner.generation += 1;
            inner.records.clear();
            inner.generation
        };
        self.generation_tx.send_replace(generation);
        let _ = self.events.send(StoreEvent::Cleared);
        generation
    }

    /// Invalidate any in-flight reload without touching the records.
    pub fn bump_generation(&self) {
        let generation = {
            let mut inner = self.inner.write().expect("store lock poisoned");
            inner.generation += 1;
            inner.generation
        };
        self.generation_tx.send_replace(generation);
    }

    /// Append a batch in arrival order. Returns `false` (dropping the batch)
    /// when `generation` is stale, i.e. the reload was superseded.
    pub fn append_batch(&self, generation: u64, batch: Vec<Earthquake>) -> bool {
        let count = batch.len();
        let total = {
            let mut inner = self.inner.write().expect("store lock poisoned");
            if inner.generation != generation {
                return false;
            }
            inner.records.extend(batch);
            inner.records.len()
        };
        let _ = self.events.send(StoreEvent::BatchAppended { count, total });
        true
    }

    /// Watch generation changes. Lets a consumer loop wake up the moment its
    /// generation goes stale instead of waiting for the next line.
    pub fn generation_changes(&self) -> watch::Receiver<u64> {
        self.generation_tx.subscribe()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.inner.read().expect("store lock poisoned").generation == generation
    }

    pub fn snapshot(&self) -> Vec<Earthquake> {
        self.inner
            .read()
            .expect("store lock poisoned")
            .records
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("store lock poisoned").records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use quakefeed_parser::{Coordinates, Earthquake};

    use super::*;

    fn quake(latitude: f64) -> Earthquake {
        Earthquake::new(
            Utc::now(),
            Coordinates {
                latitude,
                longitude: 0.0,
            },
            None,
            None,
        )
    }

    #[test]
    fn begin_reload_clears_and_notifies() {
        let store = EarthquakeStore::new();
        let generation = store.begin_reload();
        assert!(store.append_batch(generation, vec![quake(1.0), quake(2.0)]));
        assert_eq!(store.len(), 2);

        let mut events = store.subscribe();
        store.begin_reload();
        assert!(store.is_empty());
        assert_eq!(events.try_recv().unwrap(), StoreEvent::Cleared);
    }

    #[test]
    fn stale_generation_append_is_dropped() {
        let store = EarthquakeStore::new();
        let old = store.begin_reload();
        let new = store.begin_reload();

        assert!(!store.append_batch(old, vec![quake(1.0)]));
        assert!(store.is_empty());
        assert!(store.append_batch(new, vec![quake(2.0)]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn bump_generation_invalidates_without_clearing() {
        let store = EarthquakeStore::new();
        let generation = store.begin_reload();
        assert!(store.append_batch(generation, vec![quake(1.0)]));

        store.bump_generation();
        assert!(!store.is_current(generation));
        assert!(!store.append_batch(generation, vec![quake(2.0)]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn batch_events_carry_counts_in_order() {
        let store = EarthquakeStore::new();
        let generation = store.begin_reload();
        let mut events = store.subscribe();

        store.append_batch(generation, vec![quake(1.0), quake(2.0)]);
        store.append_batch(generation, vec![quake(3.0)]);

        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::BatchAppended { count: 2, total: 2 }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::BatchAppended { count: 1, total: 3 }
        );
    }
}
