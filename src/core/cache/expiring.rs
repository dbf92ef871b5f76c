//! In-memory expiring dedup cache.

use super::clock::{Clock, SystemClock};
use super::reclaimer::Reclaimer;
use super::{CacheStats, DedupStore, Retention};
use crate::core::hasher::Fingerprint;
use crate::events::EventSender;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::debug;

/// Reclamation leaves tables this small alone when deciding to shrink.
const MIN_SHRINK_CAPACITY: usize = 1024;

/// Fingerprint table shared between the cache and its reclamation thread.
pub(super) struct EntryTable {
    entries: RwLock<HashMap<Fingerprint, Instant>>,
    retention: Retention,
    clock: Arc<dyn Clock>,
    observed: AtomicU64,
    duplicates: AtomicU64,
    reclaimed: AtomicU64,
}

impl EntryTable {
    fn new(retention: Retention, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            retention,
            clock,
            observed: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            reclaimed: AtomicU64::new(0),
        }
    }

    // A panic mid-insert cannot leave the map inconsistent, so a poisoned
    // lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Fingerprint, Instant>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Fingerprint, Instant>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn observe(&self, key: &Fingerprint) -> bool {
        let duplicate = {
            let mut entries = self.write();
            // Read the clock under the lock so refreshes never move a
            // timestamp backwards.
            let now = self.clock.now();
            match entries.insert(*key, now) {
                Some(last_seen) => self
                    .retention
                    .is_fresh(now.saturating_duration_since(last_seen)),
                None => false,
            }
        };

        self.observed.fetch_add(1, Ordering::Relaxed);
        if duplicate {
            self.duplicates.fetch_add(1, Ordering::Relaxed);
        }
        duplicate
    }

    /// Remove every entry older than the retention period.
    ///
    /// Holds the write lock for exactly one pass over the table.
    pub(super) fn reclaim_expired(&self) -> usize {
        let Some(period) = self.retention.period() else {
            return 0;
        };

        let removed = {
            let mut entries = self.write();
            let now = self.clock.now();
            let before = entries.len();
            entries.retain(|_, last_seen| now.saturating_duration_since(*last_seen) <= period);
            let removed = before - entries.len();

            // `retain` keeps the allocation; give memory back after a big drop.
            if removed > 0 && entries.capacity() > MIN_SHRINK_CAPACITY.max(entries.len() * 4) {
                let target = entries.len() * 2;
                entries.shrink_to(target);
            }
            removed
        };

        self.reclaimed.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub(super) fn len(&self) -> usize {
        self.read().len()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            observed: self.observed.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
        }
    }
}

/// Expiring dedup cache
///
/// Owns its fingerprint table and, in timed mode, the background thread
/// that reclaims stale entries. The thread is stopped by [`shutdown`] or
/// when the cache is dropped.
///
/// [`shutdown`]: DedupStore::shutdown
pub struct ExpiringCache {
    table: Arc<EntryTable>,
    reclaimer: Mutex<Option<Reclaimer>>,
}

impl ExpiringCache {
    /// Create a cache with the system clock and default reclamation
    pub fn new(retention: Retention) -> Self {
        Self::builder(retention).build()
    }

    /// Create a cache that never forgets
    pub fn permanent() -> Self {
        Self::new(Retention::Permanent)
    }

    /// Create a cache whose entries go stale after `period`
    ///
    /// A zero period selects permanent mode.
    pub fn timed(period: Duration) -> Self {
        Self::new(Retention::from_period(period))
    }

    /// Start configuring a cache
    pub fn builder(retention: Retention) -> ExpiringCacheBuilder {
        ExpiringCacheBuilder::new(retention)
    }

    /// The retention mode this cache was built with
    pub fn retention(&self) -> Retention {
        self.table.retention
    }

    /// Run one reclamation pass now, returning how many entries it removed
    ///
    /// Always 0 in permanent mode.
    pub fn reclaim_expired(&self) -> usize {
        self.table.reclaim_expired()
    }

    /// Whether a background reclamation thread is running
    pub fn is_reclaiming(&self) -> bool {
        self.reclaimer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl DedupStore for ExpiringCache {
    fn observe(&self, key: &Fingerprint) -> bool {
        self.table.observe(key)
    }

    fn len(&self) -> usize {
        self.table.len()
    }

    fn stats(&self) -> CacheStats {
        self.table.stats()
    }

    fn shutdown(&self) {
        let reclaimer = self
            .reclaimer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(reclaimer) = reclaimer {
            reclaimer.stop();
            debug!(entries = self.table.len(), "Dedup cache shut down");
        }
    }
}

impl Drop for ExpiringCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Builder for [`ExpiringCache`]
pub struct ExpiringCacheBuilder {
    retention: Retention,
    sweep_interval: Option<Duration>,
    clock: Arc<dyn Clock>,
    events: Option<EventSender>,
    background: bool,
}

impl ExpiringCacheBuilder {
    /// Create a builder for the given retention mode
    pub fn new(retention: Retention) -> Self {
        Self {
            retention,
            sweep_interval: None,
            clock: Arc::new(SystemClock),
            events: None,
            background: true,
        }
    }

    /// How often the background thread reclaims stale entries
    ///
    /// Defaults to the retention period. A zero interval falls back to the
    /// default. Ignored in permanent mode.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Set the time source
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Report reclamation activity on this channel
    pub fn events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Do not start a background thread; reclaim only via
    /// [`ExpiringCache::reclaim_expired`]
    pub fn without_reclaimer(mut self) -> Self {
        self.background = false;
        self
    }

    /// Build the cache, starting the reclamation thread in timed mode
    pub fn build(self) -> ExpiringCache {
        let table = Arc::new(EntryTable::new(self.retention, self.clock));

        let reclaimer = match self.retention.period() {
            Some(period) if self.background => {
                let interval = self
                    .sweep_interval
                    .filter(|interval| !interval.is_zero())
                    .unwrap_or(period);
                Reclaimer::spawn(Arc::clone(&table), interval, self.events)
            }
            _ => None,
        };

        ExpiringCache {
            table,
            reclaimer: Mutex::new(reclaimer),
        }
    }
}
