//! Background reclamation of stale fingerprints.

use super::expiring::EntryTable;
use crate::events::{null_sender, CacheEvent, Event, EventSender};
use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Handle to the reclamation thread owned by an `ExpiringCache`.
pub(super) struct Reclaimer {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Reclaimer {
    /// Start reclaiming `table` every `interval`.
    ///
    /// Returns `None` if the thread cannot be spawned. The cache stays
    /// correct without it; only memory reclamation is lost.
    pub(super) fn spawn(
        table: Arc<EntryTable>,
        interval: Duration,
        events: Option<EventSender>,
    ) -> Option<Self> {
        let (stop, stopped) = bounded(1);
        let events = events.unwrap_or_else(null_sender);

        let spawned = thread::Builder::new()
            .name("dedup-reclaimer".to_string())
            .spawn(move || run(&table, interval, &stopped, &events));

        match spawned {
            Ok(handle) => Some(Self { stop, handle }),
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to start reclamation thread; stale entries stay until shutdown"
                );
                None
            }
        }
    }

    /// Signal the thread and wait for it to exit.
    pub(super) fn stop(self) {
        let Self { stop, handle } = self;
        // Dropping the only sender disconnects the stop channel.
        drop(stop);
        if handle.join().is_err() {
            warn!("Reclamation thread panicked");
        }
    }
}

fn run(table: &EntryTable, interval: Duration, stopped: &Receiver<()>, events: &EventSender) {
    let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
    debug!(interval_ms, "Reclamation thread started");
    events.send(Event::Cache(CacheEvent::ReclaimerStarted { interval_ms }));

    let ticker = tick(interval);
    loop {
        select! {
            recv(stopped) -> _ => break,
            recv(ticker) -> _ => {
                let removed = table.reclaim_expired();
                let remaining = table.len();
                debug!(removed, remaining, "Reclaimed stale fingerprints");
                events.send(Event::Cache(CacheEvent::Reclaimed { removed, remaining }));
            }
        }
    }

    debug!("Reclamation thread stopped");
    events.send(Event::Cache(CacheEvent::ReclaimerStopped));
}
