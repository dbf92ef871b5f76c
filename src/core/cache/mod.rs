//! # Cache Module
//!
//! Remembers which fingerprints were seen recently.
//!
//! ## Modes
//! - **Permanent** (retention period of zero) - a fingerprint, once seen, is
//!   a duplicate forever. The table only grows.
//! - **Timed** (positive retention period) - a fingerprint is a duplicate
//!   while its most recent sighting is younger than the period. Every
//!   sighting refreshes it, so a steadily repeated record never expires. A
//!   background thread reclaims entries that have gone stale.
//!
//! ## Backends
//! - `ExpiringCache` - the in-memory production store

mod clock;
mod expiring;
mod reclaimer;
mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use expiring::{ExpiringCache, ExpiringCacheBuilder};
pub use traits::DedupStore;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How long a fingerprint stays fresh after its latest sighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Retention {
    /// Never forget a fingerprint
    Permanent,
    /// Forget a fingerprint once it has gone unseen for this long
    Timed(Duration),
}

impl Retention {
    /// Select the mode from a period, where zero means permanent
    pub fn from_period(period: Duration) -> Self {
        if period.is_zero() {
            Retention::Permanent
        } else {
            Retention::Timed(period)
        }
    }

    /// The retention period, or `None` in permanent mode
    pub fn period(&self) -> Option<Duration> {
        match self {
            Retention::Permanent => None,
            Retention::Timed(period) => Some(*period),
        }
    }

    /// Whether a fingerprint last seen `age` ago is still a duplicate
    pub fn is_fresh(&self, age: Duration) -> bool {
        match self {
            Retention::Permanent => true,
            Retention::Timed(period) => age < *period,
        }
    }
}

impl fmt::Display for Retention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Retention::Permanent => write!(f, "permanent"),
            Retention::Timed(period) => write!(f, "{:?}", period),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of fingerprints currently held
    pub entries: usize,
    /// Total `observe` calls
    pub observed: u64,
    /// `observe` calls that reported a duplicate
    pub duplicates: u64,
    /// Entries removed by reclamation so far
    pub reclaimed: u64,
}
