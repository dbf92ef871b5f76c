//! Dedup store trait definition.

use super::CacheStats;
use crate::core::hasher::Fingerprint;

/// Trait for dedup stores
pub trait DedupStore: Send + Sync {
    /// Record that `key` was just seen
    ///
    /// Returns `true` if the key was already seen within the retention
    /// window, `false` for a first (or re-admitted) sighting. The check and
    /// the update happen as one step: concurrent callers presenting the same
    /// fresh key never both get `false`.
    fn observe(&self, key: &Fingerprint) -> bool;

    /// Number of fingerprints currently held
    fn len(&self) -> usize;

    /// Whether the store holds no fingerprints
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get store statistics
    fn stats(&self) -> CacheStats;

    /// Stop any background work owned by the store
    ///
    /// Must be idempotent. Stores without background work keep the default.
    fn shutdown(&self) {}
}
