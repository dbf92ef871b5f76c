//! Trait and key type for record fingerprinting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Length in bytes of every fingerprint
pub const FINGERPRINT_LEN: usize = 32;

/// Fixed-length digest of a record, used as the dedup cache key
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Wrap raw digest bytes
    pub const fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw digest bytes
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Get the digest as a lowercase hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first 8 bytes are plenty to tell keys apart in logs
        write!(f, "Fingerprint({}..)", hex::encode(&self.0[..8]))
    }
}

/// Trait for fingerprint implementations
///
/// Implementations must be pure: the same bytes always produce the same
/// fingerprint, and no state is shared between calls.
pub trait Fingerprinter: Send + Sync {
    /// Compute the fingerprint of a record
    fn fingerprint(&self, record: &[u8]) -> Fingerprint;

    /// Short name of the digest algorithm
    fn name(&self) -> &'static str;
}
