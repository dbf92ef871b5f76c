//! SHA-256 fingerprinting.

use super::traits::{Fingerprint, Fingerprinter};
use sha2::{Digest, Sha256};

/// Production fingerprinter backed by SHA-256
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Fingerprinter;

impl Fingerprinter for Sha256Fingerprinter {
    fn fingerprint(&self, record: &[u8]) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(record);
        Fingerprint::from_bytes(hasher.finalize().into())
    }

    fn name(&self) -> &'static str {
        "sha256"
    }
}
