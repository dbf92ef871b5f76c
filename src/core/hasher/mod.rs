//! # Hasher Module
//!
//! Computes content fingerprints for records.
//!
//! ## How It Works
//! Every record is hashed with SHA-256 and the 32-byte digest becomes its
//! cache key. A cryptographic hash keeps accidental and adversarial
//! collisions out of reach, so two different records are never merged.
//!
//! Each call builds a fresh hashing context, which makes fingerprinting
//! safe to run from any number of threads at once.
//!
//! ## Example
//! ```rust
//! use line_dedup::core::hasher::fingerprint;
//!
//! let a = fingerprint(b"hello");
//! let b = fingerprint(b"hello");
//! assert_eq!(a, b);
//! assert_eq!(a.to_hex().len(), 64);
//! ```

mod sha256;
mod traits;

pub use sha256::Sha256Fingerprinter;
pub use traits::{Fingerprint, Fingerprinter, FINGERPRINT_LEN};

/// Fingerprint a record with the default (SHA-256) fingerprinter
pub fn fingerprint(record: &[u8]) -> Fingerprint {
    Sha256Fingerprinter.fingerprint(record)
}
