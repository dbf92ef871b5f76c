//! # Line Dedup
//!
//! A streaming deduplication filter for newline-delimited records.
//!
//! ## Core Philosophy
//! - **First occurrence wins** - Each distinct record is emitted once, in input order
//! - **Never store content** - Only a SHA-256 fingerprint of each record is kept
//! - **Optional expiry** - With a retention period, a record may reappear once it goes stale
//!
//! ## Architecture
//! The library is split into a core engine and presentation layers:
//! - `core` - Fingerprinting, the expiring dedup cache and the stream pipeline
//! - `events` - Event-driven progress reporting
//! - `error` - Operator-friendly error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{LineDedupError, Result};

/// Initialize tracing for the library
///
/// Logs always go to stderr so that stdout carries nothing but records.
/// `RUST_LOG` takes precedence over the `verbose` default.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // A host that already installed a subscriber keeps it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
