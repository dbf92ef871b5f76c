//! # Core Module
//!
//! The deduplication engine.
//!
//! ## Modules
//! - `hasher` - Computes record fingerprints
//! - `cache` - Remembers recently seen fingerprints
//! - `config` - Validates operator settings
//! - `pipeline` - Streams records through the cache

pub mod cache;
pub mod config;
pub mod hasher;
pub mod pipeline;

// Re-export commonly used types
pub use cache::{CacheStats, DedupStore, ExpiringCache, Retention};
pub use config::DedupConfig;
pub use hasher::{fingerprint, Fingerprint};
pub use pipeline::{Pipeline, PipelineResult};
