//! # Pipeline Module
//!
//! Drives records from an input stream through the dedup store.
//!
//! ## Stages (per record)
//! 1. **Read** - Split the input on `\n`, dropping a trailing `\r`
//! 2. **Skip** - Empty records never reach the fingerprinter
//! 3. **Fingerprint** - SHA-256 of the record bytes
//! 4. **Observe** - Ask the store whether the fingerprint is fresh
//! 5. **Emit** - Write first occurrences verbatim, one per line
//!
//! Records are processed strictly in input order on the calling thread.

mod executor;

pub use executor::{Pipeline, PipelineBuilder, PipelineConfig, PipelineResult};
