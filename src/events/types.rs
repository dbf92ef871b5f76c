//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};

/// All events emitted during a deduplication run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Stream pipeline events
    Pipeline(PipelineEvent),
    /// Dedup cache and reclamation events
    Cache(CacheEvent),
}

/// Events from the stream pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// The pipeline started reading input
    Started,
    /// Periodic progress update
    Progress(PipelineProgress),
    /// Reading input failed; the pipeline stops after this
    ReadError { message: String },
    /// Input was drained (or a read error ended the loop)
    Completed { summary: PipelineSummary },
}

/// Running counters, sent every few thousand records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineProgress {
    /// Lines read so far, empty ones included
    pub records_read: u64,
    /// Records forwarded to the output
    pub records_written: u64,
    /// Records dropped as duplicates
    pub duplicates_dropped: u64,
}

/// Final pipeline counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub records_read: u64,
    pub records_written: u64,
    pub duplicates_dropped: u64,
    pub empty_skipped: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Events from the dedup cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CacheEvent {
    /// The background reclamation thread started
    ReclaimerStarted { interval_ms: u64 },
    /// One reclamation pass finished
    Reclaimed { removed: usize, remaining: usize },
    /// The background reclamation thread exited
    ReclaimerStopped,
}
