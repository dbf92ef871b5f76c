//! # Error Module
//!
//! Error types for the line deduplication filter.
//!
//! ## Design Principles
//! - **Configuration errors block startup** - nothing is read before the config is valid
//! - **Include context** - the offending value is always part of the message
//! - **The cache never fails** - `observe` is total, so there is no cache error type

use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum LineDedupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Errors detected while validating operator configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("The period cannot be negative: {value}")]
    NegativePeriod { value: String },

    #[error("Invalid duration '{value}'. Use values like '10s', '5m' or '1h30m'")]
    InvalidDuration { value: String },

    #[error("The sweep interval must be a positive duration: {value}")]
    InvalidSweepInterval { value: String },
}

/// Errors that end the stream pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to write record to output: {source}")]
    Write {
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, LineDedupError>;
