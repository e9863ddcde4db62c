//! Error types for aggregation runs.
//!
//! Only problems detected before any pipeline starts are errors; everything
//! that happens inside a pipeline is reported through its `SourceStatus`.

use jobhound_core::{JobsError, SourceId};
use jobhound_sources::SourceError;
use thiserror::Error;

/// Errors that reject an aggregation run outright.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The search spec failed validation
    #[error("invalid search spec: {0}")]
    InvalidSpec(#[from] JobsError),

    /// The spec names a source with no registered adapter
    #[error("unknown source: {0}")]
    UnknownSource(SourceId),

    /// The proxy list could not be turned into clients
    #[error("invalid proxy configuration: {0}")]
    InvalidProxy(#[source] SourceError),
}

/// Result type alias for aggregation operations.
pub type Result<T> = std::result::Result<T, AggregateError>;
