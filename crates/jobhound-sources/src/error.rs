//! Error types for source adapters.
//!
//! Every adapter failure is classified into one of these variants so the
//! aggregator can decide between retrying, backing off and aborting.

use jobhound_core::SourceId;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while querying a job board.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Timeout, connection reset or 5xx response; retryable
    #[error("transient network failure for {source_id}: {message}")]
    TransientNetwork {
        /// Source that failed
        source_id: SourceId,
        /// Failure description
        message: String,
        /// HTTP status when the board answered
        status: Option<u16>,
    },

    /// The board signalled throttling (429 or a block page)
    #[error("rate limited by {source_id}")]
    RateLimited {
        /// Source that throttled the request
        source_id: SourceId,
        /// Delay requested by the board, when given
        retry_after: Option<Duration>,
    },

    /// The spec asks for something this source cannot do
    #[error("{source_id} cannot serve this search: {reason}")]
    CapabilityUnsupported {
        /// Source that refused
        source_id: SourceId,
        /// Which capability is missing
        reason: String,
    },

    /// A single record could not be parsed; adapters drop and count these
    #[error("malformed response from {source_id}: {reason}")]
    MalformedRecord {
        /// Source that produced the page
        source_id: SourceId,
        /// Parse failure description
        reason: String,
    },

    /// Unrecoverable failure such as an auth wall or a 4xx response
    #[error("fatal error from {source_id}: {reason}")]
    Fatal {
        /// Source that failed
        source_id: SourceId,
        /// Failure description
        reason: String,
    },

    /// No adapter is registered for the identifier
    #[error("source not found: {0}")]
    NotFound(SourceId),

    /// A proxy string could not be turned into a client
    #[error("invalid proxy '{proxy}': {reason}")]
    InvalidProxy {
        /// The offending proxy string
        proxy: String,
        /// Why it was rejected
        reason: String,
    },
}

impl SourceError {
    /// True for failures worth retrying after a backoff.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientNetwork { .. })
    }

    /// True when the board asked us to slow down.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Build a [`SourceError::MalformedRecord`].
    pub fn malformed(source_id: &SourceId, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            source_id: source_id.clone(),
            reason: reason.into(),
        }
    }

    /// Build a [`SourceError::Fatal`].
    pub fn fatal(source_id: &SourceId, reason: impl Into<String>) -> Self {
        Self::Fatal {
            source_id: source_id.clone(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;
