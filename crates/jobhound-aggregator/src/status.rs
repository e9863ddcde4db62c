//! Per-source outcome reporting.

use jobhound_core::SourceId;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Why a pipeline was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortCause {
    /// Rate-limit retries exhausted
    RateLimited,
    /// The spec asked for something the source cannot do
    CapabilityUnsupported,
    /// Transient-failure retries exhausted
    TransientNetwork,
    /// The run's overall deadline elapsed
    Timeout,
    /// Unrecoverable adapter error
    Fatal,
}

/// Final state of a source pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "cause")]
pub enum TerminalCondition {
    /// The result budget was reached
    BudgetMet,
    /// The source has no more results
    Exhausted,
    /// The pipeline stopped early
    Aborted(AbortCause),
}

impl TerminalCondition {
    /// True unless the pipeline was aborted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Aborted(_))
    }
}

impl fmt::Display for TerminalCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BudgetMet => write!(f, "budget met"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::Aborted(cause) => write!(f, "aborted ({cause:?})"),
        }
    }
}

/// Outcome of one source in one aggregation run.
///
/// Created when the pipeline starts, mutated only by that pipeline and
/// finalized when it reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStatus {
    /// Source this status describes
    pub source: SourceId,
    /// Records the pipeline accumulated
    pub records_returned: usize,
    /// Pages successfully fetched and parsed
    pub pages_fetched: usize,
    /// Records dropped by validation
    pub records_dropped: usize,
    /// Retries granted by the rate governor
    pub retries: u32,
    /// Terminal condition; `None` while running
    pub condition: Option<TerminalCondition>,
    /// Error detail for aborted pipelines
    pub error: Option<String>,
    /// Wall time spent in the pipeline
    pub elapsed: Duration,
}

impl SourceStatus {
    /// Fresh status for a starting pipeline.
    #[must_use]
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            records_returned: 0,
            pages_fetched: 0,
            records_dropped: 0,
            retries: 0,
            condition: None,
            error: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Status of a pipeline that could not run at all.
    #[must_use]
    pub fn failed(source: SourceId, cause: AbortCause, error: impl Into<String>) -> Self {
        let mut status = Self::new(source);
        status.condition = Some(TerminalCondition::Aborted(cause));
        status.error = Some(error.into());
        status
    }

    /// True once a terminal condition is recorded.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.condition.is_some()
    }

    /// True when the pipeline ended without being aborted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.condition.is_some_and(|c| c.is_success())
    }
}

/// Every requested source's status, in spec order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusReport {
    statuses: Vec<SourceStatus>,
}

impl StatusReport {
    /// Build a report from statuses already in spec order.
    #[must_use]
    pub fn new(statuses: Vec<SourceStatus>) -> Self {
        Self { statuses }
    }

    /// Look up one source.
    #[must_use]
    pub fn get(&self, source: &SourceId) -> Option<&SourceStatus> {
        self.statuses.iter().find(|s| &s.source == source)
    }

    /// Iterate in spec order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceStatus> {
        self.statuses.iter()
    }

    /// Statuses of aborted pipelines.
    pub fn failed(&self) -> impl Iterator<Item = &SourceStatus> {
        self.statuses.iter().filter(|s| !s.is_success())
    }

    /// True when no pipeline was aborted.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.statuses.iter().all(SourceStatus::is_success)
    }

    /// Number of sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// True when the report is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
