//! Jobhound Aggregator - concurrent multi-source search orchestration.
//!
//! The aggregator turns one [`SearchSpec`](jobhound_core::SearchSpec) into a
//! merged, de-duplicated record set. Every requested source runs in its own
//! task with its own pagination driver and rate governor; a failing source
//! never affects the others, and the status report always lists every source.
//!
//! # Modules
//!
//! - [`orchestrator`] - Fan-out, overall deadline and stable merge
//! - [`pagination`] - Per-source pagination state machine
//! - [`governor`] - Request pacing and backoff
//! - [`dedup`] - Normalization, de-duplication and duplicate analysis
//! - [`status`] - Per-source terminal conditions and the run report
//! - [`batch`] - Sequential multi-company runs with recency windows
//! - [`error`] - Errors that reject a run before it starts

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod batch;
pub mod dedup;
pub mod error;
pub mod governor;
pub mod orchestrator;
pub mod pagination;
pub mod status;

// Re-export commonly used types
pub use batch::{BatchOutcome, BatchRecord, BatchStrategy, CompanyBatch, CompanySummary};
pub use dedup::{DedupStats, Deduplicator, DuplicateReport};
pub use error::{AggregateError, Result};
pub use governor::{GovernorPolicy, RateGovernor, RetryDecision};
pub use orchestrator::{Aggregation, OrchestratorConfig, SearchOrchestrator};
pub use pagination::{DriverState, PaginationDriver, PipelineOutcome};
pub use status::{AbortCause, SourceStatus, StatusReport, TerminalCondition};
