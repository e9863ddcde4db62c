//! The per-source pagination driver.
//!
//! A driver owns one source pipeline: it checks capabilities, walks cursors,
//! retries through the rate governor and accumulates records until the budget
//! is met, the source is exhausted or the pipeline aborts.

use crate::governor::{RateGovernor, RetryDecision};
use crate::status::{AbortCause, SourceStatus, TerminalCondition};
use jobhound_core::{JobRecord, SearchSpec};
use jobhound_sources::{Cursor, ParsedPage, ProxyPool, SourceAdapter, SourceError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Driver states.
///
/// `Starting → Fetching → Parsing → (Continuing | Exhausted | BudgetMet | Aborted)`;
/// the last three are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Capability check and initial cursor
    Starting,
    /// Requesting a page
    Fetching,
    /// Parsing the fetched page
    Parsing,
    /// Advancing to the next cursor
    Continuing,
    /// Terminal
    Finished(TerminalCondition),
}

impl DriverState {
    /// True for the terminal states.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

/// Records and status produced by one pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Accumulated records in fetch order, at most the budget
    pub records: Vec<JobRecord>,
    /// Final status
    pub status: SourceStatus,
}

struct Abort {
    cause: AbortCause,
    error: String,
}

impl Abort {
    fn new(cause: AbortCause, error: impl Into<String>) -> Self {
        Self {
            cause,
            error: error.into(),
        }
    }

    fn timeout() -> Self {
        Self::new(AbortCause::Timeout, "overall deadline elapsed")
    }

    fn from_error(error: &SourceError) -> Self {
        let cause = match error {
            SourceError::CapabilityUnsupported { .. } => AbortCause::CapabilityUnsupported,
            SourceError::RateLimited { .. } => AbortCause::RateLimited,
            SourceError::TransientNetwork { .. } => AbortCause::TransientNetwork,
            SourceError::MalformedRecord { .. }
            | SourceError::Fatal { .. }
            | SourceError::NotFound(_)
            | SourceError::InvalidProxy { .. } => AbortCause::Fatal,
        };
        Self::new(cause, error.to_string())
    }
}

/// Drives one source adapter through its pages.
pub struct PaginationDriver {
    adapter: Arc<dyn SourceAdapter>,
    spec: Arc<SearchSpec>,
    proxies: Arc<ProxyPool>,
    governor: RateGovernor,
    cancel: CancellationToken,
    state: DriverState,
    records: Vec<JobRecord>,
    status: SourceStatus,
}

impl PaginationDriver {
    /// Create a driver for one pipeline.
    #[must_use]
    pub fn new(
        adapter: Arc<dyn SourceAdapter>,
        spec: Arc<SearchSpec>,
        proxies: Arc<ProxyPool>,
        governor: RateGovernor,
        cancel: CancellationToken,
    ) -> Self {
        let status = SourceStatus::new(adapter.source_id().clone());
        Self {
            adapter,
            spec,
            proxies,
            governor,
            cancel,
            state: DriverState::Starting,
            records: Vec::new(),
            status,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Run the pipeline to a terminal state.
    ///
    /// Never fails: every error ends up in the returned status, and records
    /// accumulated before an abort are kept.
    pub async fn run(mut self) -> PipelineOutcome {
        let started = Instant::now();
        let source = self.adapter.source_id().clone();
        info!(source = %source, "Starting source pipeline");

        let condition = match self.drive().await {
            Ok(condition) => condition,
            Err(abort) => {
                warn!(source = %source, cause = ?abort.cause, "Source pipeline aborted: {}", abort.error);
                self.status.error = Some(abort.error);
                TerminalCondition::Aborted(abort.cause)
            }
        };

        self.state = DriverState::Finished(condition);
        self.status.condition = Some(condition);
        self.status.records_returned = self.records.len();
        self.status.retries = self.governor.retries();
        self.status.elapsed = started.elapsed();

        info!(
            source = %source,
            records = self.status.records_returned,
            pages = self.status.pages_fetched,
            "Source pipeline finished: {}",
            condition
        );

        PipelineOutcome {
            records: self.records,
            status: self.status,
        }
    }

    async fn drive(&mut self) -> Result<TerminalCondition, Abort> {
        let source = self.adapter.source_id().clone();
        let budget = self.spec.results_wanted;

        self.adapter
            .check_capabilities(&self.spec)
            .map_err(|e| Abort::from_error(&e))?;

        let capabilities = self.adapter.capabilities();
        let ignored = capabilities.ignored_filters(&self.spec);
        if !ignored.is_empty() {
            let names: Vec<&str> = ignored.iter().map(|f| f.field_name()).collect();
            warn!(source = %source, "Ignoring unsupported filters: {}", names.join(", "));
        }

        let mut cursor = self.adapter.initial_cursor(&self.spec);
        let mut skip = if capabilities.native_offset {
            0
        } else {
            self.spec.offset
        };

        loop {
            self.state = DriverState::Fetching;
            let page = self.fetch_with_retry(&cursor).await?;
            self.status.pages_fetched += 1;
            self.status.records_dropped += page.dropped;

            self.state = DriverState::Parsing;
            debug!(
                source = %source,
                page = self.status.pages_fetched,
                records = page.records.len(),
                dropped = page.dropped,
                "Parsed page"
            );

            if page.records.is_empty() {
                if page.next.is_some() {
                    debug!(source = %source, "Empty page without end marker, stopping");
                }
                return Ok(TerminalCondition::Exhausted);
            }

            let ParsedPage { mut records, next, .. } = page;
            if skip > 0 {
                let skipped = skip.min(records.len());
                records.drain(..skipped);
                skip -= skipped;
            }
            self.records.extend(records);

            if self.records.len() >= budget {
                self.records.truncate(budget);
                return Ok(TerminalCondition::BudgetMet);
            }

            match next {
                None => return Ok(TerminalCondition::Exhausted),
                Some(next) if next == cursor => {
                    warn!(source = %source, "Cursor did not advance, stopping");
                    return Ok(TerminalCondition::Exhausted);
                }
                Some(next) => {
                    self.state = DriverState::Continuing;
                    cursor = next;
                }
            }
        }
    }

    /// Fetch and parse one page, retrying through the governor.
    async fn fetch_with_retry(&mut self, cursor: &Cursor) -> Result<ParsedPage, Abort> {
        let source = self.adapter.source_id().clone();
        let request = self
            .adapter
            .build_query(&self.spec, cursor)
            .map_err(|e| Abort::from_error(&e))?;

        loop {
            let wait = self.governor.wait_time();
            if !wait.is_zero() {
                self.sleep(wait).await?;
            }

            self.governor.record_request();
            let assignment = self.proxies.assign();
            let adapter = Arc::clone(&self.adapter);

            let fetched = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(Abort::timeout()),
                result = adapter.fetch_page(&request, &assignment) => result,
            };

            let attempt = fetched.and_then(|response| {
                self.adapter.parse_page(&self.spec, &response, cursor)
            });

            let error = match attempt {
                Ok(page) => {
                    self.governor.on_success();
                    return Ok(page);
                }
                Err(error) => error,
            };

            let decision = match &error {
                SourceError::TransientNetwork { .. } => self.governor.on_transient_failure(),
                SourceError::RateLimited { retry_after, .. } => {
                    self.governor.on_rate_limited(*retry_after)
                }
                _ => return Err(Abort::from_error(&error)),
            };

            match decision {
                RetryDecision::Retry(delay) => {
                    warn!(
                        source = %source,
                        attempt = self.governor.retries(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        proxy = assignment.index,
                        "Request failed, retrying: {}",
                        error
                    );
                    self.sleep(delay).await?;
                }
                RetryDecision::GiveUp => {
                    return Err(Abort::new(
                        Abort::from_error(&error).cause,
                        format!("retries exhausted: {error}"),
                    ))
                }
            }
        }
    }

    async fn sleep(&self, duration: Duration) -> Result<(), Abort> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Abort::timeout()),
            () = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governor::GovernorPolicy;
    use async_trait::async_trait;
    use jobhound_core::{SourceCapabilities, SourceId};
    use jobhound_sources::{NativeRequest, NativeResponse, ProxyAssignment};
    use std::sync::Mutex;

    /// Serves `pages` of sequential records; page `n` answers cursor `Offset(n * size)`.
    struct PagedAdapter {
        id: SourceId,
        page_size: usize,
        total: usize,
        native_offset: bool,
        failures: Mutex<Vec<SourceError>>,
    }

    impl PagedAdapter {
        fn new(total: usize, page_size: usize) -> Self {
            Self {
                id: SourceId::new("paged").expect("valid source"),
                page_size,
                total,
                native_offset: true,
                failures: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SourceAdapter for PagedAdapter {
        fn source_id(&self) -> &SourceId {
            &self.id
        }

        fn capabilities(&self) -> SourceCapabilities {
            let caps = SourceCapabilities::new();
            if self.native_offset {
                caps.with_native_offset()
            } else {
                caps
            }
        }

        fn build_query(
            &self,
            _spec: &SearchSpec,
            cursor: &Cursor,
        ) -> jobhound_sources::Result<NativeRequest> {
            let start = match cursor {
                Cursor::Offset(start) => *start,
                _ => 0,
            };
            Ok(NativeRequest::get("https://board.test/jobs").with_query("start", start))
        }

        async fn fetch_page(
            &self,
            request: &NativeRequest,
            _proxy: &ProxyAssignment,
        ) -> jobhound_sources::Result<NativeResponse> {
            if let Some(error) = self.failures.lock().expect("lock failures").pop() {
                return Err(error);
            }
            Ok(NativeResponse::ok(request.query_value("start").unwrap_or("0")))
        }

        fn parse_page(
            &self,
            _spec: &SearchSpec,
            response: &NativeResponse,
            _cursor: &Cursor,
        ) -> jobhound_sources::Result<ParsedPage> {
            let start: usize = response.body.parse().expect("numeric body");
            let end = (start + self.page_size).min(self.total);
            let records = (start..end)
                .map(|n| {
                    JobRecord::new(
                        self.id.clone(),
                        n.to_string(),
                        format!("Job {n}"),
                        format!("https://board.test/jobs/{n}"),
                    )
                })
                .collect();
            let next = (end < self.total).then_some(Cursor::Offset(end));
            Ok(ParsedPage::from_candidates(records, next))
        }
    }

    fn driver(adapter: PagedAdapter, spec: SearchSpec) -> PaginationDriver {
        let policy = GovernorPolicy {
            min_interval: Duration::ZERO,
            ..GovernorPolicy::default()
        };
        PaginationDriver::new(
            Arc::new(adapter),
            Arc::new(spec),
            Arc::new(ProxyPool::direct(Duration::from_secs(1)).expect("direct pool")),
            RateGovernor::new(policy),
            CancellationToken::new(),
        )
    }

    fn spec(budget: usize) -> SearchSpec {
        SearchSpec::new(vec![SourceId::new("paged").expect("valid source")])
            .with_results_wanted(budget)
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_met_truncates() {
        let outcome = driver(PagedAdapter::new(546, 50), spec(120)).run().await;
        assert_eq!(outcome.records.len(), 120);
        assert_eq!(outcome.status.pages_fetched, 3);
        assert_eq!(outcome.status.condition, Some(TerminalCondition::BudgetMet));
        assert_eq!(outcome.records[119].native_id, "119");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_on_end_marker() {
        let outcome = driver(PagedAdapter::new(70, 50), spec(500)).run().await;
        assert_eq!(outcome.records.len(), 70);
        assert_eq!(outcome.status.condition, Some(TerminalCondition::Exhausted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_offset_skipped_by_driver() {
        let mut adapter = PagedAdapter::new(100, 10);
        adapter.native_offset = false;
        let outcome = driver(adapter, spec(5).with_offset(15)).run().await;
        let ids: Vec<&str> = outcome.records.iter().map(|r| r.native_id.as_str()).collect();
        assert_eq!(ids, vec!["15", "16", "17", "18", "19"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_offset_starts_at_offset() {
        let outcome = driver(PagedAdapter::new(100, 10), spec(3).with_offset(40))
            .run()
            .await;
        assert_eq!(outcome.records[0].native_id, "40");
        assert_eq!(outcome.status.pages_fetched, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_retried() {
        let adapter = PagedAdapter::new(10, 10);
        adapter.failures.lock().expect("lock failures").extend([
            SourceError::TransientNetwork {
                source_id: adapter.id.clone(),
                message: "reset".to_string(),
                status: None,
            },
            SourceError::TransientNetwork {
                source_id: adapter.id.clone(),
                message: "503".to_string(),
                status: Some(503),
            },
        ]);
        let outcome = driver(adapter, spec(10)).run().await;
        assert_eq!(outcome.records.len(), 10);
        assert_eq!(outcome.status.retries, 2);
        assert!(outcome.status.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_aborts_without_retry() {
        let adapter = PagedAdapter::new(10, 10);
        let fatal = SourceError::fatal(&adapter.id, "status 403");
        adapter.failures.lock().expect("lock failures").push(fatal);
        let outcome = driver(adapter, spec(10)).run().await;
        assert!(outcome.records.is_empty());
        assert_eq!(
            outcome.status.condition,
            Some(TerminalCondition::Aborted(AbortCause::Fatal))
        );
        assert_eq!(outcome.status.retries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_keeps_partial_records() {
        let adapter = PagedAdapter::new(100, 10);
        let cancel = CancellationToken::new();
        let policy = GovernorPolicy {
            min_interval: Duration::from_secs(10),
            ..GovernorPolicy::default()
        };
        let driver = PaginationDriver::new(
            Arc::new(adapter),
            Arc::new(spec(100)),
            Arc::new(ProxyPool::direct(Duration::from_secs(1)).expect("direct pool")),
            RateGovernor::new(policy),
            cancel.clone(),
        );

        let handle = tokio::spawn(driver.run());
        tokio::time::sleep(Duration::from_secs(15)).await;
        cancel.cancel();
        let outcome = handle.await.expect("pipeline task");

        assert_eq!(outcome.records.len(), 20);
        assert_eq!(
            outcome.status.condition,
            Some(TerminalCondition::Aborted(AbortCause::Timeout))
        );
    }
}
