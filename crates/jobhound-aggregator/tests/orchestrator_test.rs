use async_trait::async_trait;
use jobhound_aggregator::{
    AbortCause, AggregateError, GovernorPolicy, OrchestratorConfig, SearchOrchestrator,
    TerminalCondition,
};
use jobhound_core::{JobRecord, SearchSpec, SourceCapabilities, SourceId};
use jobhound_sources::{
    Cursor, NativeRequest, NativeResponse, ParsedPage, ProxyAssignment, SourceAdapter,
    SourceError, SourceRegistry,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-process board serving `total` sequential records in pages of `page_size`.
struct FakeBoard {
    id: SourceId,
    total: usize,
    page_size: usize,
    company_scope: bool,
    company_name: Option<String>,
    fetch_delay: Duration,
    hang_from: Option<usize>,
    rate_limited_from: Option<usize>,
    empty_pages: bool,
    requests: Mutex<Vec<NativeRequest>>,
}

impl FakeBoard {
    fn new(id: &str, total: usize, page_size: usize) -> Self {
        Self {
            id: SourceId::new(id).expect("valid source"),
            total,
            page_size,
            company_scope: true,
            company_name: None,
            fetch_delay: Duration::ZERO,
            hang_from: None,
            rate_limited_from: None,
            empty_pages: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn request_count(&self) -> usize {
        self.requests.lock().expect("lock requests").len()
    }
}

#[async_trait]
impl SourceAdapter for FakeBoard {
    fn source_id(&self) -> &SourceId {
        &self.id
    }

    fn capabilities(&self) -> SourceCapabilities {
        let caps = SourceCapabilities::new().with_native_offset();
        if self.company_scope {
            caps.with_company_scope()
        } else {
            caps
        }
    }

    fn build_query(
        &self,
        spec: &SearchSpec,
        cursor: &Cursor,
    ) -> jobhound_sources::Result<NativeRequest> {
        let start = match cursor {
            Cursor::Offset(start) => *start,
            _ => 0,
        };
        let request = NativeRequest::get(format!("https://{}.test/search", self.id))
            .with_query("start", start);
        Ok(match spec.query_mode() {
            jobhound_core::QueryMode::Company(company) => request.with_query("company", company),
            jobhound_core::QueryMode::Keyword(term) => request.with_query("q", term),
            jobhound_core::QueryMode::Unfiltered => request,
        })
    }

    async fn fetch_page(
        &self,
        request: &NativeRequest,
        _proxy: &ProxyAssignment,
    ) -> jobhound_sources::Result<NativeResponse> {
        self.requests
            .lock()
            .expect("lock requests")
            .push(request.clone());

        let start: usize = request
            .query_value("start")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        if self.hang_from.is_some_and(|from| start >= from) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.rate_limited_from.is_some_and(|from| start >= from) {
            return Err(SourceError::RateLimited {
                source_id: self.id.clone(),
                retry_after: None,
            });
        }
        Ok(NativeResponse::ok(start.to_string()))
    }

    fn parse_page(
        &self,
        _spec: &SearchSpec,
        response: &NativeResponse,
        _cursor: &Cursor,
    ) -> jobhound_sources::Result<ParsedPage> {
        let start: usize = response
            .body
            .parse()
            .map_err(|_| SourceError::fatal(&self.id, "non-numeric body"))?;
        let end = (start + self.page_size).min(self.total);

        if self.empty_pages {
            return Ok(ParsedPage::from_candidates(Vec::new(), Some(Cursor::Offset(end))));
        }

        let records = (start..end)
            .map(|n| {
                let mut record = JobRecord::new(
                    self.id.clone(),
                    n.to_string(),
                    format!("Job {n}"),
                    format!("https://{}.test/jobs/{n}", self.id),
                );
                record.company_name.clone_from(&self.company_name);
                record
            })
            .collect();
        let next = (end < self.total).then_some(Cursor::Offset(end));
        Ok(ParsedPage::from_candidates(records, next))
    }
}

fn config(overall_timeout: Option<Duration>) -> OrchestratorConfig {
    OrchestratorConfig {
        overall_timeout,
        request_timeout: Duration::from_secs(5),
        governor: GovernorPolicy {
            min_interval: Duration::ZERO,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
            max_retries: 2,
            max_rate_limit_retries: 2,
        },
        default_proxies: Vec::new(),
        cross_source_dedup: false,
    }
}

fn orchestrator(
    boards: &[Arc<FakeBoard>],
    overall_timeout: Option<Duration>,
) -> SearchOrchestrator {
    let mut registry = SourceRegistry::new();
    for board in boards {
        registry.register(Arc::clone(board) as Arc<dyn SourceAdapter>);
    }
    SearchOrchestrator::new(Arc::new(registry)).with_config(config(overall_timeout))
}

fn spec(sources: &[&str]) -> SearchSpec {
    SearchSpec::new(
        sources
            .iter()
            .map(|s| SourceId::new(*s).expect("valid source"))
            .collect(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_company_scope_budget_truncation() {
    let board = Arc::new(FakeBoard::new("boardx", 546, 50));
    let orchestrator = orchestrator(&[Arc::clone(&board)], None);

    let aggregation = orchestrator
        .aggregate(
            spec(&["boardx"])
                .with_search_term("software engineer")
                .with_company_scope("Uber")
                .with_results_wanted(50),
        )
        .await
        .expect("aggregate");

    assert_eq!(aggregation.records.len(), 50);
    let status = aggregation
        .report
        .get(&SourceId::new("boardx").expect("valid source"))
        .expect("boardx status");
    assert_eq!(status.condition, Some(TerminalCondition::BudgetMet));
    assert_eq!(status.pages_fetched, 1);

    let requests = board.requests.lock().expect("lock requests");
    assert!(requests
        .iter()
        .all(|r| r.query_value("company") == Some("Uber") && r.query_value("q").is_none()));
}

#[tokio::test(start_paused = true)]
async fn test_budget_spanning_pages() {
    let board = Arc::new(FakeBoard::new("boardx", 546, 50));
    let orchestrator = orchestrator(&[Arc::clone(&board)], None);

    let aggregation = orchestrator
        .aggregate(spec(&["boardx"]).with_results_wanted(1000))
        .await
        .expect("aggregate");

    assert_eq!(aggregation.records.len(), 546);
    assert_eq!(board.request_count(), 11);
    assert!(aggregation.report.all_succeeded());
    assert_eq!(
        aggregation.report.iter().next().and_then(|s| s.condition),
        Some(TerminalCondition::Exhausted)
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_page_without_end_marker_is_exhausted() {
    let mut board = FakeBoard::new("boardx", 500, 50);
    board.empty_pages = true;
    let board = Arc::new(board);
    let orchestrator = orchestrator(&[Arc::clone(&board)], None);

    let aggregation = orchestrator
        .aggregate(spec(&["boardx"]).with_results_wanted(100))
        .await
        .expect("aggregate");

    assert!(aggregation.records.is_empty());
    assert_eq!(board.request_count(), 1);
    let status = aggregation.report.iter().next().expect("one status");
    assert_eq!(status.condition, Some(TerminalCondition::Exhausted));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_keeps_partial_results() {
    let mut slow = FakeBoard::new("slow", 100, 10);
    slow.hang_from = Some(10);
    let fast = FakeBoard::new("fast", 20, 50);
    let orchestrator = orchestrator(
        &[Arc::new(slow), Arc::new(fast)],
        Some(Duration::from_secs(30)),
    );

    let aggregation = orchestrator
        .aggregate(spec(&["slow", "fast"]).with_results_wanted(100))
        .await
        .expect("aggregate");

    assert_eq!(aggregation.records.len(), 30);
    assert!(aggregation.records[..10]
        .iter()
        .all(|r| r.source.as_str() == "slow"));

    let conditions: Vec<_> = aggregation.report.iter().map(|s| s.condition).collect();
    assert_eq!(
        conditions,
        vec![
            Some(TerminalCondition::Aborted(AbortCause::Timeout)),
            Some(TerminalCondition::Exhausted),
        ]
    );
    assert_eq!(aggregation.report.failed().count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_merge_follows_source_order() {
    let mut first = FakeBoard::new("a", 3, 10);
    first.fetch_delay = Duration::from_secs(5);
    let second = FakeBoard::new("b", 2, 10);
    let orchestrator = orchestrator(&[Arc::new(first), Arc::new(second)], None);

    let aggregation = orchestrator
        .aggregate(spec(&["a", "b"]))
        .await
        .expect("aggregate");

    let order: Vec<String> = aggregation
        .records
        .iter()
        .map(|r| format!("{}:{}", r.source, r.native_id))
        .collect();
    assert_eq!(order, vec!["a:0", "a:1", "a:2", "b:0", "b:1"]);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_ceiling_aborts_one_source() {
    let mut blocked = FakeBoard::new("blocked", 100, 10);
    blocked.rate_limited_from = Some(10);
    let healthy = FakeBoard::new("healthy", 5, 10);
    let blocked = Arc::new(blocked);
    let orchestrator = orchestrator(&[Arc::clone(&blocked), Arc::new(healthy)], None);

    let aggregation = orchestrator
        .aggregate(spec(&["blocked", "healthy"]).with_results_wanted(50))
        .await
        .expect("aggregate");

    assert_eq!(aggregation.records.len(), 15);
    let status = aggregation
        .report
        .get(&SourceId::new("blocked").expect("valid source"))
        .expect("blocked status");
    assert_eq!(
        status.condition,
        Some(TerminalCondition::Aborted(AbortCause::RateLimited))
    );
    assert_eq!(status.records_returned, 10);
    assert_eq!(status.retries, 2);
    // One successful page, then the first attempt plus two retries.
    assert_eq!(blocked.request_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_capability_unsupported_fails_only_that_source() {
    let mut keyword_only = FakeBoard::new("keyword", 10, 10);
    keyword_only.company_scope = false;
    let keyword_only = Arc::new(keyword_only);
    let scoped = FakeBoard::new("scoped", 10, 10);
    let orchestrator = orchestrator(&[Arc::clone(&keyword_only), Arc::new(scoped)], None);

    let aggregation = orchestrator
        .aggregate(spec(&["keyword", "scoped"]).with_company_scope("Uber"))
        .await
        .expect("aggregate");

    assert_eq!(keyword_only.request_count(), 0);
    assert_eq!(aggregation.records.len(), 10);
    assert!(aggregation.records.iter().all(|r| r.source.as_str() == "scoped"));

    let status = aggregation
        .report
        .get(&SourceId::new("keyword").expect("valid source"))
        .expect("keyword status");
    assert_eq!(
        status.condition,
        Some(TerminalCondition::Aborted(AbortCause::CapabilityUnsupported))
    );
    assert!(status.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_spec_is_rejected() {
    let orchestrator = orchestrator(&[Arc::new(FakeBoard::new("boardx", 10, 10))], None);

    let err = orchestrator
        .aggregate(spec(&["boardx"]).with_results_wanted(0))
        .await
        .expect_err("zero budget");
    assert!(matches!(err, AggregateError::InvalidSpec(_)));

    let err = orchestrator
        .aggregate(spec(&["boardx", "monster"]))
        .await
        .expect_err("unknown source");
    assert!(matches!(err, AggregateError::UnknownSource(_)));

    let err = orchestrator
        .aggregate(spec(&["boardx"]).with_proxies(vec!["http://".to_string()]))
        .await
        .expect_err("bad proxy");
    assert!(matches!(err, AggregateError::InvalidProxy(_)));
}

#[tokio::test(start_paused = true)]
async fn test_cross_source_dedup_is_opt_in_and_idempotent() {
    let mut a = FakeBoard::new("a", 5, 10);
    a.company_name = Some("Acme".to_string());
    let mut b = FakeBoard::new("b", 5, 10);
    b.company_name = Some("ACME".to_string());
    let orchestrator = orchestrator(&[Arc::new(a), Arc::new(b)], None);

    let plain = orchestrator
        .aggregate(spec(&["a", "b"]))
        .await
        .expect("aggregate");
    assert_eq!(plain.records.len(), 10);
    assert_eq!(plain.dedup.cross_source_duplicates, 0);

    let deduped = orchestrator
        .aggregate(spec(&["a", "b"]).with_cross_source_dedup(true))
        .await
        .expect("aggregate");
    assert_eq!(deduped.records.len(), 5);
    assert_eq!(deduped.dedup.cross_source_duplicates, 5);
    assert!(deduped.records.iter().all(|r| r.source.as_str() == "a"));

    let (again, stats) = jobhound_aggregator::Deduplicator::new(true).run(deduped.records.clone());
    assert_eq!(again, deduped.records);
    assert_eq!(stats.output, stats.input);
}
