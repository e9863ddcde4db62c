//! Concurrent multi-source search orchestration.
//!
//! The [`SearchOrchestrator`] validates a spec, launches one independent
//! pipeline per requested source, enforces the overall deadline and merges
//! the results in spec order before de-duplication.

use crate::dedup::{DedupStats, Deduplicator};
use crate::error::{AggregateError, Result};
use crate::governor::{GovernorPolicy, RateGovernor};
use crate::pagination::{PaginationDriver, PipelineOutcome};
use crate::status::{AbortCause, SourceStatus, StatusReport};
use chrono::{DateTime, Utc};
use jobhound_core::{AppConfig, JobRecord, SearchSpec, SourceId};
use jobhound_sources::{ProxyPool, SourceRegistry};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Run-level settings that are not part of a search spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Deadline for the whole run; `None` waits for every pipeline
    pub overall_timeout: Option<Duration>,
    /// Timeout applied to each HTTP request
    pub request_timeout: Duration,
    /// Pacing and retry policy given to each pipeline's governor
    pub governor: GovernorPolicy,
    /// Proxies used when a spec supplies none
    pub default_proxies: Vec<String>,
    /// Enable cross-source de-duplication even when a spec doesn't ask
    pub cross_source_dedup: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for OrchestratorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            overall_timeout: config.scraping.overall_timeout(),
            request_timeout: config.scraping.request_timeout(),
            governor: GovernorPolicy::from(&config.rate_limit),
            default_proxies: config.proxies.proxies.clone(),
            cross_source_dedup: config.scraping.cross_source_dedup,
        }
    }
}

/// Result of one aggregation run.
#[derive(Debug, Clone, Serialize)]
pub struct Aggregation {
    /// Unique run identifier
    pub run_id: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Merged, de-duplicated records in spec order
    pub records: Vec<JobRecord>,
    /// Outcome of every requested source, in spec order
    pub report: StatusReport,
    /// De-duplication counts
    pub dedup: DedupStats,
}

/// Fans a search out to every requested source and merges the results.
#[derive(Debug, Clone)]
pub struct SearchOrchestrator {
    registry: Arc<SourceRegistry>,
    config: OrchestratorConfig,
}

impl SearchOrchestrator {
    /// Create an orchestrator over the given adapters with default settings.
    #[must_use]
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self {
            registry,
            config: OrchestratorConfig::default(),
        }
    }

    /// Replace the run-level settings.
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Current run-level settings.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one aggregation.
    ///
    /// Fails only when the spec is rejected before any pipeline starts. Once
    /// pipelines are running every problem is reported through the returned
    /// status report, and partial results are always merged.
    pub async fn aggregate(&self, spec: SearchSpec) -> Result<Aggregation> {
        spec.validate()?;

        let adapters = spec
            .sources
            .iter()
            .map(|id| {
                self.registry
                    .get(id)
                    .map_err(|_| AggregateError::UnknownSource(id.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let proxies = if spec.proxies.is_empty() {
            &self.config.default_proxies
        } else {
            &spec.proxies
        };
        let pool = Arc::new(
            ProxyPool::new(proxies, self.config.request_timeout)
                .map_err(AggregateError::InvalidProxy)?,
        );

        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let cross_source = spec.dedup_across_sources || self.config.cross_source_dedup;
        info!(
            run_id = %run_id,
            sources = spec.sources.len(),
            budget = spec.results_wanted,
            proxies = pool.len(),
            "Starting aggregation"
        );

        let spec = Arc::new(spec);
        let cancel = CancellationToken::new();

        let handles: Vec<JoinHandle<PipelineOutcome>> = adapters
            .into_iter()
            .map(|adapter| {
                let driver = PaginationDriver::new(
                    adapter,
                    Arc::clone(&spec),
                    Arc::clone(&pool),
                    RateGovernor::new(self.config.governor.clone()),
                    cancel.child_token(),
                );
                tokio::spawn(driver.run())
            })
            .collect();

        let joined = futures::future::join_all(handles);
        tokio::pin!(joined);

        let results = match self.config.overall_timeout {
            Some(deadline) => {
                tokio::select! {
                    results = &mut joined => results,
                    () = tokio::time::sleep(deadline) => {
                        warn!(run_id = %run_id, "Overall deadline of {:?} elapsed, cancelling pipelines", deadline);
                        cancel.cancel();
                        joined.await
                    }
                }
            }
            None => joined.await,
        };

        let mut merged = Vec::new();
        let mut statuses = Vec::with_capacity(results.len());
        for (source, result) in spec.sources.iter().zip(results) {
            let outcome = result.unwrap_or_else(|e| panicked(source, &e));
            merged.extend(outcome.records);
            statuses.push(outcome.status);
        }

        let (records, dedup) = Deduplicator::new(cross_source).run(merged);
        let report = StatusReport::new(statuses);

        info!(
            run_id = %run_id,
            records = records.len(),
            exact_duplicates = dedup.exact_duplicates,
            cross_source_duplicates = dedup.cross_source_duplicates,
            failed_sources = report.failed().count(),
            "Aggregation complete"
        );

        Ok(Aggregation {
            run_id,
            started_at,
            records,
            report,
            dedup,
        })
    }
}

fn panicked(source: &SourceId, error: &tokio::task::JoinError) -> PipelineOutcome {
    error!(source = %source, "Source pipeline task failed: {}", error);
    PipelineOutcome {
        records: Vec::new(),
        status: SourceStatus::failed(
            source.clone(),
            AbortCause::Fatal,
            format!("pipeline task failed: {error}"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_app_config() {
        let mut app = AppConfig::default();
        app.scraping.overall_timeout_secs = 0;
        app.proxies.proxies = vec!["10.0.0.1:8080".to_string()];
        app.rate_limit.max_retries = 7;

        let config = OrchestratorConfig::from(&app);
        assert_eq!(config.overall_timeout, None);
        assert_eq!(config.default_proxies.len(), 1);
        assert_eq!(config.governor.max_retries, 7);
    }

    #[tokio::test]
    async fn test_rejects_invalid_spec_before_starting() {
        let orchestrator = SearchOrchestrator::new(Arc::new(SourceRegistry::new()));

        let err = orchestrator
            .aggregate(SearchSpec::new(Vec::new()))
            .await
            .expect_err("empty source list");
        assert!(matches!(err, AggregateError::InvalidSpec(_)));

        let spec = SearchSpec::new(vec![SourceId::new("monster").expect("valid source")]);
        let err = orchestrator.aggregate(spec).await.expect_err("unknown source");
        assert!(matches!(err, AggregateError::UnknownSource(id) if id.as_str() == "monster"));
    }
}
