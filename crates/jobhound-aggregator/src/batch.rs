//! Multi-company batch runs.
//!
//! A batch runs one company-scoped aggregation per company, one after the
//! other. Boards cap how deep a single query can page, so a company whose
//! first run comes back near the budget is searched again over widening
//! recency windows and the windows are merged.

use crate::error::Result;
use crate::orchestrator::SearchOrchestrator;
use crate::status::StatusReport;
use jobhound_core::{JobRecord, SearchSpec, SourceId};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Saturation threshold as a percentage of the budget.
const SATURATION_PERCENT: usize = 95;

/// Width of one recency window in hours.
const WINDOW_STEP_HOURS: u32 = 24;

/// Largest bounded recency window; one unbounded window follows it.
const WINDOW_LIMIT_HOURS: u32 = 336;

/// How a company's records were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStrategy {
    /// A single search stayed under the saturation threshold
    Simple,
    /// Recency windows were searched and merged
    TimeWindows,
    /// Windows produced nothing, so the first search was kept
    Fallback,
}

/// A record together with the company search that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRecord {
    /// Company token the search was scoped to
    pub search_company: String,
    /// Recency window the record was found in, if any
    pub time_window: Option<String>,
    /// The record
    #[serde(flatten)]
    pub record: JobRecord,
}

/// Per-company summary.
#[derive(Debug, Clone, Serialize)]
pub struct CompanySummary {
    /// Company token
    pub company: String,
    /// Strategy used
    pub strategy: BatchStrategy,
    /// Records kept for this company
    pub records: usize,
    /// Share of records whose company name contains the token, in percent
    pub accuracy: f64,
    /// Status report of the first search
    pub report: Option<StatusReport>,
    /// Error that prevented the company from running
    pub error: Option<String>,
}

/// Result of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    /// Records across every company, newest first
    pub records: Vec<BatchRecord>,
    /// One summary per company, in input order
    pub companies: Vec<CompanySummary>,
    /// Records dropped by the cross-company pass
    pub duplicates_removed: usize,
}

/// Runs company-scoped searches for a list of companies.
#[derive(Debug, Clone)]
pub struct CompanyBatch {
    orchestrator: SearchOrchestrator,
    template: SearchSpec,
}

impl CompanyBatch {
    /// Create a batch; `template` supplies every option except the company scope.
    #[must_use]
    pub fn new(orchestrator: SearchOrchestrator, template: SearchSpec) -> Self {
        Self {
            orchestrator,
            template,
        }
    }

    /// Run every company in order.
    ///
    /// A company that fails is recorded in its summary and the batch moves on.
    pub async fn run(&self, companies: &[String]) -> BatchOutcome {
        let mut records = Vec::new();
        let mut summaries = Vec::with_capacity(companies.len());

        for (index, company) in companies.iter().enumerate() {
            info!(
                company = %company,
                "Searching company {}/{}",
                index + 1,
                companies.len()
            );
            match self.run_company(company).await {
                Ok((company_records, summary)) => {
                    info!(
                        company = %company,
                        records = summary.records,
                        strategy = ?summary.strategy,
                        "Company search finished (accuracy {:.1}%)",
                        summary.accuracy
                    );
                    records.extend(company_records);
                    summaries.push(summary);
                }
                Err(e) => {
                    warn!(company = %company, "Company search failed: {}", e);
                    summaries.push(CompanySummary {
                        company: company.clone(),
                        strategy: BatchStrategy::Simple,
                        records: 0,
                        accuracy: 0.0,
                        report: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let before = records.len();
        let mut records = dedup_by_url_and_title(records, |r| &r.record);
        let duplicates_removed = before - records.len();

        // Newest first, undated last
        records.sort_by_key(|r| (r.record.date_posted.is_none(), Reverse(r.record.date_posted)));

        BatchOutcome {
            records,
            companies: summaries,
            duplicates_removed,
        }
    }

    async fn run_company(&self, company: &str) -> Result<(Vec<BatchRecord>, CompanySummary)> {
        let spec = self.template.clone().with_company_scope(company);
        let budget = spec.results_wanted;
        let initial = self.orchestrator.aggregate(spec.clone()).await?;

        let saturated = saturated_sources(&initial.report, budget);
        let (strategy, tagged) = if saturated.is_empty() {
            (BatchStrategy::Simple, tag(company, None, initial.records))
        } else {
            info!(
                company = %company,
                sources = ?saturated,
                "Result count near the budget, searching recency windows"
            );
            let windowed = self.run_windows(company, &spec).await;
            if windowed.is_empty() {
                (BatchStrategy::Fallback, tag(company, None, initial.records))
            } else {
                (BatchStrategy::TimeWindows, windowed)
            }
        };

        let summary = CompanySummary {
            company: company.to_string(),
            strategy,
            records: tagged.len(),
            accuracy: accuracy(company, &tagged),
            report: Some(initial.report),
            error: None,
        };
        Ok((tagged, summary))
    }

    async fn run_windows(&self, company: &str, spec: &SearchSpec) -> Vec<BatchRecord> {
        let mut collected = Vec::new();

        for window in recency_windows() {
            let label = window_label(window);
            let mut windowed = spec.clone();
            windowed.hours_old = window;

            match self.orchestrator.aggregate(windowed).await {
                Ok(aggregation) => {
                    debug!(
                        company = %company,
                        window = %label,
                        records = aggregation.records.len(),
                        "Window searched"
                    );
                    collected.extend(tag(company, Some(&label), aggregation.records));
                }
                Err(e) => warn!(company = %company, window = %label, "Window search failed: {}", e),
            }
        }

        dedup_by_url_and_title(collected, |r| &r.record)
    }
}

/// Sources whose own record count reached the saturation share of the budget.
fn saturated_sources(report: &StatusReport, budget: usize) -> Vec<&SourceId> {
    report
        .iter()
        .filter(|status| status.records_returned * 100 >= budget * SATURATION_PERCENT)
        .map(|status| &status.source)
        .collect()
}

/// `Some(24), Some(48), ..., Some(336), None`.
fn recency_windows() -> impl Iterator<Item = Option<u32>> {
    (1..=WINDOW_LIMIT_HOURS / WINDOW_STEP_HOURS)
        .map(|step| Some(step * WINDOW_STEP_HOURS))
        .chain(std::iter::once(None))
}

fn window_label(window: Option<u32>) -> String {
    match window {
        Some(hours) => format!("last {hours}h"),
        None => "all time".to_string(),
    }
}

fn tag(company: &str, window: Option<&str>, records: Vec<JobRecord>) -> Vec<BatchRecord> {
    records
        .into_iter()
        .map(|record| BatchRecord {
            search_company: company.to_string(),
            time_window: window.map(str::to_string),
            record,
        })
        .collect()
}

/// Keep the first item for each `(job URL, title)` pair.
fn dedup_by_url_and_title<T>(items: Vec<T>, record: impl Fn(&T) -> &JobRecord) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let r = record(item);
            seen.insert((r.job_url.clone(), r.title.clone()))
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn accuracy(company: &str, records: &[BatchRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let needle = company.to_lowercase();
    let matching = records
        .iter()
        .filter(|r| {
            r.record
                .company_name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(&needle))
        })
        .count();
    matching as f64 / records.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::SourceStatus;

    fn record(id: &str, title: &str, company: Option<&str>) -> JobRecord {
        let mut record = JobRecord::new(
            SourceId::new("indeed").expect("valid source"),
            id,
            title,
            format!("https://board.test/{id}"),
        );
        record.company_name = company.map(str::to_string);
        record
    }

    #[test]
    fn test_recency_windows() {
        let windows: Vec<_> = recency_windows().collect();
        assert_eq!(windows.len(), 15);
        assert_eq!(windows[0], Some(24));
        assert_eq!(windows[13], Some(336));
        assert_eq!(windows[14], None);
        assert_eq!(window_label(None), "all time");
    }

    #[test]
    fn test_saturation_is_per_source() {
        let status = |source: &str, records: usize| {
            let mut status = SourceStatus::new(SourceId::new(source).expect("valid source"));
            status.records_returned = records;
            status
        };

        // 60 merged records from two sources is not saturation at a budget of 50
        let split = StatusReport::new(vec![status("indeed", 30), status("linkedin", 30)]);
        assert!(saturated_sources(&split, 50).is_empty());

        let full = StatusReport::new(vec![status("indeed", 48), status("linkedin", 10)]);
        let saturated = saturated_sources(&full, 50);
        assert_eq!(saturated.len(), 1);
        assert_eq!(saturated[0].as_str(), "indeed");
    }

    #[test]
    fn test_dedup_by_url_and_title_keeps_first() {
        let records = vec![
            record("1", "Engineer", None),
            record("1", "Engineer", Some("Other")),
            record("1", "Engineer II", None),
        ];
        let kept = dedup_by_url_and_title(records, |r| r);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].company_name, None);
    }

    #[tokio::test]
    async fn test_failed_company_is_recorded() {
        let orchestrator =
            SearchOrchestrator::new(std::sync::Arc::new(jobhound_sources::SourceRegistry::new()));
        let template = SearchSpec::new(vec![SourceId::new("indeed").expect("valid source")]);
        let outcome = CompanyBatch::new(orchestrator, template)
            .run(&["acme".to_string()])
            .await;

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.companies.len(), 1);
        assert!(outcome.companies[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("unknown source")));
    }

    #[test]
    fn test_accuracy_is_case_insensitive() {
        let tagged = tag(
            "uber",
            None,
            vec![
                record("1", "Driver", Some("Uber Technologies")),
                record("2", "Courier", Some("Uber Eats")),
                record("3", "Engineer", Some("Lyft")),
                record("4", "Analyst", None),
            ],
        );
        assert!((accuracy("uber", &tagged) - 50.0).abs() < 1e-9);
        assert!(accuracy("uber", &[]).abs() < f64::EPSILON);
        assert!(tagged.iter().all(|r| r.search_company == "uber"));
    }
}
