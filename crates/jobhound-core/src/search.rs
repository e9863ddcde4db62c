//! The caller-facing search specification.

use crate::capabilities::SearchFilter;
use crate::error::{JobsError, Result};
use crate::types::{DescriptionFormat, JobType, SourceId, Verbosity};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn default_results_wanted() -> usize {
    15
}

/// Caller intent for one aggregation run.
///
/// A spec is immutable once submitted: the orchestrator shares it read-only
/// with every source pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSpec {
    /// Sources to query, in merge order
    pub sources: Vec<SourceId>,
    /// Free-text keyword query
    #[serde(default)]
    pub search_term: Option<String>,
    /// Company-scope token; replaces the keyword query on supporting sources
    #[serde(default)]
    pub company_scope: Option<String>,
    /// Free-text location
    #[serde(default)]
    pub location: Option<String>,
    /// Search radius around `location`
    #[serde(default)]
    pub distance_miles: Option<u32>,
    /// Maximum records wanted per source
    #[serde(default = "default_results_wanted")]
    pub results_wanted: usize,
    /// Only postings newer than this many hours
    #[serde(default)]
    pub hours_old: Option<u32>,
    /// Employment type filter
    #[serde(default)]
    pub job_type: Option<JobType>,
    /// Remote-only flag
    #[serde(default)]
    pub is_remote: bool,
    /// Only postings with on-board application
    #[serde(default)]
    pub easy_apply: bool,
    /// Number of leading results to skip per source
    #[serde(default)]
    pub offset: usize,
    /// Proxy connection strings, rotated round-robin across all requests
    #[serde(default)]
    pub proxies: Vec<String>,
    /// Output verbosity level
    #[serde(default)]
    pub verbosity: Verbosity,
    /// Requested description format
    #[serde(default)]
    pub description_format: DescriptionFormat,
    /// Enable the cross-source soft de-duplication heuristic
    #[serde(default)]
    pub dedup_across_sources: bool,
}

/// Effective query mode derived from a spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode<'a> {
    /// Restrict results to one company
    Company(&'a str),
    /// Keyword search
    Keyword(&'a str),
    /// Neither a company scope nor a search term was supplied
    Unfiltered,
}

impl SearchSpec {
    /// Create a spec for the given sources with default options.
    #[must_use]
    pub fn new(sources: Vec<SourceId>) -> Self {
        Self {
            sources,
            search_term: None,
            company_scope: None,
            location: None,
            distance_miles: None,
            results_wanted: default_results_wanted(),
            hours_old: None,
            job_type: None,
            is_remote: false,
            easy_apply: false,
            offset: 0,
            proxies: Vec::new(),
            verbosity: Verbosity::default(),
            description_format: DescriptionFormat::default(),
            dedup_across_sources: false,
        }
    }

    /// Set the free-text search term.
    #[must_use]
    pub fn with_search_term(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    /// Set the company-scope token.
    #[must_use]
    pub fn with_company_scope(mut self, token: impl Into<String>) -> Self {
        self.company_scope = Some(token.into());
        self
    }

    /// Set the location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the per-source result budget.
    #[must_use]
    pub fn with_results_wanted(mut self, results_wanted: usize) -> Self {
        self.results_wanted = results_wanted;
        self
    }

    /// Set the recency filter.
    #[must_use]
    pub fn with_hours_old(mut self, hours: u32) -> Self {
        self.hours_old = Some(hours);
        self
    }

    /// Set the employment type filter.
    #[must_use]
    pub fn with_job_type(mut self, job_type: JobType) -> Self {
        self.job_type = Some(job_type);
        self
    }

    /// Set the remote-only flag.
    #[must_use]
    pub fn with_remote(mut self, is_remote: bool) -> Self {
        self.is_remote = is_remote;
        self
    }

    /// Set the on-board application filter.
    #[must_use]
    pub fn with_easy_apply(mut self, easy_apply: bool) -> Self {
        self.easy_apply = easy_apply;
        self
    }

    /// Set the search radius in miles.
    #[must_use]
    pub fn with_distance(mut self, miles: u32) -> Self {
        self.distance_miles = Some(miles);
        self
    }

    /// Set the description format.
    #[must_use]
    pub fn with_description_format(mut self, format: DescriptionFormat) -> Self {
        self.description_format = format;
        self
    }

    /// Set the output verbosity.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set the pagination offset.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Set the proxy list.
    #[must_use]
    pub fn with_proxies(mut self, proxies: Vec<String>) -> Self {
        self.proxies = proxies;
        self
    }

    /// Enable or disable cross-source soft de-duplication.
    #[must_use]
    pub fn with_cross_source_dedup(mut self, enabled: bool) -> Self {
        self.dedup_across_sources = enabled;
        self
    }

    /// Check the spec invariants before any pipeline starts.
    ///
    /// # Errors
    /// Returns a validation error for an empty or duplicated source list, a
    /// zero budget, a zero recency window or a blank company scope.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(JobsError::Validation(
                "at least one source must be specified".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source) {
                return Err(JobsError::Validation(format!(
                    "source '{source}' is listed more than once"
                )));
            }
        }

        if self.results_wanted == 0 {
            return Err(JobsError::Validation(
                "results_wanted must be greater than zero".to_string(),
            ));
        }

        if self.hours_old == Some(0) {
            return Err(JobsError::Validation(
                "hours_old must be greater than zero when set".to_string(),
            ));
        }

        if let Some(scope) = &self.company_scope {
            if scope.trim().is_empty() {
                return Err(JobsError::Validation(
                    "company_scope cannot be blank".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Effective query mode. A company scope always wins over the search term.
    #[must_use]
    pub fn query_mode(&self) -> QueryMode<'_> {
        if let Some(scope) = self.company_scope.as_deref() {
            return QueryMode::Company(scope.trim());
        }
        match self.search_term.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => QueryMode::Keyword(term),
            _ => QueryMode::Unfiltered,
        }
    }

    /// Filters this spec activates.
    #[must_use]
    pub fn active_filters(&self) -> Vec<SearchFilter> {
        let mut filters = Vec::new();
        if self.company_scope.is_some() {
            filters.push(SearchFilter::CompanyScope);
        }
        if self.hours_old.is_some() {
            filters.push(SearchFilter::HoursOld);
        }
        if self.job_type.is_some() {
            filters.push(SearchFilter::JobType);
        }
        if self.is_remote {
            filters.push(SearchFilter::Remote);
        }
        if self.easy_apply {
            filters.push(SearchFilter::EasyApply);
        }
        if self.distance_miles.is_some() {
            filters.push(SearchFilter::Distance);
        }
        filters
    }
}
