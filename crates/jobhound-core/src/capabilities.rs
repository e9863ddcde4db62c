//! Source capability declarations.
//!
//! Each source adapter declares which search filters it understands and which
//! of them its board refuses to combine. The rules live with the adapter so the
//! orchestrator never hard-codes per-board constraints.

use crate::search::SearchSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// A search filter a spec can activate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFilter {
    /// Company-scoped query instead of a keyword query
    CompanyScope,
    /// Recency window
    HoursOld,
    /// Employment type
    JobType,
    /// Remote-only
    Remote,
    /// On-board application only
    EasyApply,
    /// Radius around the location
    Distance,
}

impl SearchFilter {
    /// Get the spec field name this filter corresponds to.
    #[must_use]
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::CompanyScope => "company_scope",
            Self::HoursOld => "hours_old",
            Self::JobType => "job_type",
            Self::Remote => "is_remote",
            Self::EasyApply => "easy_apply",
            Self::Distance => "distance_miles",
        }
    }
}

/// Reasons a spec cannot be served by a source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityViolation {
    /// The source has no company-scoped query form
    #[error("company-scoped queries are not supported")]
    CompanyScopeUnsupported,

    /// Two mutually exclusive filter groups are active at once
    #[error("filters {first:?} cannot be combined with {second:?}")]
    ExclusiveFilters {
        /// Active filters of the first group
        first: Vec<SearchFilter>,
        /// Active filters of the conflicting group
        second: Vec<SearchFilter>,
    },
}

/// What a source adapter can do with a [`SearchSpec`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCapabilities {
    /// Supports company-scoped queries
    pub company_scope: bool,
    /// Paginates by numeric offset, so a spec offset can seed the cursor
    pub native_offset: bool,
    /// Filters forwarded to the board; others are ignored
    pub supported_filters: HashSet<SearchFilter>,
    /// Filter groups of which at most one may be active
    pub exclusive_filters: Vec<Vec<SearchFilter>>,
}

impl SourceCapabilities {
    /// Capabilities with nothing supported.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare company-scope support.
    #[must_use]
    pub fn with_company_scope(mut self) -> Self {
        self.company_scope = true;
        self.supported_filters.insert(SearchFilter::CompanyScope);
        self
    }

    /// Declare native offset pagination.
    #[must_use]
    pub fn with_native_offset(mut self) -> Self {
        self.native_offset = true;
        self
    }

    /// Declare supported filters.
    #[must_use]
    pub fn with_filters(mut self, filters: impl IntoIterator<Item = SearchFilter>) -> Self {
        self.supported_filters.extend(filters);
        self
    }

    /// Declare a group of filters that excludes every other declared group.
    #[must_use]
    pub fn with_exclusive_group(mut self, group: impl IntoIterator<Item = SearchFilter>) -> Self {
        self.exclusive_filters.push(group.into_iter().collect());
        self
    }

    /// Check whether a spec can be served.
    ///
    /// # Errors
    /// Returns the first violation found.
    pub fn check(&self, spec: &SearchSpec) -> Result<(), CapabilityViolation> {
        let active: HashSet<SearchFilter> = spec.active_filters().into_iter().collect();

        if active.contains(&SearchFilter::CompanyScope) && !self.company_scope {
            return Err(CapabilityViolation::CompanyScopeUnsupported);
        }

        let active_groups: Vec<Vec<SearchFilter>> = self
            .exclusive_filters
            .iter()
            .map(|group| {
                group
                    .iter()
                    .copied()
                    .filter(|f| active.contains(f))
                    .collect::<Vec<_>>()
            })
            .filter(|hits| !hits.is_empty())
            .collect();

        if let [first, second, ..] = active_groups.as_slice() {
            return Err(CapabilityViolation::ExclusiveFilters {
                first: first.clone(),
                second: second.clone(),
            });
        }

        Ok(())
    }

    /// Active filters the source will not forward to its board.
    #[must_use]
    pub fn ignored_filters(&self, spec: &SearchSpec) -> Vec<SearchFilter> {
        spec.active_filters()
            .into_iter()
            .filter(|f| !self.supported_filters.contains(f))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JobType, SourceId};

    fn spec() -> SearchSpec {
        SearchSpec::new(vec![SourceId::new("board").expect("valid source")])
    }

    fn indeed_like() -> SourceCapabilities {
        SourceCapabilities::new()
            .with_company_scope()
            .with_filters([
                SearchFilter::HoursOld,
                SearchFilter::JobType,
                SearchFilter::Remote,
            ])
            .with_exclusive_group([SearchFilter::HoursOld])
            .with_exclusive_group([SearchFilter::JobType, SearchFilter::Remote])
            .with_exclusive_group([SearchFilter::EasyApply])
    }

    #[test]
    fn test_company_scope_unsupported() {
        let caps = SourceCapabilities::new();
        let err = caps
            .check(&spec().with_company_scope("Uber"))
            .expect_err("scope must be rejected");
        assert_eq!(err, CapabilityViolation::CompanyScopeUnsupported);
    }

    #[test]
    fn test_company_scope_composes_with_recency() {
        let caps = indeed_like();
        assert!(caps
            .check(&spec().with_company_scope("Uber").with_hours_old(24))
            .is_ok());
    }

    #[test]
    fn test_exclusive_groups_conflict() {
        let caps = indeed_like();
        let conflicting = spec().with_hours_old(24).with_job_type(JobType::FullTime);
        match caps.check(&conflicting) {
            Err(CapabilityViolation::ExclusiveFilters { first, second }) => {
                assert_eq!(first, vec![SearchFilter::HoursOld]);
                assert_eq!(second, vec![SearchFilter::JobType]);
            }
            other => panic!("expected exclusive filter violation, got {other:?}"),
        }

        // Filters inside one group combine freely.
        let same_group = spec().with_job_type(JobType::FullTime).with_remote(true);
        assert!(caps.check(&same_group).is_ok());
    }

    #[test]
    fn test_ignored_filters() {
        let caps = SourceCapabilities::new().with_filters([SearchFilter::Remote]);
        let s = spec().with_remote(true).with_hours_old(12);
        assert_eq!(caps.ignored_filters(&s), vec![SearchFilter::HoursOld]);
    }
}
