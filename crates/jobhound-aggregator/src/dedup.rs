//! Record normalization and de-duplication.
//!
//! Exact duplicates share a `(source, native id)` fingerprint. The optional
//! cross-source pass drops records whose job URL host and path, or whose
//! normalized title, company and location, was already seen from another
//! source. The first occurrence always wins, so applying the pass to its own
//! output changes nothing.

use jobhound_core::normalize::{
    collapse_whitespace, extract_emails, normalize_key, parse_compensation,
};
use jobhound_core::{JobRecord, SalarySource, SourceId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Counts from one de-duplication pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    /// Records in
    pub input: usize,
    /// Removed as exact `(source, native id)` duplicates
    pub exact_duplicates: usize,
    /// Removed by the cross-source heuristic
    pub cross_source_duplicates: usize,
    /// Records out
    pub output: usize,
}

/// Normalizes records and removes duplicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deduplicator {
    cross_source: bool,
}

impl Deduplicator {
    /// Create a deduplicator; `cross_source` enables the soft heuristic.
    #[must_use]
    pub fn new(cross_source: bool) -> Self {
        Self { cross_source }
    }

    /// Normalize then de-duplicate, preserving the order of survivors.
    #[must_use]
    pub fn run(&self, records: Vec<JobRecord>) -> (Vec<JobRecord>, DedupStats) {
        let mut stats = DedupStats {
            input: records.len(),
            ..DedupStats::default()
        };

        let mut fingerprints: HashSet<(SourceId, String)> = HashSet::new();
        let mut soft_owners: HashMap<String, SourceId> = HashMap::new();
        let mut kept = Vec::with_capacity(records.len());

        for mut record in records {
            if !fingerprints.insert((record.source.clone(), record.native_id.clone())) {
                stats.exact_duplicates += 1;
                continue;
            }

            normalize(&mut record);

            if self.cross_source {
                let keys = soft_keys(&record);
                let seen_elsewhere = keys.iter().any(|key| {
                    soft_owners
                        .get(key)
                        .is_some_and(|owner| owner != &record.source)
                });
                if seen_elsewhere {
                    tracing::debug!(
                        source = %record.source,
                        native_id = %record.native_id,
                        "Dropping cross-source duplicate"
                    );
                    stats.cross_source_duplicates += 1;
                    continue;
                }
                for key in keys {
                    soft_owners
                        .entry(key)
                        .or_insert_with(|| record.source.clone());
                }
            }

            kept.push(record);
        }

        stats.output = kept.len();
        (kept, stats)
    }
}

/// Fill derived fields and tidy text in place.
///
/// Compensation is parsed from the salary text, then from the description;
/// e-mails are extracted from the description when missing.
pub fn normalize(record: &mut JobRecord) {
    record.title = collapse_whitespace(&record.title);
    if let Some(company) = record.company_name.take() {
        let company = collapse_whitespace(&company);
        record.company_name = (!company.is_empty()).then_some(company);
    }

    if record.compensation.is_none() {
        record.compensation = record
            .salary_text
            .as_deref()
            .and_then(|text| parse_compensation(text, SalarySource::DirectData))
            .or_else(|| {
                record
                    .description
                    .as_ref()
                    .and_then(|d| parse_compensation(&d.text, SalarySource::Description))
            });
    }

    if record.emails.is_empty() {
        if let Some(description) = &record.description {
            record.emails = extract_emails(&description.text);
        }
    }
}

/// Heuristic keys shared by the same posting on different boards.
fn soft_keys(record: &JobRecord) -> Vec<String> {
    let mut keys = Vec::new();

    let urls = std::iter::once(record.job_url.as_str()).chain(record.job_url_direct.as_deref());
    for key in urls.filter_map(url_key) {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    if let Some(company) = record.company_name.as_deref() {
        let company = normalize_key(company);
        let title = normalize_key(&record.title);
        if !company.is_empty() && !title.is_empty() {
            keys.push(format!(
                "job:{title}|{company}|{}|{}",
                normalize_key(record.location.city.as_deref().unwrap_or_default()),
                normalize_key(record.location.state.as_deref().unwrap_or_default()),
            ));
        }
    }

    keys
}

/// Host and path of a URL. The host is lowercased, the path kept as is.
fn url_key(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw.trim()).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(format!("url:{host}{}", parsed.path()))
}

/// Non-destructive duplicate analysis of a result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DuplicateReport {
    /// Records analyzed
    pub total: usize,
    /// Records whose direct job URL appeared earlier
    pub direct_url_duplicates: usize,
    /// Distinct direct job URLs
    pub unique_direct_urls: usize,
    /// Records whose title and location appeared earlier
    pub title_location_duplicates: usize,
    /// Distinct title and location pairs
    pub unique_title_locations: usize,
}

impl DuplicateReport {
    /// Count duplicates without removing anything.
    #[must_use]
    pub fn analyze(records: &[JobRecord]) -> Self {
        let mut urls = HashSet::new();
        let mut title_locations = HashSet::new();
        let mut report = Self {
            total: records.len(),
            ..Self::default()
        };

        for record in records {
            if let Some(url) = record.job_url_direct.as_deref() {
                if !urls.insert(url) {
                    report.direct_url_duplicates += 1;
                }
            }
            if !title_locations.insert((record.title.as_str(), record.location.display())) {
                report.title_location_duplicates += 1;
            }
        }

        report.unique_direct_urls = urls.len();
        report.unique_title_locations = title_locations.len();
        report
    }

    /// Share of records with a duplicated direct URL, in percent.
    #[must_use]
    pub fn direct_url_rate(&self) -> f64 {
        percent(self.direct_url_duplicates, self.total)
    }

    /// Share of records with a duplicated title and location, in percent.
    #[must_use]
    pub fn title_location_rate(&self) -> f64 {
        percent(self.title_location_duplicates, self.total)
    }

    /// True when neither check found a duplicate.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.direct_url_duplicates == 0 && self.title_location_duplicates == 0
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
