//! Indeed adapter backed by the mobile GraphQL job search API.
//!
//! Company-scoped searches replace the keyword with a `company:<token>`
//! predicate. Pagination follows the opaque `nextCursor` token.

use crate::adapter::{Cursor, NativeRequest, NativeResponse, ParsedPage, SourceAdapter};
use crate::error::{Result, SourceError};
use crate::http::{detect_block_page, random_user_agent};
use crate::markup::{html_to_text, render_description};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use jobhound_core::normalize::{extract_emails, looks_remote};
use jobhound_core::search::QueryMode;
use jobhound_core::{
    Compensation, CompensationInterval, IndeedConfig, JobRecord, JobType, Location,
    SalarySource, SearchFilter, SearchSpec, Site, SourceCapabilities, SourceId,
};
use serde::Deserialize;
use std::fmt::Write as _;

/// Attribute key Indeed uses for remote postings.
const REMOTE_ATTRIBUTE: &str = "DSQF7";

/// Indeed GraphQL job search adapter.
pub struct IndeedAdapter {
    id: SourceId,
    config: IndeedConfig,
}

impl IndeedAdapter {
    /// Create an adapter with the given settings.
    #[must_use]
    pub fn new(config: IndeedConfig) -> Self {
        Self {
            id: Site::Indeed.source_id(),
            config,
        }
    }

    /// Render the `jobSearch` GraphQL query for one page.
    fn render_query(&self, spec: &SearchSpec, cursor: &Cursor) -> String {
        let mut args = String::new();

        match spec.query_mode() {
            QueryMode::Company(token) => {
                let _ = writeln!(args, "what: {}", graphql_string(&format!("company:{token}")));
            }
            QueryMode::Keyword(term) => {
                let _ = writeln!(args, "what: {}", graphql_string(term));
            }
            QueryMode::Unfiltered => {}
        }

        if let Some(location) = spec.location.as_deref().filter(|l| !l.trim().is_empty()) {
            let radius = spec.distance_miles.unwrap_or(self.config.radius_miles);
            let _ = writeln!(
                args,
                "location: {{where: {}, radius: {radius}, radiusUnit: MILES}}",
                graphql_string(location)
            );
        }

        if let Cursor::Token(token) = cursor {
            let _ = writeln!(args, "cursor: {}", graphql_string(token));
        }

        let _ = writeln!(args, "limit: {}", self.config.page_size);
        args.push_str("sort: RELEVANCE\n");

        if let Some(filters) = Self::render_filters(spec) {
            let _ = writeln!(args, "filters: {filters}");
        }

        format!("query GetJobData {{\n  jobSearch(\n{args}  ) {{\n{JOB_SELECTION}  }}\n}}\n")
    }

    /// Only one filter family is sent; the capability check rejects combinations.
    fn render_filters(spec: &SearchSpec) -> Option<String> {
        if let Some(hours) = spec.hours_old {
            return Some(format!(
                "{{date: {{field: \"dateOnIndeed\", start: \"{hours}h\"}}}}"
            ));
        }
        if spec.easy_apply {
            return Some(
                "{keyword: {field: \"indeedApplyScope\", keys: [\"DESKTOP\"]}}".to_string(),
            );
        }

        let mut keys = Vec::new();
        if let Some(key) = spec.job_type.and_then(job_type_key) {
            keys.push(key);
        }
        if spec.is_remote {
            keys.push(REMOTE_ATTRIBUTE);
        }
        if keys.is_empty() {
            return None;
        }
        let keys = keys
            .iter()
            .map(|k| format!("\"{k}\""))
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!(
            "{{composite: {{filters: [{{keyword: {{field: \"attributes\", keys: [{keys}]}}}}]}}}}"
        ))
    }

    fn map_job(&self, spec: &SearchSpec, job: IndeedJob) -> JobRecord {
        let key = job.key.unwrap_or_default();
        let job_url = if key.is_empty() {
            String::new()
        } else {
            format!("{}/viewjob?jk={key}", self.config.base_url)
        };

        let mut record = JobRecord::new(
            self.id.clone(),
            key,
            job.title.unwrap_or_default().trim(),
            job_url,
        );

        let html = job.description.and_then(|d| d.html).unwrap_or_default();
        let plain = html_to_text(&html);

        if let Some(employer) = job.employer {
            record.company_name = employer.name.filter(|n| !n.trim().is_empty());
            record.company_url = employer
                .relative_company_page_url
                .filter(|u| !u.is_empty())
                .map(|u| format!("{}{u}", self.config.base_url));
        }

        record.job_url_direct = job.recruit.and_then(|r| r.view_job_url);

        let formatted_location = job
            .location
            .as_ref()
            .and_then(|l| l.formatted.as_ref())
            .and_then(|f| f.long.clone())
            .unwrap_or_default();
        if let Some(location) = job.location {
            record.location = Location::new(location.city, location.admin1_code, location.country_code);
        }

        record.job_type = job
            .attributes
            .iter()
            .find_map(|a| JobType::from_label(&a.label))
            .unwrap_or_default();

        let remote_attribute = job.attributes.iter().any(|a| {
            a.key.as_deref() == Some(REMOTE_ATTRIBUTE) || a.label.to_lowercase().contains("remote")
        });
        record.is_remote =
            remote_attribute || looks_remote(&plain) || looks_remote(&formatted_location);

        record.compensation = job.compensation.and_then(map_compensation);
        record.date_posted = job.date_published.and_then(date_from_millis);
        record.emails = extract_emails(&plain);
        record.description = render_description(&html, spec.description_format);

        record
    }
}

#[async_trait]
impl SourceAdapter for IndeedAdapter {
    fn source_id(&self) -> &SourceId {
        &self.id
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::new()
            .with_company_scope()
            .with_filters([
                SearchFilter::HoursOld,
                SearchFilter::JobType,
                SearchFilter::Remote,
                SearchFilter::EasyApply,
                SearchFilter::Distance,
            ])
            .with_exclusive_group([SearchFilter::HoursOld])
            .with_exclusive_group([SearchFilter::JobType, SearchFilter::Remote])
            .with_exclusive_group([SearchFilter::EasyApply])
    }

    fn build_query(&self, spec: &SearchSpec, cursor: &Cursor) -> Result<NativeRequest> {
        if let Cursor::Offset(_) = cursor {
            return Err(SourceError::fatal(
                &self.id,
                "Indeed paginates by cursor token, not by offset",
            ));
        }

        let query = self.render_query(spec, cursor);
        Ok(
            NativeRequest::post_json(&self.config.api_url, serde_json::json!({ "query": query }))
                .with_header("accept", "application/json")
                .with_header("content-type", "application/json")
                .with_header("indeed-co", &self.config.country_code)
                .with_header("origin", &self.config.base_url)
                .with_header("referer", format!("{}/", self.config.base_url))
                .with_header("user-agent", random_user_agent()),
        )
    }

    fn parse_page(
        &self,
        spec: &SearchSpec,
        response: &NativeResponse,
        _cursor: &Cursor,
    ) -> Result<ParsedPage> {
        let payload: GraphQlResponse = match serde_json::from_str(&response.body) {
            Ok(payload) => payload,
            Err(_) if detect_block_page(&response.body) => {
                tracing::warn!(source = %self.id, "Block page detected");
                return Err(SourceError::RateLimited {
                    source_id: self.id.clone(),
                    retry_after: None,
                });
            }
            Err(e) => return Err(SourceError::fatal(&self.id, format!("invalid JSON: {e}"))),
        };

        let Some(search) = payload.data.and_then(|d| d.job_search) else {
            let message = payload
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(if message.is_empty() {
                SourceError::fatal(&self.id, "response has no jobSearch data")
            } else {
                SourceError::fatal(&self.id, format!("GraphQL error: {message}"))
            });
        };

        let mut unreadable = 0;
        let candidates: Vec<JobRecord> = search
            .results
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<SearchResult>(raw) {
                Ok(SearchResult { job: Some(job) }) => Some(self.map_job(spec, job)),
                Ok(SearchResult { job: None }) => {
                    unreadable += 1;
                    None
                }
                Err(e) => {
                    tracing::debug!(source = %self.id, "Unreadable result: {}", e);
                    unreadable += 1;
                    None
                }
            })
            .collect();

        let has_results = !candidates.is_empty() || unreadable > 0;
        let next = search
            .page_info
            .and_then(|p| p.next_cursor)
            .filter(|token| has_results && !token.is_empty())
            .map(Cursor::Token);

        let mut page = ParsedPage::from_candidates(candidates, next);
        page.dropped += unreadable;
        Ok(page)
    }
}

fn job_type_key(job_type: JobType) -> Option<&'static str> {
    match job_type {
        JobType::FullTime => Some("CF3CP"),
        JobType::PartTime => Some("75GKK"),
        JobType::Contract => Some("NJXCK"),
        JobType::Internship => Some("VDTG7"),
        JobType::Unknown => None,
    }
}

/// Quote a value as a GraphQL string literal.
fn graphql_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn date_from_millis(millis: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}

fn map_compensation(compensation: IndeedCompensation) -> Option<Compensation> {
    let (salary, currency, source) = match (compensation.base_salary, compensation.estimated) {
        (Some(base), _) => (base, compensation.currency_code, SalarySource::DirectData),
        (None, Some(estimated)) => (
            estimated.base_salary?,
            estimated.currency_code.or(compensation.currency_code),
            SalarySource::Estimated,
        ),
        (None, None) => return None,
    };

    let interval = CompensationInterval::from_unit(salary.unit_of_work.as_deref()?)?;
    let range = salary.range.unwrap_or_default();

    Some(Compensation {
        interval: Some(interval),
        min_amount: range.min,
        max_amount: range.max,
        currency,
        salary_source: Some(source),
    })
}

const JOB_SELECTION: &str = r"    pageInfo {
      nextCursor
    }
    results {
      trackingKey
      job {
        key
        title
        datePublished
        description {
          html
        }
        location {
          countryCode
          admin1Code
          city
          formatted {
            short
            long
          }
        }
        compensation {
          estimated {
            currencyCode
            baseSalary {
              unitOfWork
              range {
                ... on Range {
                  min
                  max
                }
              }
            }
          }
          baseSalary {
            unitOfWork
            range {
              ... on Range {
                min
                max
              }
            }
          }
          currencyCode
        }
        attributes {
          key
          label
        }
        employer {
          relativeCompanyPageUrl
          name
        }
        recruit {
          viewJobUrl
        }
      }
    }
";

// Indeed API types

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<SearchData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    job_search: Option<JobSearch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobSearch {
    page_info: Option<PageInfo>,
    #[serde(default)]
    results: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    job: Option<IndeedJob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndeedJob {
    key: Option<String>,
    title: Option<String>,
    date_published: Option<i64>,
    description: Option<HtmlBody>,
    location: Option<IndeedLocation>,
    compensation: Option<IndeedCompensation>,
    #[serde(default)]
    attributes: Vec<Attribute>,
    employer: Option<Employer>,
    recruit: Option<Recruit>,
}

#[derive(Debug, Deserialize)]
struct HtmlBody {
    html: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndeedLocation {
    country_code: Option<String>,
    admin1_code: Option<String>,
    city: Option<String>,
    formatted: Option<FormattedLocation>,
}

#[derive(Debug, Deserialize)]
struct FormattedLocation {
    long: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndeedCompensation {
    base_salary: Option<BaseSalary>,
    estimated: Option<EstimatedSalary>,
    currency_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EstimatedSalary {
    currency_code: Option<String>,
    base_salary: Option<BaseSalary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BaseSalary {
    unit_of_work: Option<String>,
    range: Option<SalaryRange>,
}

#[derive(Debug, Default, Deserialize)]
struct SalaryRange {
    min: Option<f64>,
    max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Attribute {
    key: Option<String>,
    #[serde(default)]
    label: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Employer {
    relative_company_page_url: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Recruit {
    view_job_url: Option<String>,
}
