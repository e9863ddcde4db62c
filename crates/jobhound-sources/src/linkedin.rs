//! `LinkedIn` adapter backed by the public guest job search pages.
//!
//! The guest endpoint returns HTML job cards and paginates by numeric start
//! offset. Company scope is only expressible as numeric company ids.

use crate::adapter::{Cursor, NativeRequest, NativeResponse, ParsedPage, SourceAdapter};
use crate::error::{Result, SourceError};
use crate::http::{detect_block_page, random_user_agent};
use async_trait::async_trait;
use chrono::NaiveDate;
use jobhound_core::normalize::{looks_remote, parse_compensation};
use jobhound_core::search::QueryMode;
use jobhound_core::{
    Compensation, JobRecord, JobType, LinkedInConfig, Location, SalarySource, SearchFilter,
    SearchSpec, Site, SourceCapabilities, SourceId,
};
use scraper::{ElementRef, Html, Selector};

const SEARCH_PATH: &str = "/jobs-guest/jobs/api/seeMoreJobPostings/search";

/// `LinkedIn` guest job search adapter.
pub struct LinkedInAdapter {
    id: SourceId,
    config: LinkedInConfig,
}

struct CardSelectors {
    card: Selector,
    title: Selector,
    company: Selector,
    company_link: Selector,
    location: Selector,
    time: Selector,
    salary: Selector,
}

impl LinkedInAdapter {
    /// Create an adapter with the given settings.
    #[must_use]
    pub fn new(config: LinkedInConfig) -> Self {
        Self {
            id: Site::LinkedIn.source_id(),
            config,
        }
    }

    fn selector(&self, css: &str) -> Result<Selector> {
        Selector::parse(css)
            .map_err(|e| SourceError::fatal(&self.id, format!("invalid selector '{css}': {e}")))
    }

    fn selectors(&self) -> Result<CardSelectors> {
        Ok(CardSelectors {
            card: self.selector("div.base-search-card")?,
            title: self.selector("h3.base-search-card__title")?,
            company: self.selector("h4.base-search-card__subtitle")?,
            company_link: self.selector("h4.base-search-card__subtitle a")?,
            location: self.selector("span.job-search-card__location")?,
            time: self.selector("time")?,
            salary: self.selector("span.job-search-card__salary-info")?,
        })
    }

    fn parse_card(
        &self,
        spec: &SearchSpec,
        card: &ElementRef,
        selectors: &CardSelectors,
    ) -> JobRecord {
        let native_id = card
            .value()
            .attr("data-entity-urn")
            .and_then(|urn| urn.rsplit(':').next())
            .unwrap_or_default()
            .to_string();
        let job_url = if native_id.is_empty() {
            String::new()
        } else {
            format!("{}/jobs/view/{native_id}", self.config.base_url)
        };
        let title = first_text(card, &selectors.title).unwrap_or_default();

        let mut record = JobRecord::new(self.id.clone(), native_id, title, job_url);

        record.company_name = first_text(card, &selectors.company);
        record.company_url = card
            .select(&selectors.company_link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| href.split('?').next().unwrap_or(href).to_string());

        let location_text = first_text(card, &selectors.location).unwrap_or_default();
        record.location = parse_location(&location_text);

        record.date_posted = card
            .select(&selectors.time)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok());

        record.salary_text = first_text(card, &selectors.salary);
        record.compensation = record.salary_text.as_deref().and_then(parse_card_salary);

        record.job_type = spec.job_type.unwrap_or_default();
        record.is_remote =
            spec.is_remote || looks_remote(&location_text) || looks_remote(&record.title);

        record
    }
}

#[async_trait]
impl SourceAdapter for LinkedInAdapter {
    fn source_id(&self) -> &SourceId {
        &self.id
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::new()
            .with_company_scope()
            .with_native_offset()
            .with_filters([
                SearchFilter::HoursOld,
                SearchFilter::JobType,
                SearchFilter::Remote,
                SearchFilter::EasyApply,
                SearchFilter::Distance,
            ])
            .with_exclusive_group([SearchFilter::HoursOld])
            .with_exclusive_group([SearchFilter::EasyApply])
    }

    fn check_capabilities(&self, spec: &SearchSpec) -> Result<()> {
        self.capabilities()
            .check(spec)
            .map_err(|violation| SourceError::CapabilityUnsupported {
                source_id: self.id.clone(),
                reason: violation.to_string(),
            })?;

        if let QueryMode::Company(token) = spec.query_mode() {
            if company_ids(token).is_none() {
                return Err(SourceError::CapabilityUnsupported {
                    source_id: self.id.clone(),
                    reason: format!(
                        "company scope must be numeric company ids separated by commas, got '{token}'"
                    ),
                });
            }
        }
        Ok(())
    }

    fn build_query(&self, spec: &SearchSpec, cursor: &Cursor) -> Result<NativeRequest> {
        let start = match cursor {
            Cursor::Start => 0,
            Cursor::Offset(start) => *start,
            Cursor::Token(_) => {
                return Err(SourceError::fatal(
                    &self.id,
                    "LinkedIn paginates by offset, not by token",
                ))
            }
        };

        let mut request = NativeRequest::get(format!("{}{SEARCH_PATH}", self.config.base_url))
            .with_header("accept", "text/html,application/xhtml+xml")
            .with_header("accept-language", "en-US,en;q=0.9")
            .with_header("user-agent", random_user_agent());

        match spec.query_mode() {
            QueryMode::Company(token) => {
                let ids = company_ids(token).ok_or_else(|| SourceError::CapabilityUnsupported {
                    source_id: self.id.clone(),
                    reason: format!("company scope '{token}' is not a numeric company id list"),
                })?;
                request = request.with_query("f_C", ids);
            }
            QueryMode::Keyword(term) => request = request.with_query("keywords", term),
            QueryMode::Unfiltered => {}
        }

        if let Some(location) = spec.location.as_deref().filter(|l| !l.trim().is_empty()) {
            request = request.with_query("location", location);
        }
        if let Some(distance) = spec.distance_miles {
            request = request.with_query("distance", distance);
        }
        if spec.is_remote {
            request = request.with_query("f_WT", 2);
        }
        if let Some(code) = spec.job_type.and_then(job_type_code) {
            request = request.with_query("f_JT", code);
        }
        if let Some(hours) = spec.hours_old {
            request = request.with_query("f_TPR", format!("r{}", u64::from(hours) * 3600));
        }
        if spec.easy_apply {
            request = request.with_query("f_AL", "true");
        }

        Ok(request.with_query("start", start))
    }

    fn parse_page(
        &self,
        spec: &SearchSpec,
        response: &NativeResponse,
        cursor: &Cursor,
    ) -> Result<ParsedPage> {
        let start = match cursor {
            Cursor::Offset(start) => *start,
            Cursor::Start | Cursor::Token(_) => 0,
        };
        let selectors = self.selectors()?;
        let document = Html::parse_document(&response.body);

        let candidates: Vec<JobRecord> = document
            .select(&selectors.card)
            .map(|card| self.parse_card(spec, &card, &selectors))
            .collect();

        if candidates.is_empty() {
            if detect_block_page(&response.body) {
                tracing::warn!(source = %self.id, "Block page detected");
                return Err(SourceError::RateLimited {
                    source_id: self.id.clone(),
                    retry_after: None,
                });
            }
            return Ok(ParsedPage::default());
        }

        let next_start = start + candidates.len();
        let next = (next_start <= self.config.max_start).then_some(Cursor::Offset(next_start));
        Ok(ParsedPage::from_candidates(candidates, next))
    }
}

fn first_text(element: &ElementRef, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|text| jobhound_core::normalize::collapse_whitespace(&text))
        .filter(|text| !text.is_empty())
}

/// Normalize a company scope into a comma-separated numeric id list.
fn company_ids(token: &str) -> Option<String> {
    let ids: Vec<&str> = token
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();
    let numeric = !ids.is_empty() && ids.iter().all(|id| id.chars().all(|c| c.is_ascii_digit()));
    numeric.then(|| ids.join(","))
}

fn job_type_code(job_type: JobType) -> Option<&'static str> {
    match job_type {
        JobType::FullTime => Some("F"),
        JobType::PartTime => Some("P"),
        JobType::Internship => Some("I"),
        JobType::Contract => Some("C"),
        JobType::Unknown => None,
    }
}

/// `"City, State, Country"`, `"City, State"` or a single area name.
fn parse_location(text: &str) -> Location {
    let parts: Vec<String> = text
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(ToString::to_string)
        .collect();
    match parts.as_slice() {
        [city, state, country] => {
            Location::new(Some(city.clone()), Some(state.clone()), Some(country.clone()))
        }
        [city, state] => Location::new(Some(city.clone()), Some(state.clone()), None),
        [area] => Location::new(Some(area.clone()), None, None),
        _ => Location::default(),
    }
}

/// Card salaries carry no interval; large figures are annual, small ones hourly.
fn parse_card_salary(text: &str) -> Option<Compensation> {
    if let Some(comp) = parse_compensation(text, SalarySource::DirectData) {
        return Some(comp);
    }
    let yearly = parse_compensation(&format!("{text} per year"), SalarySource::DirectData)?;
    if yearly.min_amount.is_some_and(|min| min >= 1000.0) {
        Some(yearly)
    } else {
        parse_compensation(&format!("{text} per hour"), SalarySource::DirectData)
    }
}
