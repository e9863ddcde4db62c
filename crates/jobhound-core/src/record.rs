//! The unified job record schema.
//!
//! Every source adapter maps its native postings into [`JobRecord`]. The
//! [`JobRow`] projection is the flat, stable column set handed to exporters.

use crate::error::JobsError;
use crate::types::{
    CompensationInterval, DescriptionFormat, JobType, SalarySource, SourceId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Location of a posting. Every component is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Country name or code
    pub country: Option<String>,
    /// City
    pub city: Option<String>,
    /// State, province or region
    pub state: Option<String>,
}

impl Location {
    /// Create a location from its components.
    #[must_use]
    pub fn new(
        city: Option<String>,
        state: Option<String>,
        country: Option<String>,
    ) -> Self {
        Self {
            country,
            city,
            state,
        }
    }

    /// Render as `"City, State, Country"`, skipping missing parts.
    #[must_use]
    pub fn display(&self) -> String {
        [&self.city, &self.state, &self.country]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// True when no component is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.display().is_empty()
    }
}

/// Structured compensation range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Compensation {
    /// Pay interval
    pub interval: Option<CompensationInterval>,
    /// Lower bound
    pub min_amount: Option<f64>,
    /// Upper bound
    pub max_amount: Option<f64>,
    /// ISO currency code
    pub currency: Option<String>,
    /// Where the figures came from
    pub salary_source: Option<SalarySource>,
}

/// Posting description with its format tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    /// Body format
    pub format: DescriptionFormat,
    /// Body text
    pub text: String,
}

/// One normalized job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Source that produced the record
    pub source: SourceId,
    /// Identifier of the posting inside its source
    pub native_id: String,
    /// Job title
    pub title: String,
    /// Employer name
    pub company_name: Option<String>,
    /// Employer page on the board or the employer's site
    pub company_url: Option<String>,
    /// Canonical posting URL on the board
    pub job_url: String,
    /// Direct application URL when the board exposes one
    pub job_url_direct: Option<String>,
    /// Posting location
    pub location: Location,
    /// Remote-work flag
    pub is_remote: bool,
    /// Description body
    pub description: Option<Description>,
    /// Employment type
    pub job_type: JobType,
    /// Structured compensation
    pub compensation: Option<Compensation>,
    /// Unparsed salary text as published by the source
    pub salary_text: Option<String>,
    /// Publication date
    pub date_posted: Option<NaiveDate>,
    /// Contact e-mails found in the description
    pub emails: Vec<String>,
}

impl JobRecord {
    /// Create a record with the required fields; everything else is empty.
    #[must_use]
    pub fn new(
        source: SourceId,
        native_id: impl Into<String>,
        title: impl Into<String>,
        job_url: impl Into<String>,
    ) -> Self {
        Self {
            source,
            native_id: native_id.into(),
            title: title.into(),
            company_name: None,
            company_url: None,
            job_url: job_url.into(),
            job_url_direct: None,
            location: Location::default(),
            is_remote: false,
            description: None,
            job_type: JobType::Unknown,
            compensation: None,
            salary_text: None,
            date_posted: None,
            emails: Vec::new(),
        }
    }

    /// Check the required-field invariant: native id, title and job URL are non-empty.
    pub fn validate(&self) -> Result<(), JobsError> {
        if self.native_id.trim().is_empty() {
            return Err(JobsError::Validation("record has no native id".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(JobsError::Validation(format!(
                "record {} has an empty title",
                self.native_id
            )));
        }
        if self.job_url.trim().is_empty() {
            return Err(JobsError::Validation(format!(
                "record {} has an empty job URL",
                self.native_id
            )));
        }
        Ok(())
    }

    /// The `(source, native id)` fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> (&SourceId, &str) {
        (&self.source, &self.native_id)
    }

    /// Project into the flat export row.
    #[must_use]
    pub fn to_row(&self) -> JobRow {
        let comp = self.compensation.as_ref();
        JobRow {
            id: format!("{}-{}", self.source, self.native_id),
            site: self.source.to_string(),
            job_url: self.job_url.clone(),
            job_url_direct: self.job_url_direct.clone(),
            title: self.title.clone(),
            company: self.company_name.clone(),
            company_url: self.company_url.clone(),
            location: Some(self.location.display()).filter(|l| !l.is_empty()),
            country: self.location.country.clone(),
            city: self.location.city.clone(),
            state: self.location.state.clone(),
            is_remote: self.is_remote,
            job_type: self.job_type.as_str().to_string(),
            interval: comp
                .and_then(|c| c.interval)
                .map(|i| i.as_str().to_string()),
            min_amount: comp.and_then(|c| c.min_amount),
            max_amount: comp.and_then(|c| c.max_amount),
            currency: comp.and_then(|c| c.currency.clone()),
            salary_source: comp
                .and_then(|c| c.salary_source)
                .map(|s| s.as_str().to_string()),
            date_posted: self.date_posted.map(|d| d.format("%Y-%m-%d").to_string()),
            emails: if self.emails.is_empty() {
                None
            } else {
                Some(self.emails.join(", "))
            },
            description_format: self
                .description
                .as_ref()
                .map(|d| d.format.as_str().to_string()),
            description: self.description.as_ref().map(|d| d.text.clone()),
        }
    }
}

/// Flat, stable export row. Field order matches [`JobRow::COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct JobRow {
    pub id: String,
    pub site: String,
    pub job_url: String,
    pub job_url_direct: Option<String>,
    pub title: String,
    pub company: Option<String>,
    pub company_url: Option<String>,
    pub location: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub is_remote: bool,
    pub job_type: String,
    pub interval: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub currency: Option<String>,
    pub salary_source: Option<String>,
    pub date_posted: Option<String>,
    pub emails: Option<String>,
    pub description_format: Option<String>,
    pub description: Option<String>,
}

impl JobRow {
    /// Column names in export order.
    pub const COLUMNS: [&'static str; 22] = [
        "id",
        "site",
        "job_url",
        "job_url_direct",
        "title",
        "company",
        "company_url",
        "location",
        "country",
        "city",
        "state",
        "is_remote",
        "job_type",
        "interval",
        "min_amount",
        "max_amount",
        "currency",
        "salary_source",
        "date_posted",
        "emails",
        "description_format",
        "description",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> JobRecord {
        JobRecord::new(
            SourceId::new("indeed").expect("valid source"),
            "abc123",
            "Backend Engineer",
            "https://www.indeed.com/viewjob?jk=abc123",
        )
    }

    #[test]
    fn test_validate_required_fields() {
        assert!(record().validate().is_ok());

        let mut missing_title = record();
        missing_title.title = "   ".to_string();
        assert!(missing_title.validate().is_err());

        let mut missing_url = record();
        missing_url.job_url = String::new();
        assert!(missing_url.validate().is_err());

        let mut missing_id = record();
        missing_id.native_id = String::new();
        assert!(missing_id.validate().is_err());
    }

    #[test]
    fn test_location_display() {
        let loc = Location::new(
            Some("Seattle".to_string()),
            Some("WA".to_string()),
            Some("US".to_string()),
        );
        assert_eq!(loc.display(), "Seattle, WA, US");
        assert_eq!(
            Location::new(None, Some("CA".to_string()), None).display(),
            "CA"
        );
        assert!(Location::default().is_empty());
    }

    #[test]
    fn test_row_projection() {
        let mut rec = record();
        rec.company_name = Some("Uber".to_string());
        rec.compensation = Some(Compensation {
            interval: Some(CompensationInterval::Yearly),
            min_amount: Some(120_000.0),
            max_amount: Some(160_000.0),
            currency: Some("USD".to_string()),
            salary_source: Some(SalarySource::DirectData),
        });
        rec.emails = vec!["jobs@uber.com".to_string(), "hr@uber.com".to_string()];
        rec.date_posted = NaiveDate::from_ymd_opt(2025, 3, 14);

        let row = rec.to_row();
        assert_eq!(row.id, "indeed-abc123");
        assert_eq!(row.site, "indeed");
        assert_eq!(row.interval.as_deref(), Some("yearly"));
        assert_eq!(row.salary_source.as_deref(), Some("direct_data"));
        assert_eq!(row.emails.as_deref(), Some("jobs@uber.com, hr@uber.com"));
        assert_eq!(row.date_posted.as_deref(), Some("2025-03-14"));
        assert_eq!(row.location, None);
        assert_eq!(row.job_type, "unknown");
    }

    #[test]
    fn test_row_columns_match_serialized_fields() {
        let value = serde_json::to_value(record().to_row()).expect("serialize row");
        let object = value.as_object().expect("row is an object");
        assert_eq!(object.len(), JobRow::COLUMNS.len());
        for column in JobRow::COLUMNS {
            assert!(object.contains_key(column), "missing column {column}");
        }
    }
}
