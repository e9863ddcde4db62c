//! Shared types used across Jobhound.
//!
//! This module defines the source identifier newtype and the closed enums of
//! the unified job schema.

use crate::error::JobsError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Newtype for job-board source identifiers with validation.
///
/// Source IDs are 1-32 ASCII alphanumeric characters, hyphens or underscores,
/// starting with an alphanumeric character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceId(String);

impl SourceId {
    /// Create a new `SourceId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID doesn't match the required format.
    pub fn new(id: impl Into<String>) -> Result<Self, JobsError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), JobsError> {
        static SOURCE_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = SOURCE_REGEX
            .get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,31}$").expect("valid regex"));

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(JobsError::Validation(format!(
                "invalid source ID: must be 1-32 alphanumeric characters, hyphens or underscores, got '{id}'"
            )))
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SourceId {
    type Error = JobsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SourceId> for String {
    fn from(id: SourceId) -> Self {
        id.0
    }
}

/// Job boards with a built-in adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    /// Indeed GraphQL job search
    Indeed,
    /// `LinkedIn` guest job search
    LinkedIn,
}

impl Site {
    /// All built-in sites.
    pub const ALL: [Site; 2] = [Site::Indeed, Site::LinkedIn];

    /// Get the canonical identifier string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indeed => "indeed",
            Self::LinkedIn => "linkedin",
        }
    }

    /// Get the source identifier for this site.
    #[must_use]
    pub fn source_id(&self) -> SourceId {
        SourceId(self.as_str().to_string())
    }
}

/// Employment type of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    /// Full-time position
    FullTime,
    /// Part-time position
    PartTime,
    /// Internship
    Internship,
    /// Contract or temporary position
    Contract,
    /// Not stated by the source
    #[default]
    Unknown,
}

impl JobType {
    /// Get the flat-schema string value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullTime => "fulltime",
            Self::PartTime => "parttime",
            Self::Internship => "internship",
            Self::Contract => "contract",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a board attribute label such as `"Full-time"` or `"Part time"`.
    ///
    /// Dashes and spaces are removed and the label is lowercased before matching.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let key: String = label
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        match key.as_str() {
            "fulltime" => Some(Self::FullTime),
            "parttime" => Some(Self::PartTime),
            "internship" | "intern" => Some(Self::Internship),
            "contract" | "contractor" | "temporary" => Some(Self::Contract),
            _ => None,
        }
    }
}

/// Pay interval of a compensation range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompensationInterval {
    /// Per year
    Yearly,
    /// Per month
    Monthly,
    /// Per week
    Weekly,
    /// Per day
    Daily,
    /// Per hour
    Hourly,
}

impl CompensationInterval {
    /// Get the flat-schema string value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yearly => "yearly",
            Self::Monthly => "monthly",
            Self::Weekly => "weekly",
            Self::Daily => "daily",
            Self::Hourly => "hourly",
        }
    }

    /// Map a board "unit of work" code (`YEAR`, `MONTH`, `WEEK`, `DAY`, `HOUR`).
    #[must_use]
    pub fn from_unit(unit: &str) -> Option<Self> {
        match unit.to_ascii_uppercase().as_str() {
            "YEAR" => Some(Self::Yearly),
            "MONTH" => Some(Self::Monthly),
            "WEEK" => Some(Self::Weekly),
            "DAY" => Some(Self::Daily),
            "HOUR" => Some(Self::Hourly),
            _ => None,
        }
    }
}

/// Provenance of a compensation value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalarySource {
    /// Structured salary data published by the source
    DirectData,
    /// Salary estimated by the source
    Estimated,
    /// Parsed from the posting description
    Description,
}

impl SalarySource {
    /// Get the flat-schema string value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectData => "direct_data",
            Self::Estimated => "estimated",
            Self::Description => "description",
        }
    }
}

/// Format tag carried by a description body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionFormat {
    /// Raw HTML as returned by the source
    #[default]
    Html,
    /// Tags stripped, whitespace collapsed
    Plain,
}

impl DescriptionFormat {
    /// Get the flat-schema string value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Plain => "plain",
        }
    }
}

/// Output verbosity level: 0 = errors only, 1 = errors and warnings, 2 = all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Verbosity {
    /// Errors only
    Errors,
    /// Errors and warnings
    Warnings,
    /// Everything
    #[default]
    All,
}

impl Verbosity {
    /// Tracing filter directive for this verbosity level.
    #[must_use]
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Self::Errors => "error",
            Self::Warnings => "warn",
            Self::All => "info,jobhound=debug",
        }
    }
}

impl TryFrom<u8> for Verbosity {
    type Error = JobsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Errors),
            1 => Ok(Self::Warnings),
            2 => Ok(Self::All),
            other => Err(JobsError::Validation(format!(
                "verbosity must be 0, 1 or 2, got {other}"
            ))),
        }
    }
}

impl From<Verbosity> for u8 {
    fn from(v: Verbosity) -> Self {
        match v {
            Verbosity::Errors => 0,
            Verbosity::Warnings => 1,
            Verbosity::All => 2,
        }
    }
}
