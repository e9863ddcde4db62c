//! Jobhound Core - Foundation crate for the Jobhound job aggregator.
//!
//! This crate provides the unified job record schema, the caller-facing search
//! specification, source capability declarations, text normalization helpers,
//! configuration management and error types that all other Jobhound crates
//! depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes and enums (`SourceId`, `Site`, `JobType`, `Verbosity`)
//! - [`record`] - The unified `JobRecord` schema and its flat export row
//! - [`search`] - The immutable `SearchSpec` submitted by callers
//! - [`capabilities`] - Per-source filter capabilities and exclusivity rules
//! - [`company`] - Company-scope token helpers
//! - [`normalize`] - Compensation, e-mail and remote-work text normalization
//!
//! # Example
//!
//! ```rust
//! use jobhound_core::{SearchSpec, SourceId};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = SearchSpec::new(vec![SourceId::new("indeed")?])
//!     .with_company_scope("Uber")
//!     .with_results_wanted(50);
//! spec.validate()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod capabilities;
pub mod company;
pub mod config;
pub mod error;
pub mod normalize;
pub mod record;
pub mod search;
pub mod types;

// Re-export commonly used types
pub use capabilities::{CapabilityViolation, SearchFilter, SourceCapabilities};
pub use config::{
    AppConfig, IndeedConfig, LinkedInConfig, LoggingConfig, ProxyConfig, RateLimitConfig,
    ScrapingConfig,
};
pub use error::{ConfigError, ConfigResult, JobsError, Result};
pub use record::{Compensation, Description, JobRecord, JobRow, Location};
pub use search::{QueryMode, SearchSpec};
pub use types::{
    CompensationInterval, DescriptionFormat, JobType, SalarySource, Site, SourceId, Verbosity,
};
