//! Configuration management for Jobhound.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Verbosity;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/jobhound/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Run-level scraping settings
    pub scraping: ScrapingConfig,
    /// Per-source pacing and retry policy
    pub rate_limit: RateLimitConfig,
    /// Default proxies
    pub proxies: ProxyConfig,
    /// Indeed adapter settings
    pub indeed: IndeedConfig,
    /// `LinkedIn` adapter settings
    pub linkedin: LinkedInConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, falling back to defaults if absent.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `JOBHOUND_TIMEOUT_SECS`: Override the overall run timeout
    /// - `JOBHOUND_PROXIES`: Comma-separated default proxy list
    /// - `JOBHOUND_VERBOSITY`: Override default verbosity (0, 1 or 2)
    /// - `JOBHOUND_MAX_RETRIES`: Override transient retry count
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `JOBHOUND_*` environment overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("JOBHOUND_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.scraping.overall_timeout_secs = secs;
                tracing::debug!("Override scraping.overall_timeout_secs from env: {}", secs);
            }
        }

        if let Ok(val) = std::env::var("JOBHOUND_PROXIES") {
            self.proxies.proxies = val
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(ToString::to_string)
                .collect();
            tracing::debug!(
                "Override proxies from env: {} entries",
                self.proxies.proxies.len()
            );
        }

        if let Ok(val) = std::env::var("JOBHOUND_VERBOSITY") {
            if let Some(level) = val
                .parse::<u8>()
                .ok()
                .and_then(|v| Verbosity::try_from(v).ok())
            {
                self.logging.verbosity = level;
                tracing::debug!("Override logging.verbosity from env: {:?}", level);
            }
        }

        if let Ok(val) = std::env::var("JOBHOUND_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.rate_limit.max_retries = retries;
                tracing::debug!("Override rate_limit.max_retries from env: {}", retries);
            }
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.rate_limit.max_backoff_ms < self.rate_limit.initial_backoff_ms {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.max_backoff_ms".to_string(),
                reason: format!(
                    "must be >= initial_backoff_ms ({})",
                    self.rate_limit.initial_backoff_ms
                ),
            });
        }
        if self.indeed.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "indeed.page_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.scraping.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scraping.request_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/jobhound/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "jobhound", "jobhound").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Run-level scraping settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Deadline for a whole aggregation run in seconds (0 = no deadline)
    pub overall_timeout_secs: u64,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Default for cross-source soft de-duplication when a spec doesn't say
    pub cross_source_dedup: bool,
}

impl ScrapingConfig {
    /// Overall deadline, if any.
    #[must_use]
    pub fn overall_timeout(&self) -> Option<Duration> {
        (self.overall_timeout_secs > 0).then(|| Duration::from_secs(self.overall_timeout_secs))
    }

    /// Per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            overall_timeout_secs: 300,
            request_timeout_secs: 10,
            cross_source_dedup: false,
        }
    }
}

/// Per-source pacing and retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Minimum delay between consecutive requests of one source
    pub min_interval_ms: u64,
    /// First backoff delay after a failure
    pub initial_backoff_ms: u64,
    /// Backoff ceiling
    pub max_backoff_ms: u64,
    /// Retries per page for transient network failures
    pub max_retries: u32,
    /// Retries per page for rate-limit signals
    pub max_rate_limit_retries: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 500,
            initial_backoff_ms: 2000,
            max_backoff_ms: 60_000,
            max_retries: 3,
            max_rate_limit_retries: 3,
        }
    }
}

/// Default proxy list, used when a search spec supplies none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy connection strings (`user:pass@host:port`, `http://host:port`, `localhost`)
    pub proxies: Vec<String>,
}

/// Indeed adapter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndeedConfig {
    /// GraphQL endpoint
    pub api_url: String,
    /// Site root used to build job and company URLs
    pub base_url: String,
    /// Two-letter market code sent as `indeed-co`
    pub country_code: String,
    /// Results requested per page
    pub page_size: usize,
    /// Default search radius in miles
    pub radius_miles: u32,
}

impl Default for IndeedConfig {
    fn default() -> Self {
        Self {
            api_url: "https://apis.indeed.com/graphql".to_string(),
            base_url: "https://www.indeed.com".to_string(),
            country_code: "US".to_string(),
            page_size: 100,
            radius_miles: 50,
        }
    }
}

/// `LinkedIn` adapter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkedInConfig {
    /// Site root
    pub base_url: String,
    /// The board stops serving results beyond this start offset
    pub max_start: usize,
}

impl Default for LinkedInConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.linkedin.com".to_string(),
            max_start: 1000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Verbosity used when a spec doesn't override it
    pub verbosity: Verbosity,
}
