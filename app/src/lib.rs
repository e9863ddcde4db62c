//! Jobhound command-line shell.
//!
//! Thin layer over the library crates: reads configuration and a search spec,
//! runs one aggregation or a company batch and writes flat JSON rows.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use jobhound_aggregator::{
    CompanyBatch, DuplicateReport, OrchestratorConfig, SearchOrchestrator, StatusReport,
};
use jobhound_core::company::{company_token_from_name, extract_company_token};
use jobhound_core::{AppConfig, SearchSpec, Verbosity};
use jobhound_sources::SourceRegistry;
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Multi-source job board search.
#[derive(Parser, Debug)]
#[command(name = "jobhound", version, about)]
pub struct Cli {
    /// Configuration file (defaults to the per-user config path)
    #[arg(long, short = 'c', global = true, env = "JOBHOUND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log verbosity: 0 errors, 1 warnings, 2 everything
    #[arg(long, short = 'v', global = true)]
    pub verbosity: Option<u8>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one aggregation from a spec file
    Search(SearchArgs),
    /// Run one company-scoped search per company
    Batch(BatchArgs),
    /// List the built-in sources
    Sources,
}

/// Arguments of `search`.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// TOML search spec
    pub spec: PathBuf,

    /// Write the run report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Arguments of `batch`.
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// TOML search spec used as the template for every company
    pub spec: PathBuf,

    /// Company scope tokens, in search order
    #[arg(long = "company", short = 'C')]
    pub companies: Vec<String>,

    /// Board company-page URLs such as `https://www.indeed.com/cmp/Uber`
    #[arg(long = "company-url")]
    pub company_urls: Vec<String>,

    /// Company names turned into tokens heuristically
    #[arg(long = "company-name")]
    pub company_names: Vec<String>,
}

impl BatchArgs {
    /// Resolve every company argument into a scope token: tokens first, then
    /// URLs, then names. Duplicates keep their first position.
    pub fn company_tokens(&self) -> Result<Vec<String>> {
        let mut tokens: Vec<String> = self.companies.clone();
        for url in &self.company_urls {
            let token = extract_company_token(url)
                .with_context(|| format!("no company token in URL {url}"))?;
            tokens.push(token);
        }
        for name in &self.company_names {
            let token = company_token_from_name(name)
                .with_context(|| format!("cannot derive a company token from {name:?}"))?;
            tokens.push(token);
        }

        let mut seen = HashSet::new();
        tokens.retain(|token| seen.insert(token.clone()));
        if tokens.is_empty() {
            bail!("batch needs at least one --company, --company-url or --company-name");
        }
        Ok(tokens)
    }
}

/// Run report written next to the rows.
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    run_id: &'a str,
    started_at: String,
    sources: &'a StatusReport,
    dedup: jobhound_aggregator::DedupStats,
    duplicates: DuplicateReport,
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Search(args) => {
            let (spec, spec_verbosity) = load_spec(&args.spec)?;
            init_tracing(effective_verbosity(cli.verbosity, spec_verbosity, &config)?);
            search(&config, spec, args.report.as_deref()).await
        }
        Command::Batch(args) => {
            let companies = args.company_tokens()?;
            let (spec, spec_verbosity) = load_spec(&args.spec)?;
            init_tracing(effective_verbosity(cli.verbosity, spec_verbosity, &config)?);
            info!(companies = ?companies, "Resolved company tokens");
            batch(&config, spec, &companies).await
        }
        Command::Sources => {
            let registry = SourceRegistry::with_builtin(&config);
            let mut stdout = std::io::stdout().lock();
            for id in registry.ids() {
                writeln!(stdout, "{id}")?;
            }
            Ok(())
        }
    }
}

async fn search(config: &AppConfig, spec: SearchSpec, report_path: Option<&Path>) -> Result<()> {
    let orchestrator = orchestrator(config);
    let aggregation = orchestrator
        .aggregate(spec)
        .await
        .context("search rejected")?;

    for status in aggregation.report.failed() {
        warn!(
            source = %status.source,
            records = status.records_returned,
            "Source did not complete: {}",
            status.error.as_deref().unwrap_or("unknown error")
        );
    }

    let mut stdout = std::io::stdout().lock();
    for record in &aggregation.records {
        serde_json::to_writer(&mut stdout, &record.to_row())?;
        writeln!(stdout)?;
    }

    if let Some(path) = report_path {
        let report = RunReport {
            run_id: &aggregation.run_id,
            started_at: aggregation.started_at.to_rfc3339(),
            sources: &aggregation.report,
            dedup: aggregation.dedup,
            duplicates: DuplicateReport::analyze(&aggregation.records),
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        info!("Run report written to {}", path.display());
    }

    Ok(())
}

async fn batch(config: &AppConfig, template: SearchSpec, companies: &[String]) -> Result<()> {
    let outcome = CompanyBatch::new(orchestrator(config), template)
        .run(companies)
        .await;

    for summary in &outcome.companies {
        if let Some(error) = &summary.error {
            warn!(company = %summary.company, "Company skipped: {}", error);
        }
    }
    info!(
        records = outcome.records.len(),
        duplicates_removed = outcome.duplicates_removed,
        "Batch complete"
    );

    let mut stdout = std::io::stdout().lock();
    for item in &outcome.records {
        let mut row = serde_json::to_value(item.record.to_row())?;
        if let Some(object) = row.as_object_mut() {
            object.insert("search_company".to_string(), item.search_company.clone().into());
        }
        serde_json::to_writer(&mut stdout, &row)?;
        writeln!(stdout)?;
    }
    Ok(())
}

fn orchestrator(config: &AppConfig) -> SearchOrchestrator {
    let registry = Arc::new(SourceRegistry::with_builtin(config));
    SearchOrchestrator::new(registry).with_config(OrchestratorConfig::from(config))
}

/// Load configuration from `path`, or the default location, then apply
/// environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            config.apply_env_overrides();
            config.validate()?;
            config
        }
        None => AppConfig::load_with_env().context("failed to load config")?,
    };
    Ok(config)
}

/// Parse a spec file. Also returns the verbosity when the file sets one.
pub fn load_spec(path: &Path) -> Result<(SearchSpec, Option<Verbosity>)> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read spec {}", path.display()))?;
    let spec: SearchSpec = toml::from_str(&contents)
        .with_context(|| format!("failed to parse spec {}", path.display()))?;

    let table: toml::Table = toml::from_str(&contents)?;
    let verbosity = table.contains_key("verbosity").then_some(spec.verbosity);
    Ok((spec, verbosity))
}

/// Command line first, then the spec file, then the config file.
pub fn effective_verbosity(
    flag: Option<u8>,
    spec: Option<Verbosity>,
    config: &AppConfig,
) -> Result<Verbosity> {
    if let Some(level) = flag {
        return Ok(Verbosity::try_from(level)?);
    }
    Ok(spec.unwrap_or(config.logging.verbosity))
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over `verbosity`.
fn init_tracing(verbosity: Verbosity) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
