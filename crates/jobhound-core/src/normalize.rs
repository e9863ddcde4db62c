//! Text normalization shared by adapters and the de-duplicator.
//!
//! Compensation strings are coerced into [`Compensation`] using an explicit set
//! of interval keywords; anything that does not parse yields `None`.

use crate::record::Compensation;
use crate::types::{CompensationInterval, SalarySource};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Description phrases that mark a posting as remote.
const REMOTE_INDICATORS: &[&str] = &[
    "remote",
    "work from home",
    "wfh",
    "telecommute",
    "virtual",
    "distributed",
    "anywhere",
    "location independent",
];

fn interval_patterns() -> &'static [(CompensationInterval, Regex)] {
    static PATTERNS: OnceLock<Vec<(CompensationInterval, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (
                CompensationInterval::Hourly,
                r"\bhourly\b|\bper\s+hour\b|\ban\s+hour\b|/\s*(?:hr|hour)\b",
            ),
            (
                CompensationInterval::Daily,
                r"\bdaily\b|\bper\s+day\b|\ba\s+day\b|/\s*day\b",
            ),
            (
                CompensationInterval::Weekly,
                r"\bweekly\b|\bper\s+week\b|\ba\s+week\b|/\s*(?:wk|week)\b",
            ),
            (
                CompensationInterval::Monthly,
                r"\bmonthly\b|\bper\s+month\b|\ba\s+month\b|/\s*(?:mo|month)\b",
            ),
            (
                CompensationInterval::Yearly,
                r"\byearly\b|\bannual(?:ly)?\b|\bper\s+(?:year|annum)\b|\ba\s+year\b|/\s*(?:yr|year)\b",
            ),
        ]
        .into_iter()
        .map(|(interval, pattern)| {
            (
                interval,
                Regex::new(&format!("(?i){pattern}")).expect("valid regex"),
            )
        })
        .collect()
    })
}

fn amount_regex() -> &'static Regex {
    static AMOUNT: OnceLock<Regex> = OnceLock::new();
    AMOUNT.get_or_init(|| {
        Regex::new(
            r"(?i)(?P<cur>[$£€₹])\s*(?P<min>\d[\d,]*(?:\.\d+)?)\s*(?P<mink>k\b)?(?:\s*(?:-|–|—|to)\s*[$£€₹]?\s*(?P<max>\d[\d,]*(?:\.\d+)?)\s*(?P<maxk>k\b)?)?",
        )
        .expect("valid regex")
    })
}

/// Find the pay interval named in `text`, preferring the earliest mention.
#[must_use]
pub fn detect_interval(text: &str) -> Option<CompensationInterval> {
    interval_patterns()
        .iter()
        .filter_map(|(interval, regex)| regex.find(text).map(|m| (m.start(), *interval)))
        .min_by_key(|(start, _)| *start)
        .map(|(_, interval)| interval)
}

fn parse_amount(raw: &str, thousands: bool) -> Option<f64> {
    let value: f64 = raw.replace(',', "").parse().ok()?;
    let value = if thousands { value * 1000.0 } else { value };
    (value.is_finite() && value > 0.0).then_some(value)
}

fn currency_code(symbol: &str, text: &str) -> &'static str {
    match symbol {
        "£" => "GBP",
        "€" => "EUR",
        "₹" => "INR",
        _ => ["CAD", "AUD", "NZD", "SGD"]
            .into_iter()
            .find(|code| text.contains(code))
            .unwrap_or("USD"),
    }
}

/// Parse a salary string such as `"$120,000 - $150,000 a year"` or `"$45/hr"`.
///
/// Returns `None` unless both a currency-marked amount and an interval keyword
/// are present.
#[must_use]
pub fn parse_compensation(text: &str, source: SalarySource) -> Option<Compensation> {
    let interval = detect_interval(text)?;
    let caps = amount_regex().captures(text)?;

    let min = parse_amount(caps.name("min")?.as_str(), caps.name("mink").is_some())?;
    let max = match caps.name("max") {
        Some(raw) => {
            // `$80k-95` shares the suffix, `$80k - $95,000` does not
            let bare = raw.as_str().replace(',', "").parse::<f64>().ok()?;
            let thousands = caps.name("maxk").is_some()
                || (caps.name("mink").is_some() && bare < 1000.0);
            parse_amount(raw.as_str(), thousands)?
        }
        None => min,
    };
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    let symbol = caps.name("cur").map_or("$", |m| m.as_str());

    Some(Compensation {
        interval: Some(interval),
        min_amount: Some(min),
        max_amount: Some(max),
        currency: Some(currency_code(symbol, text).to_string()),
        salary_source: Some(source),
    })
}

/// Extract distinct e-mail addresses in order of appearance.
#[must_use]
pub fn extract_emails(text: &str) -> Vec<String> {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid regex")
    });

    let mut seen = HashSet::new();
    regex
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches('.').to_string())
        .filter(|email| seen.insert(email.to_lowercase()))
        .collect()
}

/// True when the text contains any remote-work indicator.
#[must_use]
pub fn looks_remote(text: &str) -> bool {
    let lower = text.to_lowercase();
    REMOTE_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}

/// Lowercase, replace punctuation with spaces and collapse whitespace.
#[must_use]
pub fn normalize_key(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse runs of whitespace into single spaces and trim.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
