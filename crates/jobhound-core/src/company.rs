//! Company-scope token helpers.
//!
//! Stateless string transforms used to discover a company-scope token either
//! from a board company-page URL or from a plain company name.

use regex::Regex;
use std::sync::OnceLock;

/// Board slugs whose canonical casing differs from the lowercase slug.
const KNOWN_COMPANIES: &[(&str, &str)] = &[
    ("adobe", "Adobe"),
    ("airbnb", "Airbnb"),
    ("amazon", "Amazon"),
    ("amd", "AMD"),
    ("apple", "Apple"),
    ("atlassian", "Atlassian"),
    ("bank-of-america", "Bank-of-America"),
    ("cisco", "Cisco"),
    ("databricks", "Databricks"),
    ("disney", "Disney"),
    ("dropbox", "Dropbox"),
    ("facebook", "Meta"),
    ("github", "GitHub"),
    ("gitlab", "GitLab"),
    ("goldman-sachs", "Goldman-Sachs"),
    ("google", "Google"),
    ("hubspot", "HubSpot"),
    ("ibm", "IBM"),
    ("intel", "Intel"),
    ("jpmorgan", "JPMorgan"),
    ("linkedin", "LinkedIn"),
    ("lyft", "Lyft"),
    ("meta", "Meta"),
    ("microsoft", "Microsoft"),
    ("mongodb", "MongoDB"),
    ("morgan-stanley", "Morgan-Stanley"),
    ("netflix", "Netflix"),
    ("nvidia", "NVIDIA"),
    ("oracle", "Oracle"),
    ("palantir", "Palantir"),
    ("paypal", "PayPal"),
    ("salesforce", "Salesforce"),
    ("shopify", "Shopify"),
    ("snowflake", "Snowflake"),
    ("spacex", "SpaceX"),
    ("spotify", "Spotify"),
    ("stripe", "Stripe"),
    ("tesla", "Tesla"),
    ("tiktok", "TikTok"),
    ("twilio", "Twilio"),
    ("uber", "Uber"),
    ("vmware", "VMware"),
    ("walmart", "Walmart"),
    ("wells-fargo", "Wells-Fargo"),
    ("youtube", "YouTube"),
    ("zoom", "Zoom"),
];

/// Extract the company token from a board company-page URL.
///
/// Accepts absolute (`https://www.indeed.com/cmp/Uber`) and relative
/// (`/cmp/Uber/jobs`) forms.
#[must_use]
pub fn extract_company_token(company_url: &str) -> Option<String> {
    static CMP_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = CMP_REGEX.get_or_init(|| Regex::new(r"/cmp/([^/?#]+)").expect("valid regex"));

    regex
        .captures(company_url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Derive a company token from a company name.
///
/// The name is lowercased, stripped of punctuation and hyphenated; well-known
/// companies map to their board casing. This is a heuristic and may not match
/// the board's slug for every company.
#[must_use]
pub fn company_token_from_name(company_name: &str) -> Option<String> {
    static PUNCT_REGEX: OnceLock<Regex> = OnceLock::new();
    static SEP_REGEX: OnceLock<Regex> = OnceLock::new();
    let punct = PUNCT_REGEX.get_or_init(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
    let sep = SEP_REGEX.get_or_init(|| Regex::new(r"[-\s]+").expect("valid regex"));

    let lowered = company_name.trim().to_lowercase();
    let cleaned = punct.replace_all(&lowered, "");
    let slug = sep.replace_all(&cleaned, "-");
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
        return None;
    }

    let token = KNOWN_COMPANIES
        .iter()
        .find(|(key, _)| *key == slug)
        .map_or_else(|| slug.to_string(), |(_, canonical)| (*canonical).to_string());

    Some(token)
}
