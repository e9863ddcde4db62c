//! HTTP transport shared by the built-in adapters.

use crate::adapter::{HttpMethod, NativeRequest, NativeResponse};
use crate::error::{Result, SourceError};
use jobhound_core::SourceId;
use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Common desktop user agents.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Markers of CAPTCHA, challenge and login-wall pages.
const BLOCK_MARKERS: &[&str] = &[
    "captcha",
    "g-recaptcha",
    "cf-challenge",
    "challenge-platform",
    "authwall",
    "unusual traffic",
];

/// Client builder with the shared timeout settings.
#[must_use]
pub fn client_builder(request_timeout: Duration) -> ClientBuilder {
    Client::builder()
        .timeout(request_timeout)
        .connect_timeout(request_timeout)
}

/// Pick a random desktop user agent.
#[must_use]
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
}

/// True when a body looks like a CAPTCHA, challenge or login-wall page.
#[must_use]
pub fn detect_block_page(body: &str) -> bool {
    let lower = body.to_lowercase();
    BLOCK_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Send a native request and classify the outcome.
///
/// # Errors
/// - 429 → [`SourceError::RateLimited`], honouring `Retry-After` seconds
/// - 4xx with a CAPTCHA or challenge body → [`SourceError::RateLimited`]
/// - 5xx, timeouts, connection failures → [`SourceError::TransientNetwork`]
/// - other 4xx → [`SourceError::Fatal`]
pub async fn send(
    client: &Client,
    request: &NativeRequest,
    source_id: &SourceId,
) -> Result<NativeResponse> {
    let mut builder = match request.method {
        HttpMethod::Get => client.get(&request.url),
        HttpMethod::Post => client.post(&request.url),
    };
    if !request.query.is_empty() {
        builder = builder.query(&request.query);
    }
    for (name, value) in &request.headers {
        builder = builder.header(name, value);
    }
    if let Some(body) = &request.body {
        builder = builder.json(body);
    }

    tracing::debug!(source = %source_id, url = %request.url, "Sending request");

    let response = builder
        .send()
        .await
        .map_err(|e| classify_transport(source_id, &e))?;

    let status = response.status().as_u16();
    let retry_after = parse_retry_after(response.headers());
    let body = response
        .text()
        .await
        .map_err(|e| classify_transport(source_id, &e))?;

    classify_status(source_id, status, retry_after, body)
}

/// Map a status code to a response or a classified error.
pub fn classify_status(
    source_id: &SourceId,
    status: u16,
    retry_after: Option<Duration>,
    body: String,
) -> Result<NativeResponse> {
    match status {
        429 => Err(SourceError::RateLimited {
            source_id: source_id.clone(),
            retry_after,
        }),
        400..=499 if detect_block_page(&body) => {
            tracing::warn!(source = %source_id, status, "Challenge page returned");
            Err(SourceError::RateLimited {
                source_id: source_id.clone(),
                retry_after,
            })
        }
        500..=599 => Err(SourceError::TransientNetwork {
            source_id: source_id.clone(),
            message: format!("server returned status {status}"),
            status: Some(status),
        }),
        400..=499 => Err(SourceError::fatal(
            source_id,
            format!("request rejected with status {status}"),
        )),
        _ => Ok(NativeResponse { status, body }),
    }
}

fn classify_transport(source_id: &SourceId, error: &reqwest::Error) -> SourceError {
    if error.is_builder() {
        return SourceError::fatal(source_id, format!("invalid request: {error}"));
    }
    let kind = if error.is_timeout() {
        "timeout"
    } else if error.is_connect() {
        "connection failed"
    } else {
        "transport error"
    };
    SourceError::TransientNetwork {
        source_id: source_id.clone(),
        message: format!("{kind}: {error}"),
        status: error.status().map(|s| s.as_u16()),
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn source() -> SourceId {
        SourceId::new("linkedin").expect("valid source")
    }

    #[test]
    fn test_classify_status() {
        let limited = classify_status(&source(), 429, Some(Duration::from_secs(7)), String::new());
        assert_eq!(
            limited,
            Err(SourceError::RateLimited {
                source_id: source(),
                retry_after: Some(Duration::from_secs(7)),
            })
        );

        let transient = classify_status(&source(), 503, None, String::new())
            .expect_err("5xx is an error");
        assert!(transient.is_transient());

        let fatal =
            classify_status(&source(), 403, None, String::new()).expect_err("4xx is an error");
        assert!(matches!(fatal, SourceError::Fatal { .. }));

        let challenge = classify_status(
            &source(),
            403,
            None,
            "<html><div id=\"challenge-platform\"></div></html>".to_string(),
        )
        .expect_err("challenge page is an error");
        assert!(challenge.is_rate_limited());

        let ok = classify_status(&source(), 200, None, "<html/>".to_string()).expect("2xx ok");
        assert_eq!(ok.body, "<html/>");
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("120"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(120)));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_detect_block_page() {
        assert!(detect_block_page(
            "<div class=\"g-recaptcha\" data-sitekey=\"x\"></div>"
        ));
        assert!(detect_block_page("<a href=\"/authwall?trk=x\">Sign in</a>"));
        assert!(!detect_block_page("<ul><li>Rust Engineer</li></ul>"));
    }

    #[test]
    fn test_random_user_agent() {
        let agents: Vec<_> = (0..20).map(|_| random_user_agent()).collect();
        assert!(agents.iter().all(|ua| ua.starts_with("Mozilla/5.0")));
    }
}
