//! The source adapter contract.
//!
//! An adapter turns a [`SearchSpec`] plus a pagination [`Cursor`] into a
//! native request, fetches it, and parses the response into normalized
//! [`JobRecord`]s. Adapters are stateless between calls; all per-run state
//! lives in the pagination driver.

use crate::error::{Result, SourceError};
use crate::http;
use crate::proxy::ProxyAssignment;
use async_trait::async_trait;
use jobhound_core::{JobRecord, SearchSpec, SourceCapabilities, SourceId};
use serde::{Deserialize, Serialize};

/// Position in a source's result stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cursor {
    /// First page of a cursor-paginated source
    Start,
    /// Numeric start offset
    Offset(usize),
    /// Opaque continuation token returned by the board
    Token(String),
}

/// HTTP method of a native request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    /// GET
    #[default]
    Get,
    /// POST
    Post,
}

/// A fully-built request in the board's own protocol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeRequest {
    /// Request method
    pub method: HttpMethod,
    /// Absolute URL without query string
    pub url: String,
    /// Request headers
    pub headers: Vec<(String, String)>,
    /// Query-string parameters
    pub query: Vec<(String, String)>,
    /// JSON body for POST requests
    pub body: Option<serde_json::Value>,
}

impl NativeRequest {
    /// Create a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            ..Self::default()
        }
    }

    /// Create a POST request with a JSON body.
    #[must_use]
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: Some(body),
            ..Self::default()
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Look up a query parameter value.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Raw response from a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl NativeResponse {
    /// A 200 response with the given body.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

/// One parsed page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// Valid records in source order
    pub records: Vec<JobRecord>,
    /// Cursor of the following page; `None` is the end marker
    pub next: Option<Cursor>,
    /// Records that failed required-field validation
    pub dropped: usize,
}

impl ParsedPage {
    /// Build a page, dropping records that fail validation.
    #[must_use]
    pub fn from_candidates(candidates: Vec<JobRecord>, next: Option<Cursor>) -> Self {
        let total = candidates.len();
        let records: Vec<JobRecord> = candidates
            .into_iter()
            .filter(|record| match record.validate() {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(source = %record.source, "Dropping record: {}", e);
                    false
                }
            })
            .collect();
        let dropped = total - records.len();
        Self {
            records,
            next,
            dropped,
        }
    }

    /// True when the board signalled there are no further pages.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.next.is_none()
    }
}

/// Contract every job-board adapter implements.
///
/// Implementations must be thread-safe (Send + Sync); one adapter instance is
/// shared by concurrent runs.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Identifier of the board this adapter serves.
    fn source_id(&self) -> &SourceId;

    /// What this adapter supports.
    fn capabilities(&self) -> SourceCapabilities;

    /// Cursor of the first page for a spec.
    fn initial_cursor(&self, spec: &SearchSpec) -> Cursor {
        if self.capabilities().native_offset {
            Cursor::Offset(spec.offset)
        } else {
            Cursor::Start
        }
    }

    /// Fail fast when the spec asks for something this adapter cannot do.
    fn check_capabilities(&self, spec: &SearchSpec) -> Result<()> {
        self.capabilities()
            .check(spec)
            .map_err(|violation| SourceError::CapabilityUnsupported {
                source_id: self.source_id().clone(),
                reason: violation.to_string(),
            })
    }

    /// Build the native request for one page.
    fn build_query(&self, spec: &SearchSpec, cursor: &Cursor) -> Result<NativeRequest>;

    /// Send a request through the assigned proxy slot.
    async fn fetch_page(
        &self,
        request: &NativeRequest,
        proxy: &ProxyAssignment,
    ) -> Result<NativeResponse> {
        http::send(&proxy.client, request, self.source_id()).await
    }

    /// Parse a response into records and the next cursor.
    ///
    /// Individual records that fail validation are dropped and counted; an
    /// error is only returned when the page as a whole cannot be read.
    fn parse_page(
        &self,
        spec: &SearchSpec,
        response: &NativeResponse,
        cursor: &Cursor,
    ) -> Result<ParsedPage>;
}
