//! Jobhound Sources - job-board adapters.
//!
//! Each adapter owns its board's query syntax, pagination scheme and native
//! field mapping, and exposes them through the [`SourceAdapter`] trait so the
//! aggregator can drive every board the same way.
//!
//! # Modules
//!
//! - [`adapter`] - The adapter contract, cursors and native request/response types
//! - [`error`] - Source error taxonomy
//! - [`http`] - Shared HTTP transport and status classification
//! - [`proxy`] - Round-robin proxy pool
//! - [`registry`] - Adapter lookup by source id
//! - [`indeed`] - Indeed GraphQL adapter
//! - [`linkedin`] - `LinkedIn` guest search adapter

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod adapter;
pub mod error;
pub mod http;
pub mod indeed;
pub mod linkedin;
pub mod markup;
pub mod proxy;
pub mod registry;

// Re-export commonly used types
pub use adapter::{Cursor, HttpMethod, NativeRequest, NativeResponse, ParsedPage, SourceAdapter};
pub use error::{Result, SourceError};
pub use indeed::IndeedAdapter;
pub use linkedin::LinkedInAdapter;
pub use proxy::{ProxyAssignment, ProxyPool};
pub use registry::SourceRegistry;
