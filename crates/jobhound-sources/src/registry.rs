//! Adapter registry keyed by source identifier.

use crate::adapter::SourceAdapter;
use crate::error::{Result, SourceError};
use crate::indeed::IndeedAdapter;
use crate::linkedin::LinkedInAdapter;
use jobhound_core::{AppConfig, SourceId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of available source adapters.
///
/// The registry is populated once at startup and then shared read-only by
/// every aggregation run.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    adapters: HashMap<SourceId, Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in Indeed and `LinkedIn` adapters.
    #[must_use]
    pub fn with_builtin(config: &AppConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(IndeedAdapter::new(config.indeed.clone())));
        registry.register(Arc::new(LinkedInAdapter::new(config.linkedin.clone())));
        registry
    }

    /// Add an adapter, replacing any adapter with the same identifier.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        let id = adapter.source_id().clone();
        debug!("Registering source adapter {}", id);
        self.adapters.insert(id, adapter);
    }

    /// Look up an adapter.
    ///
    /// # Errors
    /// Returns [`SourceError::NotFound`] for an unregistered identifier.
    pub fn get(&self, id: &SourceId) -> Result<Arc<dyn SourceAdapter>> {
        self.adapters
            .get(id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(id.clone()))
    }

    /// True when an adapter is registered for `id`.
    #[must_use]
    pub fn contains(&self, id: &SourceId) -> bool {
        self.adapters.contains_key(id)
    }

    /// Registered identifiers, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<SourceId> {
        let mut ids: Vec<SourceId> = self.adapters.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered adapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// True when no adapter is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.ids())
            .finish()
    }
}
