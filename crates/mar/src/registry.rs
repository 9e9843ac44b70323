//! Loader registry
//!
//! Maps loader identifiers to zero-argument factories. A process links loader
//! implementations in and registers them here (usually against the global
//! registry); archives may additionally contribute loaders through plugin
//! entries, merged into an archive-scoped registry by the resolver.

use std::collections::HashMap;
use std::sync::Arc;

use mar_sdk::LoaderFactory;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

static GLOBAL: Lazy<Arc<LoaderRegistry>> = Lazy::new(|| Arc::new(LoaderRegistry::new()));

/// Thread-safe mapping from loader identifier to factory
#[derive(Default)]
pub struct LoaderRegistry {
    entries: RwLock<HashMap<String, LoaderFactory>>,
}

impl LoaderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-global registry, shared by all reads that pass it as the
    /// parent resolution context
    pub fn global() -> Arc<LoaderRegistry> {
        GLOBAL.clone()
    }

    /// Register a factory; a later registration shadows an earlier one
    pub fn register(&self, identifier: impl Into<String>, factory: LoaderFactory) {
        self.entries.write().insert(identifier.into(), factory);
    }

    /// Look up a factory by identifier
    pub fn get(&self, identifier: &str) -> Option<LoaderFactory> {
        self.entries.read().get(identifier).copied()
    }

    /// True if the identifier is registered
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.read().contains_key(identifier)
    }

    /// Registered identifiers, unordered
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Number of registered loaders
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
