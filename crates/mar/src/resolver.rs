//! Loader resolver
//!
//! Builds the archive-scoped resolution context and locates the loader the
//! descriptor names. Lookup is local-first: loaders contributed by the
//! archive's own executable entries shadow the parent registry.

use std::path::PathBuf;
use std::sync::Arc;

use mar_sdk::{LoadError, Loader, LoaderFactory};
use thiserror::Error;

use crate::extract::ExtractionResult;
use crate::plugin;
use crate::registry::LoaderRegistry;

/// Errors that can occur resolving and instantiating a loader
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The named loader is in neither the archive-local nor parent registry
    #[error("Unresolvable loader {identifier} for archive {archive}")]
    UnresolvableLoader {
        /// Identifier the descriptor named
        identifier: String,
        /// Archive being read
        archive: PathBuf,
    },

    /// The loader's factory failed
    #[error("Failed to instantiate loader {identifier}: {source}")]
    Instantiation {
        /// Identifier the descriptor named
        identifier: String,
        /// Construction-time fault
        #[source]
        source: LoadError,
    },

    /// The loader's `load` call failed; propagated unmodified
    #[error(transparent)]
    Load(LoadError),
}

/// Archive-scoped lookup: local registry first, parent second
pub struct ResolutionContext {
    local: LoaderRegistry,
    parent: Arc<LoaderRegistry>,
}

impl ResolutionContext {
    /// Build the context for one extracted archive.
    ///
    /// Every executable entry is probed as a loader plugin, in container
    /// order. Entries that are not loadable plugins contribute no loaders and
    /// are not an error: like a data-only jar on a classpath, they may still
    /// matter to the loader itself.
    pub fn for_archive(result: &ExtractionResult, parent: Arc<LoaderRegistry>) -> Self {
        let local = LoaderRegistry::new();
        for entry in &result.executable_entries {
            match plugin::load_loader_set(entry) {
                Ok(set) => {
                    tracing::debug!(
                        entry = %entry.display(),
                        loaders = set.len(),
                        "plugin entry contributed loaders"
                    );
                    for (identifier, factory) in set.into_entries() {
                        local.register(identifier, factory);
                    }
                }
                Err(error) => {
                    tracing::debug!(
                        entry = %entry.display(),
                        %error,
                        "executable entry is not a loader plugin"
                    );
                }
            }
        }
        Self { local, parent }
    }

    /// A context with no archive-local loaders
    pub fn parent_only(parent: Arc<LoaderRegistry>) -> Self {
        Self {
            local: LoaderRegistry::new(),
            parent,
        }
    }

    /// Resolve an identifier to its factory
    pub fn resolve(&self, identifier: &str) -> Option<LoaderFactory> {
        self.local
            .get(identifier)
            .or_else(|| self.parent.get(identifier))
    }

    /// Resolve and run the factory, mapping both failure modes
    pub fn instantiate(
        &self,
        identifier: &str,
        archive: &std::path::Path,
    ) -> Result<Box<dyn Loader>, ResolveError> {
        let factory = self
            .resolve(identifier)
            .ok_or_else(|| ResolveError::UnresolvableLoader {
                identifier: identifier.to_owned(),
                archive: archive.to_path_buf(),
            })?;
        factory().map_err(|source| ResolveError::Instantiation {
            identifier: identifier.to_owned(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mar_sdk::{ArchiveHandle, Model};
    use std::path::Path;

    struct NullLoader;

    impl Loader for NullLoader {
        fn load(&self, _archive: &ArchiveHandle) -> Result<Box<dyn Model>, LoadError> {
            Err("null loader".into())
        }
    }

    fn null_factory() -> Result<Box<dyn Loader>, LoadError> {
        Ok(Box::new(NullLoader))
    }

    fn failing_factory() -> Result<Box<dyn Loader>, LoadError> {
        Err(LoadError::Construction("no default state".to_string()))
    }

    #[test]
    fn test_parent_fallback() {
        let parent = Arc::new(LoaderRegistry::new());
        parent.register("X.Loader", null_factory);

        let context = ResolutionContext::parent_only(parent);
        assert!(context.resolve("X.Loader").is_some());
        assert!(context.resolve("Y.Loader").is_none());
    }

    #[test]
    fn test_unresolvable_identifier() {
        let context = ResolutionContext::parent_only(Arc::new(LoaderRegistry::new()));
        let result = context.instantiate("ghost.Loader", Path::new("model.mar"));
        assert!(matches!(
            result,
            Err(ResolveError::UnresolvableLoader { ref identifier, .. }) if identifier == "ghost.Loader"
        ));
    }

    #[test]
    fn test_instantiation_fault_is_distinguished() {
        let parent = Arc::new(LoaderRegistry::new());
        parent.register("broken.Loader", failing_factory);

        let context = ResolutionContext::parent_only(parent);
        let result = context.instantiate("broken.Loader", Path::new("model.mar"));
        assert!(matches!(result, Err(ResolveError::Instantiation { .. })));
    }
}
