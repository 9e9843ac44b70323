//! The loader capability

use crate::handle::ArchiveHandle;
use crate::model::Model;

/// Errors a loader can raise while reconstructing a model
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// An artifact the loader requires is not in the archive
    #[error("Missing artifact: {name}")]
    MissingArtifact {
        /// Base filename of the absent artifact
        name: String,
    },

    /// An artifact exists but could not be parsed
    #[error("Malformed artifact: {0}")]
    Malformed(String),

    /// I/O failure reading an artifact
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Loader construction failed before any archive access
    #[error("Loader construction failed: {0}")]
    Construction(String),

    /// Loader-specific failure
    #[error("{0}")]
    Other(String),
}

impl From<String> for LoadError {
    fn from(s: String) -> Self {
        LoadError::Other(s)
    }
}

impl From<&str> for LoadError {
    fn from(s: &str) -> Self {
        LoadError::Other(s.to_string())
    }
}

/// The loader capability: turn archive contents into a `Model`.
///
/// Implementations are registered under a fully-qualified identifier (the
/// descriptor's `modelLoaderClassName`) and must be constructible with no
/// arguments through their registered factory.
pub trait Loader: Send + Sync {
    /// Reconstruct a model from the archive
    fn load(&self, archive: &ArchiveHandle) -> Result<Box<dyn Model>, LoadError>;
}
