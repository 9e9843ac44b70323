//! Top-level archive operations
//!
//! `read_archive` is the whole read path in order: open the container,
//! allocate a scratch directory, extract and classify, build the resolution
//! context, instantiate the named loader, merge native directories into the
//! process-wide search path, and hand control to the loader.

use std::env;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mar_sdk::{ArchiveHandle, Model};
use thiserror::Error;

use crate::extract::{self, ExtractError, DEFAULT_BUFFER_SIZE};
use crate::native_path::{self, NativePathError};
use crate::registry::LoaderRegistry;
use crate::resolver::{ResolutionContext, ResolveError};
use crate::scratch::ScratchDir;

/// The single configuration key: overrides the scratch-directory base path
pub const SCRATCH_DIR_ENV: &str = "MAR_SCRATCH_DIR";

/// Errors that can occur reading an archive
#[derive(Debug, Error)]
pub enum ReadError {
    /// The archive file could not be opened
    #[error("Failed to open archive {path}: {source}")]
    Open {
        /// Archive path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },

    /// Scratch directory allocation failed
    #[error("Failed to allocate scratch directory: {0}")]
    Scratch(#[source] io::Error),

    /// Extraction or descriptor decoding failed
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Loader resolution, instantiation, or invocation failed
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The native search path could not be updated
    #[error(transparent)]
    NativePath(#[from] NativePathError),
}

/// Options for the read operation
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Base path for scratch directories; `None` uses the system temp dir
    pub scratch_dir: Option<PathBuf>,
    /// Size of the per-entry read/write buffer
    pub buffer_size: usize,
    /// Keep the scratch directory after the call (debugging)
    pub retain_scratch: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            retain_scratch: false,
        }
    }
}

impl ReadOptions {
    /// Defaults, with the scratch base taken from [`SCRATCH_DIR_ENV`] if set
    pub fn from_env() -> Self {
        Self {
            scratch_dir: env::var_os(SCRATCH_DIR_ENV).map(PathBuf::from),
            ..Self::default()
        }
    }

    /// Set the scratch base path
    pub fn scratch_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(path.into());
        self
    }

    /// Set the entry buffer size
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Keep the scratch directory after the call
    pub fn retain_scratch(mut self, retain: bool) -> Self {
        self.retain_scratch = retain;
        self
    }
}

/// Read an archive and reconstruct its model.
///
/// `parent` is the fallback resolution context for loader identifiers the
/// archive's own entries do not provide; most callers pass
/// `LoaderRegistry::global()`. The scratch directory is removed when this
/// call returns, on every exit path, unless `options.retain_scratch` is set —
/// loaders must fully materialize their models during `load`.
pub fn read_archive(
    path: &Path,
    parent: Arc<LoaderRegistry>,
    options: &ReadOptions,
) -> Result<Box<dyn Model>, ReadError> {
    let file = File::open(path).map_err(|source| ReadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let scratch = ScratchDir::resolve(options.scratch_dir.as_deref(), options.retain_scratch)
        .map_err(ReadError::Scratch)?;

    let result = extract::extract(file, scratch.path(), options.buffer_size)?;
    let identifier = result.descriptor.loader_class_name.clone();

    let context = ResolutionContext::for_archive(&result, parent);
    let loader = context.instantiate(&identifier, path)?;

    // The loader's own code may need these at load time
    native_path::merge_directories(result.native_directories.iter().cloned())?;

    let handle = ArchiveHandle::new(
        path.to_path_buf(),
        scratch.path().to_path_buf(),
        result.extracted_files,
        result.descriptor.extras,
    );

    let model = loader.load(&handle).map_err(ResolveError::Load)?;

    tracing::debug!(archive = %path.display(), loader = %identifier, "model loaded");
    Ok(model)
}

/// List entry names in container order, without extracting.
pub fn list_entries(path: &Path) -> Result<Vec<String>, ReadError> {
    let file = File::open(path).map_err(|source| ReadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut zip = zip::ZipArchive::new(file).map_err(ExtractError::Archive)?;

    let mut names = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let entry = zip.by_index_raw(i).map_err(ExtractError::Archive)?;
        names.push(entry.name().to_owned());
    }
    Ok(names)
}
