//! MAR — a portable model-archive format
//!
//! An archive bundles a trained model's artifacts, its runtime dependencies,
//! and the name of a loader able to reconstruct a scoreable model object from
//! them. A consumer needs only this crate and the four-operation model
//! capability from `mar-sdk` to use a model, whatever framework produced it.
//!
//! This crate provides:
//! - Archive writing (`write_archive`, `write_archive_file`)
//! - Archive reading and loader resolution (`read_archive`, `list_entries`)
//! - The descriptor codec (canonical JSON plus the legacy bare-text shape)
//! - The loader registry and dynamic plugin loading
//! - Scratch-directory and native-search-path management
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mar::{read_archive, LoaderRegistry, ReadOptions};
//!
//! let registry = LoaderRegistry::global();
//! registry.register("csv.Loader", || Ok(Box::new(CsvLoader::default())));
//!
//! let model = read_archive(
//!     "models/churn.mar".as_ref(),
//!     registry,
//!     &ReadOptions::from_env(),
//! )?;
//! let output = model.score(&record)?;
//! ```

pub mod archive;
pub mod descriptor;
pub mod extract;
pub mod native_path;
pub mod plugin;
pub mod registry;
pub mod resolver;
pub mod scratch;
pub mod writer;

pub use archive::{list_entries, read_archive, ReadError, ReadOptions, SCRATCH_DIR_ENV};
pub use descriptor::{Descriptor, DescriptorError, DESCRIPTOR_ENTRY_NAME, LOADER_CLASS_KEY};
pub use extract::{classify, extract, EntryKind, ExtractError, ExtractionResult,
    DEFAULT_BUFFER_SIZE};
pub use native_path::{merge_directories, NativePathError, NATIVE_PATH_VAR};
pub use plugin::{load_loader_set, Library, PluginError};
pub use registry::LoaderRegistry;
pub use resolver::{ResolutionContext, ResolveError};
pub use scratch::ScratchDir;
pub use writer::{write_archive, write_archive_file, write_archive_with, DependencyErrorPolicy,
    WriteError, WriteOptions};

// The capability contracts, re-exported so consumers need one import root
pub use mar_sdk::{ArchiveHandle, DataType, Field, LoadError, Loader, LoaderFactory, LoaderSet,
    Model, ModelError, Record, PLUGIN_ENTRY_SYMBOL};
