//! MAR SDK - Lightweight SDK for writing model loaders
//!
//! This crate provides the minimal types and traits needed to author MAR
//! model loaders without depending on the full archive machinery:
//! - The `Model` capability (`score`, `input`, `output`, `metadata`)
//! - The `Loader` capability (`load(archive) -> Model`)
//! - `ArchiveHandle`, the view of an opened archive a loader works against
//! - The plugin ABI (`LoaderSet`, entry-symbol constant, `export_loaders!`)
//!
//! # Example
//!
//! ```ignore
//! use mar_sdk::{ArchiveHandle, LoadError, Loader, Model};
//!
//! #[derive(Default)]
//! struct CsvLoader;
//!
//! impl Loader for CsvLoader {
//!     fn load(&self, archive: &ArchiveHandle) -> Result<Box<dyn Model>, LoadError> {
//!         let weights = archive
//!             .artifact("weights.csv")
//!             .ok_or_else(|| LoadError::MissingArtifact {
//!                 name: "weights.csv".to_string(),
//!             })?;
//!         // ... parse weights, build the model ...
//!         # unimplemented!()
//!     }
//! }
//!
//! mar_sdk::export_loaders! {
//!     "csv.Loader" => || Ok(Box::new(CsvLoader::default())),
//! }
//! ```

#![warn(missing_docs)]

mod handle;
mod loader;
mod model;
mod plugin;

pub use handle::ArchiveHandle;
pub use loader::{LoadError, Loader};
pub use model::{DataType, Field, Model, ModelError, Record};
pub use plugin::{LoaderFactory, LoaderSet, PLUGIN_ENTRY_SYMBOL};
