//! Plugin ABI for dynamically distributed loaders
//!
//! A loader plugin is a shared library exporting one entry function,
//! [`PLUGIN_ENTRY_SYMBOL`], that returns a heap-allocated [`LoaderSet`]. The
//! archive machinery calls it once after `dlopen` and takes ownership of the
//! returned set. Plugins are expected to be built with the same toolchain as
//! the host process; the set crosses the boundary as a raw pointer only.

use crate::loader::{LoadError, Loader};

/// Zero-argument construction path for a registered loader
pub type LoaderFactory = fn() -> Result<Box<dyn Loader>, LoadError>;

/// Name of the `extern "C"` entry function a loader plugin must export.
///
/// Signature: `extern "C" fn() -> *mut LoaderSet`.
pub const PLUGIN_ENTRY_SYMBOL: &str = "mar_loader_init";

/// The loaders a plugin contributes, keyed by identifier
#[derive(Default)]
pub struct LoaderSet {
    entries: Vec<(String, LoaderFactory)>,
}

impl LoaderSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loader factory under an identifier.
    ///
    /// Later registrations of the same identifier shadow earlier ones when
    /// the set is merged into a registry.
    pub fn register(&mut self, identifier: impl Into<String>, factory: LoaderFactory) {
        self.entries.push((identifier.into(), factory));
    }

    /// Number of registered loaders
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no loaders are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate registered `(identifier, factory)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, LoaderFactory)> {
        self.entries.iter().map(|(id, f)| (id.as_str(), *f))
    }

    /// Consume the set, yielding its entries
    pub fn into_entries(self) -> Vec<(String, LoaderFactory)> {
        self.entries
    }
}

/// Export a plugin entry point registering the given loaders.
///
/// ```ignore
/// mar_sdk::export_loaders! {
///     "csv.Loader" => || Ok(Box::new(CsvLoader::default())),
///     "tree.Loader" => || Ok(Box::new(TreeLoader::default())),
/// }
/// ```
#[macro_export]
macro_rules! export_loaders {
    ($($identifier:expr => $factory:expr),+ $(,)?) => {
        #[no_mangle]
        pub extern "C" fn mar_loader_init() -> *mut $crate::LoaderSet {
            let mut set = $crate::LoaderSet::new();
            $(set.register($identifier, $factory);)+
            ::std::boxed::Box::into_raw(::std::boxed::Box::new(set))
        }
    };
}
