//! Dynamic loader plugins
//!
//! An archive's executable entries may be shared libraries exporting the
//! [`PLUGIN_ENTRY_SYMBOL`] entry function. Opening one and calling the entry
//! yields a [`LoaderSet`] merged into the archive-scoped registry.
//!
//! Libraries that contributed loaders are never unloaded: their code may back
//! live `Model` instances long after the read call returns, so successful
//! opens are parked in a process-lifetime table.

use std::path::Path;

use mar_sdk::{LoaderSet, PLUGIN_ENTRY_SYMBOL};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use thiserror::Error;

/// Errors that can occur while probing or loading a plugin
#[derive(Debug, Error)]
pub enum PluginError {
    /// The file could not be opened as a shared library
    #[error("Not a loadable library: {path}")]
    NotLoadable {
        /// Path and platform detail of the failed open
        path: String,
    },

    /// The library lacks the plugin entry symbol
    #[error("Symbol {symbol} not found in {library}")]
    SymbolNotFound {
        /// Symbol that was looked up
        symbol: String,
        /// Library path and platform detail
        library: String,
    },

    /// The entry function returned null
    #[error("Plugin entry returned no loader set: {0}")]
    InvalidInit(String),

    /// Path or symbol name could not cross the FFI boundary
    #[error("Platform error: {0}")]
    Platform(String),
}

/// Open `path` as a loader plugin and return its loader set.
///
/// On success the underlying library handle is retained for the rest of the
/// process lifetime. Failures leave nothing loaded.
pub fn load_loader_set(path: &Path) -> Result<LoaderSet, PluginError> {
    let library = Library::open(path)?;
    let set = library.loader_set()?;
    RETAINED.lock().push(library);
    Ok(set)
}

static RETAINED: Lazy<Mutex<Vec<Library>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// An opened shared library
pub struct Library {
    handle: PlatformHandle,
    path: String,
}

impl Library {
    /// Open a shared library.
    ///
    /// Unix loads with `dlopen(RTLD_NOW | RTLD_LOCAL)`; Windows with
    /// `LoadLibraryW`.
    pub fn open(path: &Path) -> Result<Self, PluginError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| PluginError::Platform(format!("non-UTF-8 path: {:?}", path)))?;
        let handle = PlatformHandle::open(path_str)?;
        Ok(Self {
            handle,
            path: path_str.to_owned(),
        })
    }

    /// Call the plugin entry function and take ownership of its loader set.
    pub fn loader_set(&self) -> Result<LoaderSet, PluginError> {
        type EntryFn = extern "C" fn() -> *mut LoaderSet;

        // Safety: the entry contract fixes this exact signature, and the set
        // was Box-allocated by the plugin with the same toolchain.
        unsafe {
            let entry: EntryFn = self.handle.symbol(PLUGIN_ENTRY_SYMBOL, &self.path)?;
            let ptr = entry();
            if ptr.is_null() {
                return Err(PluginError::InvalidInit(self.path.clone()));
            }
            Ok(*Box::from_raw(ptr))
        }
    }
}

#[cfg(unix)]
type PlatformHandle = UnixHandle;

#[cfg(windows)]
type PlatformHandle = WindowsHandle;

#[cfg(unix)]
struct UnixHandle {
    raw: *mut std::ffi::c_void,
}

#[cfg(unix)]
impl UnixHandle {
    fn open(path: &str) -> Result<Self, PluginError> {
        use std::ffi::{CStr, CString};

        let c_path = CString::new(path)
            .map_err(|e| PluginError::Platform(format!("invalid path: {}", e)))?;

        // RTLD_LOCAL keeps plugin symbols out of the global namespace
        let raw = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        if raw.is_null() {
            let detail = unsafe {
                let err = libc::dlerror();
                if err.is_null() {
                    "unknown dlopen failure".to_owned()
                } else {
                    CStr::from_ptr(err).to_string_lossy().into_owned()
                }
            };
            return Err(PluginError::NotLoadable {
                path: format!("{}: {}", path, detail),
            });
        }
        Ok(Self { raw })
    }

    unsafe fn symbol<T>(&self, name: &str, library: &str) -> Result<T, PluginError> {
        use std::ffi::{CStr, CString};

        let c_name = CString::new(name)
            .map_err(|e| PluginError::Platform(format!("invalid symbol name: {}", e)))?;

        // dlsym can legally return null; dlerror disambiguates
        libc::dlerror();
        let sym = libc::dlsym(self.raw, c_name.as_ptr());
        let err = libc::dlerror();
        if !err.is_null() || sym.is_null() {
            let detail = if err.is_null() {
                library.to_owned()
            } else {
                format!("{}: {}", library, CStr::from_ptr(err).to_string_lossy())
            };
            return Err(PluginError::SymbolNotFound {
                symbol: name.to_owned(),
                library: detail,
            });
        }
        Ok(std::mem::transmute_copy(&sym))
    }
}

#[cfg(unix)]
impl Drop for UnixHandle {
    fn drop(&mut self) {
        unsafe {
            libc::dlclose(self.raw);
        }
    }
}

#[cfg(unix)]
unsafe impl Send for UnixHandle {}

#[cfg(windows)]
struct WindowsHandle {
    raw: *mut std::ffi::c_void,
}

#[cfg(windows)]
impl WindowsHandle {
    fn open(path: &str) -> Result<Self, PluginError> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;

        let wide: Vec<u16> = OsStr::new(path)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();
        let raw = unsafe { LoadLibraryW(wide.as_ptr()) };
        if raw.is_null() {
            let code = unsafe { GetLastError() };
            return Err(PluginError::NotLoadable {
                path: format!("{} (error code {})", path, code),
            });
        }
        Ok(Self { raw })
    }

    unsafe fn symbol<T>(&self, name: &str, library: &str) -> Result<T, PluginError> {
        let c_name = std::ffi::CString::new(name)
            .map_err(|e| PluginError::Platform(format!("invalid symbol name: {}", e)))?;
        let sym = GetProcAddress(self.raw, c_name.as_ptr());
        if sym.is_null() {
            let code = GetLastError();
            return Err(PluginError::SymbolNotFound {
                symbol: name.to_owned(),
                library: format!("{} (error code {})", library, code),
            });
        }
        Ok(std::mem::transmute_copy(&sym))
    }
}

#[cfg(windows)]
impl Drop for WindowsHandle {
    fn drop(&mut self) {
        unsafe {
            FreeLibrary(self.raw);
        }
    }
}

#[cfg(windows)]
unsafe impl Send for WindowsHandle {}

#[cfg(windows)]
extern "system" {
    fn LoadLibraryW(filename: *const u16) -> *mut std::ffi::c_void;
    fn GetProcAddress(module: *mut std::ffi::c_void, name: *const i8) -> *mut std::ffi::c_void;
    fn FreeLibrary(module: *mut std::ffi::c_void) -> i32;
    fn GetLastError() -> u32;
}
