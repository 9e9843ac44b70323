//! Native library path manager
//!
//! Owns the process-wide native-library search path. Merges are append-only
//! and deduplicated: directories contributed by earlier loads are never
//! removed, even if their scratch directory is later cleaned up, because
//! already-loaded code may resolve libraries through them at any time.
//! A global mutex serializes the read-modify-write of the search variable so
//! concurrent reads cannot lose updates.

use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use thiserror::Error;

/// Environment variable holding the process-wide native search path
#[cfg(target_os = "macos")]
pub const NATIVE_PATH_VAR: &str = "DYLD_LIBRARY_PATH";
/// Environment variable holding the process-wide native search path
#[cfg(all(unix, not(target_os = "macos")))]
pub const NATIVE_PATH_VAR: &str = "LD_LIBRARY_PATH";
/// Environment variable holding the process-wide native search path
#[cfg(windows)]
pub const NATIVE_PATH_VAR: &str = "PATH";

/// Errors that can occur merging native directories
#[derive(Debug, Error)]
pub enum NativePathError {
    /// The merged path could not be re-encoded into the search variable
    #[error("Failed to update {NATIVE_PATH_VAR} with directories {directories:?}: {source}")]
    Join {
        /// The directory set the merge attempted to add
        directories: Vec<PathBuf>,
        /// Underlying encoding failure
        #[source]
        source: env::JoinPathsError,
    },
}

static STATE: Lazy<Mutex<BTreeSet<PathBuf>>> = Lazy::new(|| Mutex::new(BTreeSet::new()));

/// Merge `directories` into the process-wide native search path.
///
/// Reads the current value of [`NATIVE_PATH_VAR`], appends every directory
/// not already present, and writes the union back. Monotonic for the process
/// lifetime.
pub fn merge_directories<I>(directories: I) -> Result<(), NativePathError>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut state = STATE.lock();

    let mut parts: Vec<PathBuf> = env::var_os(NATIVE_PATH_VAR)
        .map(|value| env::split_paths(&value).collect())
        .unwrap_or_default();

    let mut added = Vec::new();
    for dir in directories {
        if !parts.contains(&dir) {
            parts.push(dir.clone());
            added.push(dir.clone());
        }
        state.insert(dir);
    }

    if !added.is_empty() {
        let joined = env::join_paths(&parts).map_err(|source| NativePathError::Join {
            directories: added.clone(),
            source,
        })?;
        env::set_var(NATIVE_PATH_VAR, joined);
        tracing::debug!(count = added.len(), "native search path extended");
    }

    Ok(())
}

/// Directories merged so far in this process, in sorted order
pub fn merged() -> Vec<PathBuf> {
    STATE.lock().iter().cloned().collect()
}

/// Forget the merge bookkeeping (test support).
///
/// Does not rewrite the search variable; directories already written stay on
/// the path, consistent with the monotonic contract.
pub fn reset() {
    STATE.lock().clear();
}
