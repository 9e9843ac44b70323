//! Scratch directory manager
//!
//! Every read call extracts into its own uniquely named directory, removed
//! when the call finishes on every exit path, unless the caller asks for
//! retention (debugging). With a configured base path the unique directory is
//! allocated inside it, so concurrent reads sharing one configuration never
//! collide.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

const SCRATCH_PREFIX: &str = "mar-";

/// A per-read extraction directory
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    // None once retained; the directory then outlives this handle
    temp: Option<TempDir>,
}

impl ScratchDir {
    /// Allocate a unique scratch directory.
    ///
    /// With `configured` set, the base directory is created if needed and the
    /// unique directory lives inside it; otherwise the system temp location
    /// is used. `retain` keeps the directory past drop.
    pub fn resolve(configured: Option<&Path>, retain: bool) -> io::Result<Self> {
        let temp = match configured {
            Some(base) => {
                fs::create_dir_all(base)?;
                tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir_in(base)?
            }
            None => tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir()?,
        };

        if retain {
            let path = temp.into_path();
            tracing::debug!(path = %path.display(), "scratch directory retained");
            Ok(Self { path, temp: None })
        } else {
            Ok(Self {
                path: temp.path().to_path_buf(),
                temp: Some(temp),
            })
        }
    }

    /// Path of the scratch directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the directory will survive drop
    pub fn is_retained(&self) -> bool {
        self.temp.is_none()
    }
}
