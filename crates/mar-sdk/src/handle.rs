//! The archive view handed to a loader
//!
//! A loader never touches the container codec directly. It receives an
//! `ArchiveHandle` with the extracted artifacts, the descriptor extras, and
//! the path of the original archive file.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Everything a loader may need from an opened archive.
///
/// Artifact paths point into the scratch directory the archive was extracted
/// to; they stay valid for the duration of the `load` call (and afterwards
/// only if the caller opted to retain the scratch directory).
#[derive(Debug, Clone)]
pub struct ArchiveHandle {
    archive_path: PathBuf,
    scratch_dir: PathBuf,
    files: Vec<PathBuf>,
    extras: HashMap<String, String>,
}

impl ArchiveHandle {
    /// Build a handle. `files` is every extracted entry, container order.
    pub fn new(
        archive_path: PathBuf,
        scratch_dir: PathBuf,
        files: Vec<PathBuf>,
        extras: HashMap<String, String>,
    ) -> Self {
        Self {
            archive_path,
            scratch_dir,
            files,
            extras,
        }
    }

    /// Path of the original archive file the caller supplied
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Directory the archive was extracted into
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// All extracted files, in container order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Free-form key/value pairs carried by the archive descriptor
    pub fn extras(&self) -> &HashMap<String, String> {
        &self.extras
    }

    /// Look up an extracted artifact by its base filename
    pub fn artifact(&self, name: &str) -> Option<&Path> {
        self.files
            .iter()
            .find(|p| p.file_name().map(|n| n == name).unwrap_or(false))
            .map(|p| p.as_path())
    }

    /// Open the original archive file for raw access
    pub fn open(&self) -> io::Result<File> {
        File::open(&self.archive_path)
    }
}
