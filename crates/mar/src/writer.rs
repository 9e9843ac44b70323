//! Archive writer
//!
//! Packs dependency files plus exactly one descriptor entry into a zip-based
//! `.mar` container. Entries are named by base filename, input order is
//! preserved, and paths that do not exist or reference directories are
//! skipped without error.

use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::descriptor::{Descriptor, DescriptorError, DESCRIPTOR_ENTRY_NAME};

/// Errors that can occur while writing an archive
#[derive(Debug, Error)]
pub enum WriteError {
    /// One dependency could not be added (surfaced only in strict mode)
    #[error("Failed to add dependency {path}: {source}")]
    Dependency {
        /// Dependency path that failed
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// Container-level failure, including finalization
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O failure on the destination stream
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Descriptor encoding failure
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
}

/// What to do when one dependency entry fails to be added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependencyErrorPolicy {
    /// Log the failure and keep writing the remaining entries
    #[default]
    Lenient,
    /// Abort the write with `WriteError::Dependency`
    Strict,
}

/// Options for the write operation
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Per-dependency failure policy; finalization failures are always fatal
    pub dependency_errors: DependencyErrorPolicy,
}

impl WriteOptions {
    /// Abort on the first dependency that fails to be added
    pub fn strict() -> Self {
        Self {
            dependency_errors: DependencyErrorPolicy::Strict,
        }
    }
}

/// Write a model archive to `dest`.
///
/// Each surviving path in `dependency_files` becomes one entry named by its
/// base filename; a canonical descriptor entry for `loader_class_name` is
/// appended last. The destination is finalized on success and released on
/// every exit path (the zip writer finalizes on drop when an error aborts
/// the write early).
pub fn write_archive<W: Write + Seek>(
    dependency_files: &[PathBuf],
    loader_class_name: &str,
    dest: W,
    options: &WriteOptions,
) -> Result<(), WriteError> {
    write_archive_with(
        dependency_files,
        &Descriptor::new(loader_class_name),
        dest,
        options,
    )
}

/// Write a model archive with a caller-built descriptor (extras included).
pub fn write_archive_with<W: Write + Seek>(
    dependency_files: &[PathBuf],
    descriptor: &Descriptor,
    dest: W,
    options: &WriteOptions,
) -> Result<(), WriteError> {
    let mut zip = ZipWriter::new(dest);
    let entry_options =
        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in dependency_files {
        // Nonexistent paths and directories are not packable dependencies
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "skipping non-file dependency");
            continue;
        }
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };

        if let Err(source) = add_entry(&mut zip, path, &name, entry_options) {
            match options.dependency_errors {
                DependencyErrorPolicy::Lenient => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %source,
                        "failed to add dependency entry, skipping"
                    );
                }
                DependencyErrorPolicy::Strict => {
                    return Err(WriteError::Dependency {
                        path: path.clone(),
                        source,
                    });
                }
            }
        }
    }

    zip.start_file(DESCRIPTOR_ENTRY_NAME, entry_options)?;
    zip.write_all(&descriptor.to_bytes()?)?;
    zip.finish()?;
    Ok(())
}

/// Write a model archive to a `.mar` file at `path`.
pub fn write_archive_file(
    dependency_files: &[PathBuf],
    loader_class_name: &str,
    path: &Path,
    options: &WriteOptions,
) -> Result<(), WriteError> {
    let file = File::create(path)?;
    let result = write_archive(dependency_files, loader_class_name, file, options);
    if result.is_err() {
        // Best effort: do not leave a truncated container behind
        let _ = fs::remove_file(path);
    }
    result
}

fn add_entry<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    path: &Path,
    name: &str,
    options: SimpleFileOptions,
) -> io::Result<()> {
    // Open before committing the entry header: a skipped dependency must
    // leave no entry under its name
    let mut file = File::open(path)?;
    zip.start_file(name, options)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = match file.read(&mut buf) {
            Ok(n) => n,
            Err(e) => return abort_entry(zip, e),
        };
        if n == 0 {
            break;
        }
        if let Err(e) = zip.write_all(&buf[..n]) {
            return abort_entry(zip, e);
        }
    }
    Ok(())
}

// Roll back the partially written entry so a lenient skip leaves no trace.
// If the rollback itself fails the container is unusable; surface that
// instead of the original cause.
fn abort_entry<W: Write + Seek>(zip: &mut ZipWriter<W>, cause: io::Error) -> io::Result<()> {
    zip.abort_file()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Err(cause)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn entry_names(bytes: Vec<u8>) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index_raw(i).unwrap().name().to_owned())
            .collect()
    }

    #[test]
    fn test_entries_named_by_base_filename_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("sub").join("a.jar");
        let b = dir.path().join("b.jar");
        fs::create_dir_all(a.parent().unwrap()).unwrap();
        fs::write(&a, b"aa").unwrap();
        fs::write(&b, b"bb").unwrap();

        let mut buf = Cursor::new(Vec::new());
        write_archive(
            &[a, b],
            "X.Loader",
            &mut buf,
            &WriteOptions::default(),
        )
        .unwrap();

        assert_eq!(
            entry_names(buf.into_inner()),
            vec!["a.jar", "b.jar", DESCRIPTOR_ENTRY_NAME]
        );
    }

    #[test]
    fn test_missing_and_directory_paths_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("model.bin");
        fs::write(&real, b"weights").unwrap();

        let deps = vec![
            dir.path().join("does-not-exist.jar"),
            dir.path().to_path_buf(),
            real,
        ];

        let mut buf = Cursor::new(Vec::new());
        write_archive(&deps, "X.Loader", &mut buf, &WriteOptions::default()).unwrap();

        assert_eq!(
            entry_names(buf.into_inner()),
            vec!["model.bin", DESCRIPTOR_ENTRY_NAME]
        );
    }

    #[test]
    fn test_exactly_one_descriptor_with_zero_dependencies() {
        let mut buf = Cursor::new(Vec::new());
        write_archive(&[], "X.Loader", &mut buf, &WriteOptions::default()).unwrap();

        let names = entry_names(buf.into_inner());
        assert_eq!(names, vec![DESCRIPTOR_ENTRY_NAME]);
    }

    #[test]
    fn test_descriptor_entry_decodes_to_loader_identifier() {
        let mut buf = Cursor::new(Vec::new());
        write_archive(&[], "com.example.Loader", &mut buf, &WriteOptions::default()).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(buf.into_inner())).unwrap();
        let mut entry = archive.by_name(DESCRIPTOR_ENTRY_NAME).unwrap();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).unwrap();

        let descriptor = Descriptor::from_bytes(&bytes).unwrap();
        assert_eq!(descriptor.loader_class_name, "com.example.Loader");
    }

    // Opens fine for any caller, but the first read fails with EIO — a
    // dependency that dies mid-add, after the entry would have started.
    #[cfg(target_os = "linux")]
    const UNREADABLE: &str = "/proc/self/mem";

    #[test]
    #[cfg(target_os = "linux")]
    fn test_lenient_mid_add_failure_leaves_no_phantom_entry() {
        let deps = vec![PathBuf::from(UNREADABLE)];

        let mut buf = Cursor::new(Vec::new());
        write_archive(&deps, "X.Loader", &mut buf, &WriteOptions::default()).unwrap();

        // The skipped dependency must not survive as a truncated entry
        assert_eq!(entry_names(buf.into_inner()), vec![DESCRIPTOR_ENTRY_NAME]);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_strict_mid_add_failure_is_a_dependency_error() {
        let deps = vec![PathBuf::from(UNREADABLE)];

        let result = write_archive(
            &deps,
            "X.Loader",
            Cursor::new(Vec::new()),
            &WriteOptions::strict(),
        );
        assert!(matches!(result, Err(WriteError::Dependency { .. })));
    }

    #[test]
    fn test_write_archive_file_creates_container() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("model.mar");

        write_archive_file(&[], "X.Loader", &out, &WriteOptions::default()).unwrap();
        assert!(out.is_file());

        let names = entry_names(fs::read(&out).unwrap());
        assert_eq!(names, vec![DESCRIPTOR_ENTRY_NAME]);
    }
}
