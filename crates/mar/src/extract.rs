//! Archive extractor and entry classification
//!
//! Unpacks a container into a scratch directory, flattening every entry to
//! its base filename, and classifies each one by role: executable dependency,
//! native library, descriptor, or opaque payload. Colliding base names
//! overwrite (the later entry wins), matching the flattened layout.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::descriptor::{Descriptor, DescriptorError, DESCRIPTOR_ENTRY_NAME};

/// Default size of the entry read/write buffer, in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Errors that can occur during extraction
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Container-level failure reading the archive
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O failure writing an extracted entry
    #[error("I/O error extracting entry {name}: {source}")]
    Io {
        /// Entry name being written
        name: String,
        /// Underlying failure
        #[source]
        source: io::Error,
    },

    /// Descriptor entry missing or undecodable
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// Role an entry plays inside the container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Classpath-like executable dependency
    Executable,
    /// Native shared library
    NativeLibrary,
    /// The descriptor entry
    Descriptor,
    /// Opaque payload
    Other,
}

/// Classify an entry by its container name.
///
/// Substring match, case-sensitive, first rule wins.
pub fn classify(name: &str) -> EntryKind {
    if name.contains(".jar") {
        EntryKind::Executable
    } else if name.contains(".so") || name.contains(".dll") {
        EntryKind::NativeLibrary
    } else if name.contains(DESCRIPTOR_ENTRY_NAME) {
        EntryKind::Descriptor
    } else {
        EntryKind::Other
    }
}

/// What extraction produced, grouped by entry role
#[derive(Debug)]
pub struct ExtractionResult {
    /// Executable dependencies, container order (classpath semantics)
    pub executable_entries: Vec<PathBuf>,
    /// Directories that hold extracted native libraries
    pub native_directories: BTreeSet<PathBuf>,
    /// The decoded descriptor
    pub descriptor: Descriptor,
    /// Opaque payload files
    pub other_files: BTreeSet<PathBuf>,
    /// Every extracted path, container order (the archive handle's listing)
    pub extracted_files: Vec<PathBuf>,
}

/// Extract a container into `scratch_dir`.
///
/// Iterates every entry exactly once in container order, writing each to a
/// file named by the entry's base name via a read/write loop sized by
/// `buffer_size`. Any entry I/O failure aborts the whole extraction; the
/// reader is released on every exit path.
pub fn extract<R: Read + Seek>(
    archive: R,
    scratch_dir: &Path,
    buffer_size: usize,
) -> Result<ExtractionResult, ExtractError> {
    let mut zip = zip::ZipArchive::new(archive)?;

    let mut executable_entries = Vec::new();
    let mut native_directories = BTreeSet::new();
    let mut other_files = BTreeSet::new();
    let mut extracted_files = Vec::new();
    let mut descriptor = None;

    let mut buf = vec![0u8; buffer_size.max(1)];

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = entry.name().to_owned();

        // Directory structure inside the container is not preserved
        let base = match Path::new(&name).file_name() {
            Some(base) => base.to_owned(),
            None => continue,
        };
        let target = scratch_dir.join(base);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|source| ExtractError::Io {
                name: name.clone(),
                source,
            })?;
        } else {
            write_entry(&mut entry, &target, &mut buf).map_err(|source| ExtractError::Io {
                name: name.clone(),
                source,
            })?;
        }
        extracted_files.push(target.clone());

        match classify(&name) {
            EntryKind::Executable => executable_entries.push(target),
            EntryKind::NativeLibrary => {
                // A directory artifact contributes its own path, a file its parent
                let dir = if target.is_dir() {
                    target
                } else {
                    target
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| scratch_dir.to_path_buf())
                };
                native_directories.insert(dir);
            }
            EntryKind::Descriptor => {
                let bytes = fs::read(&target).map_err(|source| ExtractError::Io {
                    name: name.clone(),
                    source,
                })?;
                descriptor = Some(Descriptor::from_bytes(&bytes)?);
            }
            EntryKind::Other => {
                other_files.insert(target);
            }
        }
    }

    let descriptor = descriptor.ok_or(DescriptorError::Missing)?;

    tracing::debug!(
        executables = executable_entries.len(),
        native_dirs = native_directories.len(),
        others = other_files.len(),
        loader = %descriptor.loader_class_name,
        "archive extracted"
    );

    Ok(ExtractionResult {
        executable_entries,
        native_directories,
        descriptor,
        other_files,
        extracted_files,
    })
}

fn write_entry<R: Read>(entry: &mut R, target: &Path, buf: &mut [u8]) -> io::Result<()> {
    let mut out = File::create(target)?;
    loop {
        let n = entry.read(buf)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use zip::write::SimpleFileOptions;

    fn build_archive(entries: &[(&str, &[u8])]) -> Cursor<Vec<u8>> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
        let mut cursor = zip.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    fn descriptor_bytes(loader: &str) -> Vec<u8> {
        Descriptor::new(loader).to_bytes().unwrap()
    }

    #[test]
    fn test_classify_rules() {
        assert_eq!(classify("dep.jar"), EntryKind::Executable);
        assert_eq!(classify("lib/foo.so"), EntryKind::NativeLibrary);
        assert_eq!(classify("bin/foo.dll"), EntryKind::NativeLibrary);
        assert_eq!(classify(DESCRIPTOR_ENTRY_NAME), EntryKind::Descriptor);
        assert_eq!(classify("weights.bin"), EntryKind::Other);
        // first match wins
        assert_eq!(classify("tool.jar.so"), EntryKind::Executable);
        // case-sensitive
        assert_eq!(classify("DEP.JAR"), EntryKind::Other);
    }

    #[test]
    fn test_two_jars_and_descriptor_classification() {
        let archive = build_archive(&[
            ("a.jar", b"aa"),
            ("b.jar", b"bb"),
            (DESCRIPTOR_ENTRY_NAME, &descriptor_bytes("X.Loader")),
        ]);
        let scratch = tempfile::tempdir().unwrap();

        let result = extract(archive, scratch.path(), DEFAULT_BUFFER_SIZE).unwrap();

        assert_eq!(result.executable_entries.len(), 2);
        assert!(result.native_directories.is_empty());
        assert!(result.other_files.is_empty());
        assert_eq!(result.descriptor.loader_class_name, "X.Loader");
        assert_eq!(
            result.executable_entries,
            vec![scratch.path().join("a.jar"), scratch.path().join("b.jar")]
        );
    }

    #[test]
    fn test_native_entry_contributes_scratch_directory() {
        let archive = build_archive(&[
            ("lib/foo.so", b"\x7fELF"),
            (DESCRIPTOR_ENTRY_NAME, &descriptor_bytes("X.Loader")),
        ]);
        let scratch = tempfile::tempdir().unwrap();

        let result = extract(archive, scratch.path(), DEFAULT_BUFFER_SIZE).unwrap();

        // lib/foo.so flattens to <scratch>/foo.so, whose parent is the scratch dir
        assert!(scratch.path().join("foo.so").is_file());
        assert_eq!(result.native_directories.len(), 1);
        assert!(result.native_directories.contains(scratch.path()));
    }

    #[test]
    fn test_colliding_base_names_last_entry_wins() {
        let archive = build_archive(&[
            ("one/data.bin", b"first"),
            ("two/data.bin", b"second"),
            (DESCRIPTOR_ENTRY_NAME, &descriptor_bytes("X.Loader")),
        ]);
        let scratch = tempfile::tempdir().unwrap();

        let result = extract(archive, scratch.path(), DEFAULT_BUFFER_SIZE).unwrap();

        assert_eq!(result.other_files.len(), 1);
        let content = fs::read(scratch.path().join("data.bin")).unwrap();
        assert_eq!(content, b"second");
    }

    #[test]
    fn test_missing_descriptor_is_fatal() {
        let archive = build_archive(&[("a.jar", b"aa")]);
        let scratch = tempfile::tempdir().unwrap();

        let result = extract(archive, scratch.path(), DEFAULT_BUFFER_SIZE);
        assert!(matches!(
            result,
            Err(ExtractError::Descriptor(DescriptorError::Missing))
        ));
    }

    #[test]
    fn test_malformed_descriptor_is_fatal() {
        let archive = build_archive(&[(DESCRIPTOR_ENTRY_NAME, b"not a single identifier")]);
        let scratch = tempfile::tempdir().unwrap();

        let result = extract(archive, scratch.path(), DEFAULT_BUFFER_SIZE);
        assert!(matches!(
            result,
            Err(ExtractError::Descriptor(DescriptorError::Malformed(_)))
        ));
    }

    #[test]
    fn test_tiny_buffer_still_extracts_correctly() {
        let payload = vec![0xabu8; 10_000];
        let archive = build_archive(&[
            ("weights.bin", &payload),
            (DESCRIPTOR_ENTRY_NAME, &descriptor_bytes("X.Loader")),
        ]);
        let scratch = tempfile::tempdir().unwrap();

        extract(archive, scratch.path(), 3).unwrap();
        assert_eq!(fs::read(scratch.path().join("weights.bin")).unwrap(), payload);
    }

    #[test]
    fn test_legacy_descriptor_in_container() {
        let archive = build_archive(&[(DESCRIPTOR_ENTRY_NAME, b"X.Loader")]);
        let scratch = tempfile::tempdir().unwrap();

        let result = extract(archive, scratch.path(), DEFAULT_BUFFER_SIZE).unwrap();
        assert_eq!(result.descriptor.loader_class_name, "X.Loader");
    }
}
