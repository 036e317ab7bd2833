#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `archive` packages update payloads as gzip-compressed tarballs and
//! extracts them again on the receiving side. Archive members are stored
//! relative to the payload root, so extracting into a directory reproduces
//! the payload contents directly without an extra wrapping directory.
//!
//! # Design
//!
//! - [`compress`] normalizes the source before packaging: a directory is
//!   stored as its contents at the archive root, and a lone file is stored
//!   under its base name. A stale archive at the target path is deleted
//!   before the new one is written, never appended to.
//! - Staging trees produced by upstream tooling sometimes wrap the real
//!   payload in a single intermediate directory. When the source directory
//!   holds exactly one child and that child is a directory, packaging
//!   descends into it and archives the inner contents instead.
//! - Headers are written deterministically: zero mtime, zero owner, and
//!   explicit modes, so identical payloads produce byte-identical archives.
//! - [`decompress`] creates the destination directory if needed and unpacks
//!   the full archive into it.
//!
//! # Errors
//!
//! All operations surface [`ArchiveError`] values naming the path involved
//! together with the underlying [`std::io::Error`].

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use logging::{DebugFlag, debug_gte, emit_debug};
use tar::{Builder, EntryType, Header, HeaderMode};
use walk::{WalkBuilder, WalkError};

/// Error raised while packaging or unpacking an archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The payload to package does not exist or cannot be inspected.
    #[error("cannot package {path}: {source}")]
    SourceUnreadable {
        /// Payload path that could not be inspected.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// A stale archive at the target path could not be removed.
    #[error("failed to remove stale archive {path}: {source}")]
    RemoveStale {
        /// Archive path that could not be removed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The archive file could not be created.
    #[error("failed to create archive {path}: {source}")]
    Create {
        /// Archive path that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Traversal of the payload directory failed.
    #[error(transparent)]
    Walk(#[from] WalkError),
    /// A payload file could not be opened for packaging.
    #[error("failed to open {path} for packaging: {source}")]
    OpenEntry {
        /// Payload file that could not be opened.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Writing an entry into the archive failed.
    #[error("failed to append {path} to archive: {source}")]
    Append {
        /// Payload path whose entry could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The archive stream could not be finalized.
    #[error("failed to finalize archive {path}: {source}")]
    Finish {
        /// Archive path that could not be finalized.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The archive could not be opened for extraction.
    #[error("failed to open archive {path}: {source}")]
    Open {
        /// Archive path that could not be opened.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The extraction destination could not be created.
    #[error("failed to create destination {path}: {source}")]
    CreateDest {
        /// Destination directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Unpacking the archive contents failed.
    #[error("failed to unpack archive {path}: {source}")]
    Unpack {
        /// Archive path whose contents could not be unpacked.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Packages `source` into a gzip tarball at `archive_path`.
///
/// A directory source is stored as its contents at the archive root. A file
/// source is stored as a single entry under its base name. Any existing
/// archive at `archive_path` is removed first.
pub fn compress(source: &Path, archive_path: &Path) -> Result<(), ArchiveError> {
    let metadata = fs::metadata(source).map_err(|source_err| ArchiveError::SourceUnreadable {
        path: source.to_path_buf(),
        source: source_err,
    })?;

    if archive_path.exists() {
        fs::remove_file(archive_path).map_err(|source_err| ArchiveError::RemoveStale {
            path: archive_path.to_path_buf(),
            source: source_err,
        })?;
        if debug_gte(DebugFlag::Archive, 2) {
            emit_debug(
                DebugFlag::Archive,
                2,
                format!("removed stale archive {}", archive_path.display()),
            );
        }
    }

    if debug_gte(DebugFlag::Archive, 1) {
        emit_debug(
            DebugFlag::Archive,
            1,
            format!(
                "packaging {} into {}",
                source.display(),
                archive_path.display()
            ),
        );
    }

    let file = File::create(archive_path).map_err(|source_err| ArchiveError::Create {
        path: archive_path.to_path_buf(),
        source: source_err,
    })?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);
    builder.mode(HeaderMode::Deterministic);

    if metadata.is_dir() {
        let root = collapse_single_child(source)?;
        append_directory_contents(&mut builder, &root)?;
    } else {
        let name = source
            .file_name()
            .map_or_else(|| PathBuf::from("payload"), PathBuf::from);
        append_file_entry(&mut builder, source, &name, &metadata)?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|source_err| ArchiveError::Finish {
            path: archive_path.to_path_buf(),
            source: source_err,
        })?;
    encoder
        .finish()
        .map_err(|source_err| ArchiveError::Finish {
            path: archive_path.to_path_buf(),
            source: source_err,
        })?;
    Ok(())
}

/// Unpacks the gzip tarball at `archive_path` into `dest_dir`.
///
/// The destination directory is created if it does not exist yet.
pub fn decompress(archive_path: &Path, dest_dir: &Path) -> Result<(), ArchiveError> {
    fs::create_dir_all(dest_dir).map_err(|source_err| ArchiveError::CreateDest {
        path: dest_dir.to_path_buf(),
        source: source_err,
    })?;

    let file = File::open(archive_path).map_err(|source_err| ArchiveError::Open {
        path: archive_path.to_path_buf(),
        source: source_err,
    })?;

    if debug_gte(DebugFlag::Archive, 1) {
        emit_debug(
            DebugFlag::Archive,
            1,
            format!(
                "unpacking {} into {}",
                archive_path.display(),
                dest_dir.display()
            ),
        );
    }

    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive
        .unpack(dest_dir)
        .map_err(|source_err| ArchiveError::Unpack {
            path: archive_path.to_path_buf(),
            source: source_err,
        })?;
    Ok(())
}

/// Descends through lone wrapping directories to the real payload root.
fn collapse_single_child(source: &Path) -> Result<PathBuf, ArchiveError> {
    let mut root = source.to_path_buf();
    loop {
        let mut entries = Vec::new();
        let read_dir = fs::read_dir(&root).map_err(|err| ArchiveError::SourceUnreadable {
            path: root.clone(),
            source: err,
        })?;
        for entry in read_dir {
            let entry = entry.map_err(|err| ArchiveError::SourceUnreadable {
                path: root.clone(),
                source: err,
            })?;
            entries.push(entry.path());
        }

        match entries.as_slice() {
            [only] if only.is_dir() => {
                if debug_gte(DebugFlag::Archive, 2) {
                    emit_debug(
                        DebugFlag::Archive,
                        2,
                        format!("collapsing into lone subdirectory {}", only.display()),
                    );
                }
                root = only.clone();
            }
            _ => return Ok(root),
        }
    }
}

fn append_directory_contents<W: io::Write>(
    builder: &mut Builder<W>,
    root: &Path,
) -> Result<(), ArchiveError> {
    let walker = WalkBuilder::new(root)
        .include_root(false)
        .follow_symlinks(true)
        .build()?;

    for entry in walker {
        let entry = entry?;
        if entry.metadata().is_dir() {
            append_directory_entry(builder, entry.relative_path(), entry.metadata())?;
        } else {
            append_file_entry(
                builder,
                entry.full_path(),
                entry.relative_path(),
                entry.metadata(),
            )?;
        }
    }
    Ok(())
}

fn append_directory_entry<W: io::Write>(
    builder: &mut Builder<W>,
    relative: &Path,
    metadata: &fs::Metadata,
) -> Result<(), ArchiveError> {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Directory);
    header.set_mode(entry_mode(metadata, 0o755));
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header.set_size(0);
    builder
        .append_data(&mut header, relative, io::empty())
        .map_err(|err| ArchiveError::Append {
            path: relative.to_path_buf(),
            source: err,
        })
}

fn append_file_entry<W: io::Write>(
    builder: &mut Builder<W>,
    full: &Path,
    relative: &Path,
    metadata: &fs::Metadata,
) -> Result<(), ArchiveError> {
    let mut file = File::open(full).map_err(|err| ArchiveError::OpenEntry {
        path: full.to_path_buf(),
        source: err,
    })?;

    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_mode(entry_mode(metadata, 0o644));
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header.set_size(metadata.len());

    if debug_gte(DebugFlag::Archive, 2) {
        emit_debug(
            DebugFlag::Archive,
            2,
            format!("adding {} ({} bytes)", relative.display(), metadata.len()),
        );
    }

    builder
        .append_data(&mut header, relative, &mut file)
        .map_err(|err| ArchiveError::Append {
            path: full.to_path_buf(),
            source: err,
        })
}

#[cfg(unix)]
fn entry_mode(metadata: &fs::Metadata, _default: u32) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn entry_mode(_metadata: &fs::Metadata, default: u32) -> u32 {
    default
}
