#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `diff` compares two installed-application trees by content and produces
//! the minimal set of files an incremental update package must carry. Each
//! regular file is fingerprinted with a streaming MD5 digest; a relative
//! path enters the result when it is new in the current tree or when its
//! digest differs from the previous tree.
//!
//! # Design
//!
//! [`scan_tree`] walks a root with hidden-entry filtering enabled and builds
//! a relative-path keyed [`TreeIndex`] of [`FileRecord`] values. [`compare`]
//! scans both roots and applies the inclusion rule. [`copy_diff`] replays a
//! [`DiffSet`] into a staging directory, creating intermediate directories
//! as needed.
//!
//! # Invariants
//!
//! - The comparison is additive: paths present only in the previous tree are
//!   never reported. Update packages add and replace files, they do not
//!   remove them.
//! - Hidden (`.`-prefixed) entries are excluded at every directory level of
//!   both scans, so platform metadata never enters a package.
//! - Relative paths are slash-separated and unique within a scan.
//!
//! # Errors
//!
//! All operations surface [`DiffError`], which wraps the walker, digest, and
//! copy failure sites with the offending paths attached. A file that
//! disappears between scan and copy is reported as a hard error; the copy
//! step never retries.

use std::fs;
use std::path::{Component, Path, PathBuf};

use checksums::Md5Digest;
use logging::{InfoFlag, emit_info, info_gte};
use rustc_hash::FxHashMap;
use walk::WalkBuilder;

/// A scanned file: where it lives, its scan-relative key, and its digest.
#[derive(Clone, Debug)]
pub struct FileRecord {
    absolute_path: PathBuf,
    relative_path: String,
    digest: Md5Digest,
}

impl FileRecord {
    /// Returns the absolute path of the scanned file.
    #[must_use]
    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    /// Returns the slash-separated path relative to the scan root.
    #[must_use]
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Returns the file's content digest.
    #[must_use]
    pub const fn digest(&self) -> &Md5Digest {
        &self.digest
    }
}

/// Relative-path keyed index of every regular file under a scan root.
pub type TreeIndex = FxHashMap<String, FileRecord>;

/// The files an incremental update package must carry.
///
/// Maps relative path to the record from the *current* tree. Iteration order
/// is unspecified; callers needing determinism sort the keys.
#[derive(Clone, Debug, Default)]
pub struct DiffSet {
    entries: FxHashMap<String, FileRecord>,
}

impl DiffSet {
    /// Number of changed or added files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the trees were content-identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `relative_path` is part of the update set.
    #[must_use]
    pub fn contains(&self, relative_path: &str) -> bool {
        self.entries.contains_key(relative_path)
    }

    /// Iterates over the records in the update set.
    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.entries.values()
    }

    /// Relative paths in the update set, sorted for stable output.
    #[must_use]
    pub fn sorted_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

/// Error raised during tree scanning, comparison, or diff replay.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// Walking a scan root failed.
    #[error(transparent)]
    Walk(#[from] walk::WalkError),
    /// Digesting a file's content failed.
    #[error(transparent)]
    Digest(#[from] checksums::DigestError),
    /// A scanned path was not valid UTF-8 and cannot key a diff set.
    #[error("scanned path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },
    /// Creating an intermediate staging directory failed.
    #[error("failed to create staging directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Copying a changed file into the staging tree failed.
    ///
    /// Also raised when a file recorded during the scan has disappeared by
    /// copy time.
    #[error("failed to copy {src} to {dst}: {source}")]
    Copy {
        /// Source file from the current tree.
        src: PathBuf,
        /// Staging destination.
        dst: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

fn relative_key(relative: &Path) -> Result<String, DiffError> {
    let mut key = String::new();
    for component in relative.components() {
        let Component::Normal(part) = component else {
            continue;
        };
        let Some(part) = part.to_str() else {
            return Err(DiffError::NonUtf8Path {
                path: relative.to_path_buf(),
            });
        };
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(part);
    }
    Ok(key)
}

/// Scans every regular file under `root` into a [`TreeIndex`].
///
/// Hidden entries are skipped at every level; directories contribute no
/// records of their own. The digest of each file is computed by streaming,
/// so scan memory stays flat for large payloads.
pub fn scan_tree(root: &Path) -> Result<TreeIndex, DiffError> {
    let walker = WalkBuilder::new(root)
        .include_root(false)
        .skip_hidden(true)
        .build()?;

    let mut index = TreeIndex::default();
    for entry in walker {
        let entry = entry?;
        if !entry.metadata().file_type().is_file() {
            continue;
        }
        let relative_path = relative_key(entry.relative_path())?;
        let digest = checksums::file_digest(entry.full_path())?;
        index.insert(
            relative_path.clone(),
            FileRecord {
                absolute_path: entry.full_path().to_path_buf(),
                relative_path,
                digest,
            },
        );
    }
    Ok(index)
}

/// Compares two trees and returns the incremental update set.
///
/// A relative path is included iff it exists only under `new_root`, or it
/// exists under both roots with differing digests. Paths present only under
/// `old_root` are not reported.
pub fn compare(old_root: &Path, new_root: &Path) -> Result<DiffSet, DiffError> {
    let old_index = scan_tree(old_root)?;
    let new_index = scan_tree(new_root)?;
    let scanned = new_index.len();

    let mut entries = FxHashMap::default();
    for (relative_path, record) in new_index {
        let changed = match old_index.get(&relative_path) {
            None => true,
            Some(previous) => previous.digest() != record.digest(),
        };
        if changed {
            entries.insert(relative_path, record);
        }
    }

    if info_gte(InfoFlag::Diff, 1) {
        emit_info(
            InfoFlag::Diff,
            1,
            format!("{} changed or added of {scanned} scanned", entries.len()),
        );
    }

    Ok(DiffSet { entries })
}

/// Replays a [`DiffSet`] into `dest_root`, returning the number of files copied.
///
/// Every record's current-tree file is copied to `dest_root` under its
/// relative path. Intermediate directories are created on demand. A source
/// that vanished since the scan fails the whole replay.
pub fn copy_diff(diff: &DiffSet, dest_root: &Path) -> Result<u64, DiffError> {
    let mut copied = 0_u64;
    for record in diff.iter() {
        let dest = dest_root.join(record.relative_path());
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| DiffError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::copy(record.absolute_path(), &dest).map_err(|source| DiffError::Copy {
            src: record.absolute_path().to_path_buf(),
            dst: dest.clone(),
            source,
        })?;
        copied += 1;

        if info_gte(InfoFlag::Copy, 1) {
            emit_info(InfoFlag::Copy, 1, record.relative_path().to_owned());
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
        for (relative, contents) in files {
            let path = root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, contents).unwrap();
        }
    }

    #[test]
    fn compare_reports_added_and_changed_only() {
        let temp = tempfile::tempdir().unwrap();
        let old = temp.path().join("old");
        let new = temp.path().join("new");
        write_tree(
            &old,
            &[
                ("README.md", b"v1"),
                ("unchanged.txt", b"same"),
                ("removed.txt", b"gone in new"),
            ],
        );
        write_tree(
            &new,
            &[
                ("README.md", b"v2"),
                ("unchanged.txt", b"same"),
                ("LICENSE", b"MIT"),
            ],
        );

        let diff = compare(&old, &new).unwrap();
        assert_eq!(diff.len(), 2);
        assert!(diff.contains("README.md"));
        assert!(diff.contains("LICENSE"));
        assert!(!diff.contains("unchanged.txt"));
        assert!(!diff.contains("removed.txt"));
    }

    #[test]
    fn compare_of_identical_trees_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("tree");
        write_tree(&root, &[("a.txt", b"a"), ("sub/b.txt", b"b")]);

        let diff = compare(&root, &root).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn nested_paths_use_slash_keys() {
        let temp = tempfile::tempdir().unwrap();
        let old = temp.path().join("old");
        let new = temp.path().join("new");
        fs::create_dir_all(&old).unwrap();
        write_tree(&new, &[("app/Contents/Info.plist", b"<plist/>")]);

        let diff = compare(&old, &new).unwrap();
        assert!(diff.contains("app/Contents/Info.plist"));
    }

    #[test]
    fn hidden_entries_never_enter_the_diff() {
        let temp = tempfile::tempdir().unwrap();
        let old = temp.path().join("old");
        let new = temp.path().join("new");
        fs::create_dir_all(&old).unwrap();
        write_tree(
            &new,
            &[
                (".DS_Store", b"junk"),
                ("sub/.hidden", b"junk"),
                ("sub/real.txt", b"data"),
            ],
        );
        fs::create_dir_all(new.join(".git")).unwrap();
        fs::write(new.join(".git/config"), b"junk").unwrap();

        let diff = compare(&old, &new).unwrap();
        assert_eq!(diff.sorted_paths(), vec!["sub/real.txt"]);
    }

    #[test]
    fn copy_diff_reproduces_new_tree_content() {
        let temp = tempfile::tempdir().unwrap();
        let old = temp.path().join("old");
        let new = temp.path().join("new");
        let staging = temp.path().join("staging");
        write_tree(&old, &[("README.md", b"v1")]);
        write_tree(&new, &[("README.md", b"v2"), ("docs/LICENSE", b"MIT")]);

        let diff = compare(&old, &new).unwrap();
        let copied = copy_diff(&diff, &staging).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read(staging.join("README.md")).unwrap(), b"v2");
        assert_eq!(fs::read(staging.join("docs/LICENSE")).unwrap(), b"MIT");
    }

    #[test]
    fn copy_diff_fails_when_source_vanished() {
        let temp = tempfile::tempdir().unwrap();
        let old = temp.path().join("old");
        let new = temp.path().join("new");
        let staging = temp.path().join("staging");
        fs::create_dir_all(&old).unwrap();
        write_tree(&new, &[("late.txt", b"present at scan")]);

        let diff = compare(&old, &new).unwrap();
        fs::remove_file(new.join("late.txt")).unwrap();

        let err = copy_diff(&diff, &staging).unwrap_err();
        assert!(matches!(err, DiffError::Copy { .. }));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeMap;

        fn file_name() -> impl Strategy<Value = String> {
            "[a-z]{1,8}\\.txt"
        }

        fn tree_contents() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
            proptest::collection::btree_map(
                file_name(),
                proptest::collection::vec(any::<u8>(), 0..64),
                0..6,
            )
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn diff_matches_set_logic(
                old_files in tree_contents(),
                new_files in tree_contents(),
            ) {
                let temp = tempfile::tempdir().unwrap();
                let old = temp.path().join("old");
                let new = temp.path().join("new");
                fs::create_dir_all(&old).unwrap();
                fs::create_dir_all(&new).unwrap();
                for (name, contents) in &old_files {
                    fs::write(old.join(name), contents).unwrap();
                }
                for (name, contents) in &new_files {
                    fs::write(new.join(name), contents).unwrap();
                }

                let diff = compare(&old, &new).unwrap();

                for (name, contents) in &new_files {
                    let expected = match old_files.get(name) {
                        None => true,
                        Some(previous) => previous != contents,
                    };
                    prop_assert_eq!(diff.contains(name), expected);
                }
                for name in old_files.keys() {
                    if !new_files.contains_key(name) {
                        prop_assert!(!diff.contains(name));
                    }
                }
            }
        }
    }
}
