#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `walk` provides the deterministic filesystem traversal used when scanning
//! installed-application trees for comparison and packaging. The walker
//! enumerates regular files, directories, and symbolic links while enforcing
//! relative-path constraints so callers cannot accidentally escape the
//! configured root. Ordering stays stable across platforms because directory
//! entries are sorted lexicographically before being yielded.
//!
//! # Design
//!
//! - [`WalkBuilder`] configures traversal options: whether the root entry is
//!   emitted, whether directory symlinks are followed, and whether hidden
//!   entries are skipped.
//! - [`Walker`] implements [`Iterator`] and yields [`WalkEntry`] values in
//!   depth-first order, finishing a directory's subtree before moving to the
//!   next sibling.
//! - Hidden-entry filtering is two-phase: each directory listing is read in
//!   full, filtered, and sorted before any recursion happens, so the filter
//!   applies uniformly at every depth.
//! - [`WalkError`] describes I/O failures encountered while querying metadata
//!   or reading directories, capturing the offending path.
//!
//! # Invariants
//!
//! - Returned [`WalkEntry`] values always reference paths inside the
//!   configured root; relative paths never contain `..` segments.
//! - When hidden filtering is enabled, a name beginning with `.` is skipped
//!   no matter how deep in the tree it appears. The root itself is exempt.
//! - Directory entries are yielded exactly once. When symlink following is
//!   enabled, canonical paths are tracked to avoid cycles.
//!
//! # Errors
//!
//! Traversal emits [`WalkError`] when filesystem metadata cannot be queried
//! or directory contents cannot be read. [`WalkError::kind`] exposes the
//! failing site; [`std::error::Error::source`] yields the original
//! [`io::Error`].

use std::collections::HashSet;
use std::error::Error;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use logging::{DebugFlag, debug_gte, emit_debug};

/// Reports whether a file name uses the hidden-entry convention.
///
/// A name is hidden when its first byte is `.`. The special `.` and `..`
/// markers never reach this check because `read_dir` does not produce them.
#[must_use]
pub fn is_hidden_name(name: &OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&b'.')
}

/// Configures a filesystem traversal rooted at a specific path.
#[derive(Clone, Debug)]
pub struct WalkBuilder {
    root: PathBuf,
    follow_symlinks: bool,
    include_root: bool,
    skip_hidden: bool,
}

impl WalkBuilder {
    /// Creates a new builder that will traverse the provided root path.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
            include_root: true,
            skip_hidden: false,
        }
    }

    /// Configures whether directory symlinks should be traversed.
    ///
    /// The walker always yields the symlink entry itself. When enabled and
    /// the symlink points to a directory, the walker also descends into the
    /// target while keeping the symlink's relative path in emitted entries.
    #[must_use]
    pub const fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Controls whether the root entry should be included in the output.
    ///
    /// When disabled, traversal starts directly with the root's children.
    #[must_use]
    pub const fn include_root(mut self, include: bool) -> Self {
        self.include_root = include;
        self
    }

    /// Controls whether hidden (`.`-prefixed) entries are skipped.
    ///
    /// The filter runs on every directory listing before recursion, so a
    /// hidden directory's entire subtree is excluded.
    #[must_use]
    pub const fn skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Builds a [`Walker`] using the configured options.
    pub fn build(self) -> Result<Walker, WalkError> {
        let root = absolutize(self.root.clone())?;
        let metadata = fs::symlink_metadata(&root)
            .map_err(|error| WalkError::root_metadata(root.clone(), error))?;

        let mut walker = Walker {
            root,
            follow_symlinks: self.follow_symlinks,
            skip_hidden: self.skip_hidden,
            yielded_root: !self.include_root,
            root_metadata: Some(metadata),
            stack: Vec::new(),
            visited: HashSet::new(),
            finished: false,
        };

        if walker
            .root_metadata
            .as_ref()
            .is_some_and(|m| m.file_type().is_dir())
        {
            walker.push_directory(walker.root.clone(), PathBuf::new(), 0)?;
        }

        Ok(walker)
    }
}

/// Depth-first iterator over filesystem entries.
pub struct Walker {
    root: PathBuf,
    follow_symlinks: bool,
    skip_hidden: bool,
    yielded_root: bool,
    root_metadata: Option<fs::Metadata>,
    stack: Vec<DirectoryState>,
    visited: HashSet<PathBuf>,
    finished: bool,
}

impl Walker {
    fn push_directory(
        &mut self,
        fs_path: PathBuf,
        relative_prefix: PathBuf,
        depth: usize,
    ) -> Result<(), WalkError> {
        let canonical = fs::canonicalize(&fs_path)
            .map_err(|error| WalkError::canonicalize(fs_path.clone(), error))?;
        if !self.visited.insert(canonical) {
            return Ok(());
        }

        let state = DirectoryState::new(fs_path, relative_prefix, depth, self.skip_hidden)?;
        self.stack.push(state);
        Ok(())
    }

    fn prepare_entry(
        &mut self,
        full_path: PathBuf,
        relative_path: PathBuf,
        depth: usize,
    ) -> Result<WalkEntry, WalkError> {
        let metadata = fs::symlink_metadata(&full_path)
            .map_err(|error| WalkError::metadata(full_path.clone(), error))?;
        let mut next_state = None;

        if metadata.file_type().is_dir() {
            next_state = Some((full_path.clone(), relative_path.clone(), depth));
        } else if metadata.file_type().is_symlink() && self.follow_symlinks {
            match fs::metadata(&full_path) {
                Ok(target) if target.is_dir() => {
                    let canonical = fs::canonicalize(&full_path)
                        .map_err(|error| WalkError::canonicalize(full_path.clone(), error))?;
                    next_state = Some((canonical, relative_path.clone(), depth));
                }
                Ok(_) => {}
                Err(error) => {
                    return Err(WalkError::metadata(full_path.clone(), error));
                }
            }
        }

        if let Some((dir_path, rel_prefix, dir_depth)) = next_state {
            self.push_directory(dir_path, rel_prefix, dir_depth)?;
        }

        Ok(WalkEntry {
            full_path,
            relative_path,
            metadata,
            depth,
            is_root: false,
        })
    }
}

impl Iterator for Walker {
    type Item = Result<WalkEntry, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if !self.yielded_root {
            self.yielded_root = true;
            if let Some(metadata) = self.root_metadata.take() {
                let entry = WalkEntry {
                    full_path: self.root.clone(),
                    relative_path: PathBuf::new(),
                    metadata,
                    depth: 0,
                    is_root: true,
                };
                return Some(Ok(entry));
            }
        }

        loop {
            let (full_path, relative_path, depth) = {
                let state = self.stack.last_mut()?;

                if let Some(name) = state.next_name() {
                    let full_path = state.fs_path.join(&name);
                    let relative_path = if state.relative_prefix.as_os_str().is_empty() {
                        PathBuf::from(&name)
                    } else {
                        let mut rel = state.relative_prefix.clone();
                        rel.push(&name);
                        rel
                    };
                    (full_path, relative_path, state.depth + 1)
                } else {
                    self.stack.pop();
                    continue;
                }
            };

            match self.prepare_entry(full_path, relative_path, depth) {
                Ok(entry) => return Some(Ok(entry)),
                Err(error) => {
                    self.finished = true;
                    return Some(Err(error));
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
struct DirectoryState {
    fs_path: PathBuf,
    relative_prefix: PathBuf,
    entries: Vec<OsString>,
    index: usize,
    depth: usize,
}

impl DirectoryState {
    fn new(
        fs_path: PathBuf,
        relative_prefix: PathBuf,
        depth: usize,
        skip_hidden: bool,
    ) -> Result<Self, WalkError> {
        // Phase one: read the full listing. Phase two: filter, then sort.
        // Recursion only ever sees the filtered copy.
        let mut entries = Vec::new();
        let read_dir =
            fs::read_dir(&fs_path).map_err(|error| WalkError::read_dir(fs_path.clone(), error))?;
        for entry in read_dir {
            let entry = entry.map_err(|error| WalkError::read_dir_entry(fs_path.clone(), error))?;
            let name = entry.file_name();
            if skip_hidden && is_hidden_name(&name) {
                continue;
            }
            entries.push(name);
        }
        entries.sort();

        if debug_gte(DebugFlag::Walk, 2) {
            emit_debug(
                DebugFlag::Walk,
                2,
                format!("listed {} entries in {}", entries.len(), fs_path.display()),
            );
        }

        Ok(Self {
            fs_path,
            relative_prefix,
            entries,
            index: 0,
            depth,
        })
    }

    fn next_name(&mut self) -> Option<OsString> {
        if let Some(name) = self.entries.get(self.index) {
            self.index += 1;
            Some(name.clone())
        } else {
            None
        }
    }
}

/// Result of a filesystem traversal step.
#[derive(Debug)]
pub struct WalkEntry {
    full_path: PathBuf,
    relative_path: PathBuf,
    metadata: fs::Metadata,
    depth: usize,
    is_root: bool,
}

impl WalkEntry {
    /// Returns the absolute path to the filesystem entry.
    #[must_use]
    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    /// Returns the path relative to the traversal root.
    #[must_use]
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    /// Provides access to the [`fs::Metadata`] captured for the entry.
    #[must_use]
    pub fn metadata(&self) -> &fs::Metadata {
        &self.metadata
    }

    /// Reports the depth of the entry relative to the root (root depth is `0`).
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Indicates whether this entry corresponds to the traversal root.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.is_root
    }
}

/// Error returned when traversal fails.
#[derive(Debug)]
pub struct WalkError {
    kind: WalkErrorKind,
}

impl WalkError {
    fn new(kind: WalkErrorKind) -> Self {
        Self { kind }
    }

    fn root_metadata(path: PathBuf, source: io::Error) -> Self {
        Self::new(WalkErrorKind::RootMetadata { path, source })
    }

    fn read_dir(path: PathBuf, source: io::Error) -> Self {
        Self::new(WalkErrorKind::ReadDir { path, source })
    }

    fn read_dir_entry(path: PathBuf, source: io::Error) -> Self {
        Self::new(WalkErrorKind::ReadDirEntry { path, source })
    }

    fn metadata(path: PathBuf, source: io::Error) -> Self {
        Self::new(WalkErrorKind::Metadata { path, source })
    }

    fn canonicalize(path: PathBuf, source: io::Error) -> Self {
        Self::new(WalkErrorKind::Canonicalize { path, source })
    }

    /// Returns the specific failure that terminated traversal.
    #[must_use]
    pub fn kind(&self) -> &WalkErrorKind {
        &self.kind
    }
}

impl fmt::Display for WalkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WalkErrorKind::RootMetadata { path, source } => {
                write!(
                    f,
                    "failed to inspect scan root '{}': {}",
                    path.display(),
                    source
                )
            }
            WalkErrorKind::ReadDir { path, source } => {
                write!(
                    f,
                    "failed to read directory '{}': {}",
                    path.display(),
                    source
                )
            }
            WalkErrorKind::ReadDirEntry { path, source } => {
                write!(
                    f,
                    "failed to read entry in '{}': {}",
                    path.display(),
                    source
                )
            }
            WalkErrorKind::Metadata { path, source } => {
                write!(
                    f,
                    "failed to inspect metadata for '{}': {}",
                    path.display(),
                    source
                )
            }
            WalkErrorKind::Canonicalize { path, source } => {
                write!(f, "failed to canonicalize '{}': {}", path.display(), source)
            }
        }
    }
}

impl Error for WalkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            WalkErrorKind::RootMetadata { source, .. }
            | WalkErrorKind::ReadDir { source, .. }
            | WalkErrorKind::ReadDirEntry { source, .. }
            | WalkErrorKind::Metadata { source, .. }
            | WalkErrorKind::Canonicalize { source, .. } => Some(source),
        }
    }
}

/// Classification of traversal failures.
#[derive(Debug)]
pub enum WalkErrorKind {
    /// Failed to query metadata for the traversal root.
    RootMetadata {
        /// Path that failed to provide metadata.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// Failed to read the contents of a directory.
    ReadDir {
        /// Directory whose contents could not be read.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// Failed to obtain a directory entry during iteration.
    ReadDirEntry {
        /// Directory containing the problematic entry.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// Failed to retrieve metadata for an entry.
    Metadata {
        /// Path whose metadata could not be retrieved.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// Failed to canonicalize a directory path while preventing cycles.
    Canonicalize {
        /// Directory path that failed to canonicalize.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
}

fn absolutize(path: PathBuf) -> Result<PathBuf, WalkError> {
    if path.is_absolute() {
        Ok(path)
    } else {
        let cwd = std::env::current_dir()
            .map_err(|error| WalkError::canonicalize(PathBuf::from("."), error))?;
        Ok(cwd.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn collect_relative_paths(mut walker: Walker) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        while let Some(entry) = walker.next() {
            let entry = entry.expect("walker entry");
            if entry.is_root() {
                continue;
            }
            paths.push(entry.relative_path().to_path_buf());
        }
        paths
    }

    #[test]
    fn walk_errors_when_root_missing() {
        let builder = WalkBuilder::new("/nonexistent/path/for/walker");
        let error = match builder.build() {
            Ok(_) => panic!("missing root should fail"),
            Err(error) => error,
        };
        assert!(matches!(error.kind(), WalkErrorKind::RootMetadata { .. }));
    }

    #[test]
    fn walk_single_file_emits_root_entry() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("file.txt");
        fs::write(&file, b"contents").expect("write");

        let mut walker = WalkBuilder::new(&file).build().expect("build walker");
        let entry = walker.next().expect("entry").expect("entry ok");
        assert!(entry.is_root());
        assert!(entry.relative_path().as_os_str().is_empty());
        assert_eq!(entry.full_path(), file);
        assert!(walker.next().is_none());
    }

    #[test]
    fn walk_directory_yields_deterministic_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("root");
        fs::create_dir(&root).expect("create root");
        let dir_a = root.join("a");
        let dir_b = root.join("b");
        let file_c = root.join("c.txt");
        fs::create_dir(&dir_a).expect("dir a");
        fs::create_dir(&dir_b).expect("dir b");
        fs::write(dir_a.join("inner.txt"), b"data").expect("write inner");
        fs::write(&file_c, b"data").expect("write file");

        let walker = WalkBuilder::new(&root).build().expect("build walker");
        let paths = collect_relative_paths(walker);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("a"),
                PathBuf::from("a/inner.txt"),
                PathBuf::from("b"),
                PathBuf::from("c.txt"),
            ]
        );
    }

    #[test]
    fn hidden_entries_are_kept_by_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("root");
        fs::create_dir(&root).expect("create root");
        fs::write(root.join(".marker"), b"x").expect("write hidden");
        fs::write(root.join("kept.txt"), b"x").expect("write kept");

        let walker = WalkBuilder::new(&root).build().expect("build walker");
        let paths = collect_relative_paths(walker);
        assert_eq!(
            paths,
            vec![PathBuf::from(".marker"), PathBuf::from("kept.txt")]
        );
    }

    #[test]
    fn skip_hidden_filters_every_level() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("root");
        let nested = root.join("sub");
        let hidden_dir = root.join(".git");
        fs::create_dir_all(&nested).expect("create nested");
        fs::create_dir(&hidden_dir).expect("create hidden dir");
        fs::write(root.join(".DS_Store"), b"x").expect("top hidden file");
        fs::write(nested.join(".hidden"), b"x").expect("nested hidden file");
        fs::write(nested.join("visible.txt"), b"x").expect("nested visible");
        fs::write(hidden_dir.join("config"), b"x").expect("file in hidden dir");

        let walker = WalkBuilder::new(&root)
            .skip_hidden(true)
            .build()
            .expect("build walker");
        let paths = collect_relative_paths(walker);
        assert_eq!(
            paths,
            vec![PathBuf::from("sub"), PathBuf::from("sub/visible.txt")]
        );
    }

    #[test]
    fn skip_hidden_does_not_filter_hidden_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join(".app");
        fs::create_dir(&root).expect("create root");
        fs::write(root.join("payload.txt"), b"x").expect("write payload");

        let walker = WalkBuilder::new(&root)
            .skip_hidden(true)
            .build()
            .expect("build walker");
        let paths = collect_relative_paths(walker);
        assert_eq!(paths, vec![PathBuf::from("payload.txt")]);
    }

    #[cfg(unix)]
    #[test]
    fn walk_does_not_follow_symlink_by_default() {
        use std::os::unix::fs::symlink;

        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("root");
        let target = temp.path().join("target");
        fs::create_dir(&root).expect("create root");
        fs::create_dir(&target).expect("create target");
        fs::write(target.join("inner.txt"), b"data").expect("write inner");
        symlink(&target, root.join("link")).expect("create symlink");

        let walker = WalkBuilder::new(&root).build().expect("build walker");
        let paths = collect_relative_paths(walker);
        assert_eq!(paths, vec![PathBuf::from("link")]);
    }

    #[cfg(unix)]
    #[test]
    fn walk_follows_symlink_when_enabled() {
        use std::os::unix::fs::symlink;

        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("root");
        let target = temp.path().join("target");
        fs::create_dir(&root).expect("create root");
        fs::create_dir(&target).expect("create target");
        fs::write(target.join("inner.txt"), b"data").expect("write inner");
        symlink(&target, root.join("link")).expect("create symlink");

        let walker = WalkBuilder::new(&root)
            .follow_symlinks(true)
            .build()
            .expect("build walker");
        let paths = collect_relative_paths(walker);
        assert_eq!(
            paths,
            vec![PathBuf::from("link"), PathBuf::from("link/inner.txt")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn walk_detects_symlink_cycles() {
        use std::os::unix::fs::symlink;

        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("root");
        fs::create_dir(&root).expect("create root");
        let _ = symlink(&root, root.join("self"));

        let walker = WalkBuilder::new(&root)
            .follow_symlinks(true)
            .build()
            .expect("build walker");
        let paths = collect_relative_paths(walker);
        assert_eq!(paths, vec![PathBuf::from("self")]);
    }
}
