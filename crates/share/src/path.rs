//! Wire path construction and artifact filtering.
//!
//! Remote paths travel as slash-separated strings relative to the share
//! root. Every client path is validated and joined with the working
//! subtree here, in one place, before it reaches the wire.

use std::path::{Component, Path};

use crate::ShareError;

/// Names treated as nonexistent on the remote side.
///
/// These are share-side litter: tombstones and OS metadata droppings that
/// must never influence queries, listings, or transfers.
pub const EXCLUDED_ARTIFACTS: [&str; 6] = [
    ".deleted",
    "Thumbs.db",
    "__MACOSX",
    ".DS_Store",
    "._.DS_Store",
    "desktop.ini",
];

/// Reports whether `name` is an excluded artifact.
#[must_use]
pub fn is_excluded_artifact(name: &str) -> bool {
    EXCLUDED_ARTIFACTS.contains(&name)
}

/// Validates `path` and joins it onto `subtree` as a wire path.
///
/// Rejects absolute paths and any `..` component. `.` components are
/// dropped. An empty result addresses the subtree root itself.
pub fn wire_path(subtree: &str, path: &Path) -> Result<String, ShareError> {
    let mut segments: Vec<&str> = if subtree.is_empty() {
        Vec::new()
    } else {
        subtree.split('/').collect()
    };

    for component in path.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| ShareError::NonUtf8Path {
                    path: path.to_path_buf(),
                })?;
                segments.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ShareError::PathEscape {
                    path: path.to_path_buf(),
                });
            }
        }
    }

    Ok(segments.join("/"))
}

/// Joins a child name onto an existing wire path.
#[must_use]
pub fn join_wire(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_owned()
    } else {
        format!("{base}/{name}")
    }
}

/// Returns the final segment of a wire path.
#[must_use]
pub fn final_segment(wire: &str) -> &str {
    wire.rsplit('/').next().unwrap_or(wire)
}

/// Returns everything before the final segment, empty at the top level.
#[must_use]
pub fn parent_wire(wire: &str) -> &str {
    wire.rfind('/').map_or("", |index| &wire[..index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn artifacts_are_recognized() {
        for name in EXCLUDED_ARTIFACTS {
            assert!(is_excluded_artifact(name), "{name} must be excluded");
        }
        assert!(!is_excluded_artifact("README.md"));
        assert!(!is_excluded_artifact("thumbs.db"));
    }

    #[test]
    fn wire_path_joins_subtree_and_relative_path() {
        let wire = wire_path("builds/nightly", Path::new("pkg/app.zip")).expect("wire path");
        assert_eq!(wire, "builds/nightly/pkg/app.zip");
    }

    #[test]
    fn wire_path_without_subtree_is_bare() {
        let wire = wire_path("", Path::new("pkg/app.zip")).expect("wire path");
        assert_eq!(wire, "pkg/app.zip");
    }

    #[test]
    fn empty_path_addresses_subtree_root() {
        assert_eq!(wire_path("base", Path::new("")).expect("wire path"), "base");
        assert_eq!(wire_path("", Path::new("")).expect("wire path"), "");
    }

    #[test]
    fn parent_components_are_rejected() {
        let err = wire_path("base", Path::new("a/../../escape")).expect_err("must reject");
        assert!(matches!(err, ShareError::PathEscape { .. }));
    }

    #[test]
    fn absolute_paths_are_rejected() {
        let err = wire_path("base", Path::new("/etc/passwd")).expect_err("must reject");
        assert!(matches!(err, ShareError::PathEscape { .. }));
    }

    #[test]
    fn current_dir_components_are_dropped() {
        let wire = wire_path("base", Path::new("./a/./b")).expect("wire path");
        assert_eq!(wire, "base/a/b");
    }

    #[test]
    fn final_segment_returns_base_name() {
        assert_eq!(final_segment("a/b/c.txt"), "c.txt");
        assert_eq!(final_segment("solo"), "solo");
    }

    #[test]
    fn parent_wire_drops_the_last_segment() {
        assert_eq!(parent_wire("a/b/c.txt"), "a/b");
        assert_eq!(parent_wire("solo"), "");
    }

    #[test]
    fn non_utf8_paths_are_rejected() {
        #[cfg(unix)]
        {
            use std::ffi::OsString;
            use std::os::unix::ffi::OsStringExt;

            let raw = OsString::from_vec(vec![0x66, 0x6f, 0xff, 0x6f]);
            let path = PathBuf::from(raw);
            let err = wire_path("", &path).expect_err("must reject");
            assert!(matches!(err, ShareError::NonUtf8Path { .. }));
        }
        #[cfg(not(unix))]
        {
            let _ = PathBuf::new();
        }
    }
}
