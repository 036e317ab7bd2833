//! Disk-image attach and detach through `hdiutil`.
//!
//! macOS release packages ship as `.dmg` disk images. The image is
//! attached read-only at an explicit mount point inside the build tree and
//! detached again once the comparison has run. Other platforms never see
//! disk images and refuse both operations outright.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use logging::{InfoFlag, emit_info, info_gte};

/// Error raised while attaching or detaching a disk image.
#[derive(Debug, thiserror::Error)]
pub enum MountError {
    /// Disk images are only handled on macOS.
    #[error("disk images are not supported on this platform")]
    Unsupported,
    /// `hdiutil` could not be started.
    #[error("cannot run hdiutil: {source}")]
    Spawn {
        /// Underlying process error.
        source: io::Error,
    },
    /// `hdiutil attach` exited with a failure status.
    #[error("failed to attach '{image}': {detail}")]
    Attach {
        /// Image that could not be attached.
        image: PathBuf,
        /// Captured stderr of the failed invocation.
        detail: String,
    },
    /// `hdiutil detach` exited with a failure status.
    #[error("failed to detach '{mount_root}': {detail}")]
    Detach {
        /// Mount point that could not be detached.
        mount_root: PathBuf,
        /// Captured stderr of the failed invocation.
        detail: String,
    },
}

/// Attaches `image` read-only at `mount_root`.
///
/// # Errors
///
/// Returns [`MountError::Unsupported`] off macOS, [`MountError::Spawn`]
/// when `hdiutil` cannot be started, and [`MountError::Attach`] when it
/// exits with a failure status.
pub fn mount(image: &Path, mount_root: &Path) -> Result<(), MountError> {
    if !cfg!(target_os = "macos") {
        return Err(MountError::Unsupported);
    }
    let output = Command::new("hdiutil")
        .arg("attach")
        .arg(image)
        .arg("-nobrowse")
        .arg("-readonly")
        .arg("-mountpoint")
        .arg(mount_root)
        .output()
        .map_err(|source| MountError::Spawn { source })?;
    if !output.status.success() {
        return Err(MountError::Attach {
            image: image.to_path_buf(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }
    if info_gte(InfoFlag::Mount, 1) {
        emit_info(
            InfoFlag::Mount,
            1,
            format!("attached '{}' at '{}'", image.display(), mount_root.display()),
        );
    }
    Ok(())
}

/// Detaches the image attached at `mount_root`.
///
/// # Errors
///
/// Returns [`MountError::Unsupported`] off macOS, [`MountError::Spawn`]
/// when `hdiutil` cannot be started, and [`MountError::Detach`] when it
/// exits with a failure status.
pub fn unmount(mount_root: &Path) -> Result<(), MountError> {
    if !cfg!(target_os = "macos") {
        return Err(MountError::Unsupported);
    }
    let output = Command::new("hdiutil")
        .arg("detach")
        .arg(mount_root)
        .output()
        .map_err(|source| MountError::Spawn { source })?;
    if !output.status.success() {
        return Err(MountError::Detach {
            mount_root: mount_root.to_path_buf(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }
    if info_gte(InfoFlag::Mount, 1) {
        emit_info(
            InfoFlag::Mount,
            1,
            format!("detached '{}'", mount_root.display()),
        );
    }
    Ok(())
}

#[cfg(all(test, not(target_os = "macos")))]
mod tests {
    use super::*;

    #[test]
    fn attach_is_refused_off_macos() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = mount(&dir.path().join("app.dmg"), &dir.path().join("mnt"))
            .expect_err("must refuse");
        assert!(matches!(err, MountError::Unsupported));
    }

    #[test]
    fn detach_is_refused_off_macos() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = unmount(dir.path()).expect_err("must refuse");
        assert!(matches!(err, MountError::Unsupported));
    }
}
