//! Build pipeline: pull both releases, diff them, package the result,
//! publish it.
//!
//! # Overview
//!
//! [`BuildPipeline::run`] drives one build from a fixed on-disk layout:
//!
//! ```text
//! <root>/package/previous/   downloaded previous release package
//! <root>/package/current/    downloaded current release package
//! <root>/mount/previous/app  previous payload (mounted or extracted)
//! <root>/mount/current/app   current payload (mounted or extracted)
//! <root>/export/diff/        staged changed files
//! <root>/export/dist/        the built incremental package
//! ```
//!
//! The run is `clear → pull → stage → diff → package → publish → clear`.
//! `package/` and `mount/` are working state and are removed by `clear`;
//! `export/` holds the run's artifacts and survives, though `diff/` and
//! `dist/` are reset at the start of every build so stale files from an
//! earlier run never leak into a new package.
//!
//! # Errors
//!
//! Stages run strictly in order and the first failure aborts the run.
//! Attached disk images are detached before the error is returned;
//! everything else is left for the next `clear` to sweep.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use logging::{InfoFlag, emit_info, info_gte};
use publish::{PublisherConfig, RemotePackagePublisher};

use crate::config::{BuildParams, ConfigError};
use crate::fetch::{FetchError, fetch};
use crate::mount::{MountError, mount, unmount};

/// Error raised by a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The build configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A release package could not be downloaded.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// A disk image could not be attached or detached.
    #[error(transparent)]
    Mount(#[from] MountError),
    /// Scanning or staging the changed files failed.
    #[error(transparent)]
    Diff(#[from] diff::DiffError),
    /// Extracting a release package or building the incremental package
    /// failed.
    #[error(transparent)]
    Archive(#[from] archive::ArchiveError),
    /// Publishing the built package to the share failed.
    #[error(transparent)]
    Publish(#[from] publish::PublishError),
    /// A build directory could not be removed.
    #[error("cannot clear {path}: {source}")]
    Clear {
        /// Directory that could not be removed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// A build directory could not be created.
    #[error("cannot create build directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// On-disk layout of one build tree.
#[derive(Clone, Debug)]
pub struct BuildLayout {
    root: PathBuf,
}

impl BuildLayout {
    /// Roots the layout at `root`; nothing is created yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Build tree root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding downloaded release packages.
    #[must_use]
    pub fn package_dir(&self) -> PathBuf {
        self.root.join("package")
    }

    /// Download directory of the previous release package.
    #[must_use]
    pub fn previous_package_dir(&self) -> PathBuf {
        self.package_dir().join("previous")
    }

    /// Download directory of the current release package.
    #[must_use]
    pub fn current_package_dir(&self) -> PathBuf {
        self.package_dir().join("current")
    }

    /// Directory holding mounted or extracted payloads.
    #[must_use]
    pub fn mount_dir(&self) -> PathBuf {
        self.root.join("mount")
    }

    /// Payload root of the previous release.
    #[must_use]
    pub fn previous_payload_dir(&self) -> PathBuf {
        self.mount_dir().join("previous").join("app")
    }

    /// Payload root of the current release.
    #[must_use]
    pub fn current_payload_dir(&self) -> PathBuf {
        self.mount_dir().join("current").join("app")
    }

    /// Artifact directory kept across builds.
    #[must_use]
    pub fn export_dir(&self) -> PathBuf {
        self.root.join("export")
    }

    /// Staging directory the changed files are copied into.
    #[must_use]
    pub fn diff_dir(&self) -> PathBuf {
        self.export_dir().join("diff")
    }

    /// Directory the built incremental package is written into.
    #[must_use]
    pub fn dist_dir(&self) -> PathBuf {
        self.export_dir().join("dist")
    }
}

/// One incremental package build.
pub struct BuildPipeline {
    layout: BuildLayout,
    params: BuildParams,
    share: Option<PublisherConfig>,
}

impl BuildPipeline {
    /// Assembles a pipeline; with `share` absent the publish stage is
    /// skipped and the package only lands in the dist directory.
    #[must_use]
    pub const fn new(
        layout: BuildLayout,
        params: BuildParams,
        share: Option<PublisherConfig>,
    ) -> Self {
        Self {
            layout,
            params,
            share,
        }
    }

    /// Layout this pipeline builds in.
    #[must_use]
    pub const fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    /// Runs the full build, returning the built package path.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure. Disk images attached by the run
    /// are detached before the error propagates; on a detach failure
    /// during cleanup the original stage error wins.
    pub fn run(&self) -> Result<PathBuf, PipelineError> {
        self.clear(&[])?;
        let mut mounted = Vec::new();
        let outcome = self.run_stages(&mut mounted);
        let cleanup = self.clear(&mounted);
        match outcome {
            Ok(package) => {
                cleanup?;
                Ok(package)
            }
            Err(error) => Err(error),
        }
    }

    fn run_stages(&self, mounted: &mut Vec<PathBuf>) -> Result<PathBuf, PipelineError> {
        let previous_package = fetch(
            &self.params.previous_url(),
            &self.layout.previous_package_dir(),
        )?;
        let current_package = fetch(
            &self.params.current_url(),
            &self.layout.current_package_dir(),
        )?;

        let previous_root = self.layout.previous_payload_dir();
        let current_root = self.layout.current_payload_dir();
        self.stage(&previous_package, &previous_root, mounted)?;
        self.stage(&current_package, &current_root, mounted)?;

        let diff_dir = self.layout.diff_dir();
        reset_dir(&diff_dir)?;
        let changed = diff::compare(&previous_root, &current_root)?;
        let staged = diff::copy_diff(&changed, &diff_dir)?;
        if info_gte(InfoFlag::Stats, 1) {
            emit_info(InfoFlag::Stats, 1, format!("{staged} changed files staged"));
        }

        let dist_dir = self.layout.dist_dir();
        reset_dir(&dist_dir)?;
        let package_path = dist_dir.join(self.params.diff_package_name());
        archive::compress(&diff_dir, &package_path)?;

        if let Some(config) = &self.share {
            let mut publisher = RemotePackagePublisher::connect(config)?;
            publisher.publish(&dist_dir, &self.params.diff_remote_dir())?;
        }
        Ok(package_path)
    }

    /// Mounts a disk image or extracts an archive at `payload_root`.
    fn stage(
        &self,
        package: &Path,
        payload_root: &Path,
        mounted: &mut Vec<PathBuf>,
    ) -> Result<(), PipelineError> {
        let is_image = package
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("dmg"));
        if is_image {
            fs::create_dir_all(payload_root).map_err(|source| PipelineError::CreateDir {
                path: payload_root.to_path_buf(),
                source,
            })?;
            mount(package, payload_root)?;
            mounted.push(payload_root.to_path_buf());
        } else {
            archive::decompress(package, payload_root)?;
        }
        Ok(())
    }

    /// Detaches any attached images and removes the working directories.
    ///
    /// `export/` is left in place; it holds the run's artifacts.
    fn clear(&self, mounted: &[PathBuf]) -> Result<(), PipelineError> {
        for mount_root in mounted {
            unmount(mount_root)?;
        }
        for dir in [self.layout.package_dir(), self.layout.mount_dir()] {
            match fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(PipelineError::Clear { path: dir, source }),
            }
        }
        Ok(())
    }
}

fn reset_dir(path: &Path) -> Result<(), PipelineError> {
    match fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(PipelineError::Clear {
                path: path.to_path_buf(),
                source,
            });
        }
    }
    fs::create_dir_all(path).map_err(|source| PipelineError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
