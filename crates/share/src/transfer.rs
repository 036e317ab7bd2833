//! Transfer descriptions shared by copy and move.

use std::path::{Path, PathBuf};

/// Which side of the session each endpoint of a transfer lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    /// Local filesystem source, remote share destination.
    LocalToRemote,
    /// Remote share source, local filesystem destination.
    RemoteToLocal,
    /// Both endpoints on the remote share.
    RemoteToRemote,
}

impl Topology {
    /// Whether a copy with this topology writes to the remote share.
    #[must_use]
    pub const fn writes_remote(self) -> bool {
        matches!(self, Self::LocalToRemote | Self::RemoteToRemote)
    }
}

/// One copy or move request, built per call and then discarded.
#[derive(Clone, Debug)]
pub struct TransferSpec {
    source: PathBuf,
    destination: PathBuf,
    topology: Topology,
    overwrite: bool,
}

impl TransferSpec {
    /// Describes a transfer between `source` and `destination`.
    ///
    /// Remote endpoints are interpreted relative to the session's working
    /// subtree; local endpoints are ordinary filesystem paths.
    #[must_use]
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        topology: Topology,
        overwrite: bool,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            topology,
            overwrite,
        }
    }

    /// Source endpoint.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Destination endpoint.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Endpoint placement.
    #[must_use]
    pub const fn topology(&self) -> Topology {
        self.topology
    }

    /// Whether an existing destination should be replaced.
    #[must_use]
    pub const fn overwrite(&self) -> bool {
        self.overwrite
    }
}
