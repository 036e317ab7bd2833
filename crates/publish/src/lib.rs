#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Package upload policy over a remote tree session.
//!
//! # Overview
//!
//! [`RemotePackagePublisher`] performs exactly one job: push a local
//! results directory into a directory on the remote share. It verifies the
//! session is ready, ensures the destination directory exists, then hands
//! the recursive transfer to [`share::RemoteTreeClient`] with overwrite
//! enabled.
//!
//! # Design
//!
//! The publisher owns its client and takes every connection parameter
//! through an explicit [`PublisherConfig`] at construction. There is no
//! ambient default host, share, or credential anywhere in this crate; two
//! publishers never share state.
//!
//! # Errors
//!
//! A publish either fully succeeds or returns the first error. Files
//! copied before a failure are left in place; cleanup of partial uploads
//! is the caller's concern.

use std::fs;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use logging::{InfoFlag, emit_info, info_gte};
use share::{RemoteTreeClient, SessionState, ShareConfig, ShareError, Topology, TransferSpec};

/// Error raised by [`RemotePackagePublisher::publish`].
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The session never became ready or has degraded.
    #[error("publisher session is not ready: {reason}")]
    NotReady {
        /// Explanation captured from the session state.
        reason: String,
    },
    /// The local source directory is missing.
    #[error("local package directory '{path}' does not exist")]
    SourceMissing {
        /// Missing source path.
        path: PathBuf,
    },
    /// The local source exists but is not a directory.
    #[error("local package source '{path}' is not a directory")]
    SourceNotDirectory {
        /// Offending source path.
        path: PathBuf,
    },
    /// The remote destination exists as a file.
    #[error("remote destination '{path}' is not a directory")]
    DestinationNotDirectory {
        /// Offending remote path.
        path: PathBuf,
    },
    /// A remote tree operation failed.
    #[error(transparent)]
    Share(#[from] ShareError),
}

/// Immutable settings for one publisher.
///
/// Wraps the connection parameters handed to the underlying session so a
/// publisher is fully described by one value passed at construction.
#[derive(Clone, Debug)]
pub struct PublisherConfig {
    connection: ShareConfig,
}

impl PublisherConfig {
    /// Builds a publisher config around the given connection settings.
    #[must_use]
    pub const fn new(connection: ShareConfig) -> Self {
        Self { connection }
    }

    /// Connection settings the publisher's session uses.
    #[must_use]
    pub const fn connection(&self) -> &ShareConfig {
        &self.connection
    }
}

/// Pushes a local results directory into a remote share directory.
pub struct RemotePackagePublisher<S: Read + Write> {
    client: RemoteTreeClient<S>,
}

impl RemotePackagePublisher<TcpStream> {
    /// Connects a new session using the publisher config.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Share`] when the TCP connection itself
    /// cannot be opened. Handshake failures leave the session degraded
    /// instead, surfacing as [`PublishError::NotReady`] on the first
    /// publish.
    pub fn connect(config: &PublisherConfig) -> Result<Self, PublishError> {
        let client = RemoteTreeClient::connect(config.connection().clone())?;
        Ok(Self::new(client))
    }
}

impl<S: Read + Write> RemotePackagePublisher<S> {
    /// Wraps an already constructed session.
    #[must_use]
    pub const fn new(client: RemoteTreeClient<S>) -> Self {
        Self { client }
    }

    /// Uploads the *contents* of `local_dir` into `remote_dir`.
    ///
    /// `remote_dir` is interpreted relative to the session's working
    /// subtree and created recursively when missing. Existing remote files
    /// are replaced.
    ///
    /// # Errors
    ///
    /// Fails without touching the remote side when the session is not
    /// ready, the local source is missing or not a directory, or the
    /// remote destination exists as a file.
    pub fn publish(&mut self, local_dir: &Path, remote_dir: &Path) -> Result<(), PublishError> {
        self.ensure_ready()?;

        match fs::metadata(local_dir) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => {
                return Err(PublishError::SourceNotDirectory {
                    path: local_dir.to_path_buf(),
                });
            }
            Err(_) => {
                return Err(PublishError::SourceMissing {
                    path: local_dir.to_path_buf(),
                });
            }
        }

        if self.client.exists(remote_dir)? && !self.client.is_directory(remote_dir)? {
            return Err(PublishError::DestinationNotDirectory {
                path: remote_dir.to_path_buf(),
            });
        }
        self.client.make_directory(remote_dir)?;

        if info_gte(InfoFlag::Misc, 1) {
            emit_info(
                InfoFlag::Misc,
                1,
                format!(
                    "publishing '{}' into '{}'",
                    local_dir.display(),
                    remote_dir.display()
                ),
            );
        }
        let spec = TransferSpec::new(local_dir, remote_dir, Topology::LocalToRemote, true);
        self.client.copy(&spec)?;
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), PublishError> {
        match self.client.state() {
            SessionState::Ready => Ok(()),
            SessionState::Degraded { reason } => Err(PublishError::NotReady {
                reason: reason.clone(),
            }),
            SessionState::Disconnected | SessionState::Connecting => Err(PublishError::NotReady {
                reason: "session not established".to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    use protocol::{Response, write_frame};

    struct ScriptedTransport {
        incoming: Cursor<Vec<u8>>,
        outgoing: Vec<u8>,
    }

    impl ScriptedTransport {
        fn with_responses(responses: &[Response]) -> Self {
            let mut incoming = Vec::new();
            for response in responses {
                write_frame(&mut incoming, response).expect("encode response");
            }
            Self {
                incoming: Cursor::new(incoming),
                outgoing: Vec::new(),
            }
        }
    }

    impl Read for ScriptedTransport {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.incoming.read(buf)
        }
    }

    impl Write for ScriptedTransport {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.outgoing.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn config() -> ShareConfig {
        ShareConfig::new("198.51.100.7", 9045, "updates", "", "builder", "secret")
    }

    fn handshake() -> Vec<Response> {
        vec![
            Response::Ok,
            Response::Shares {
                names: vec!["updates".into()],
            },
            Response::Ok,
        ]
    }

    #[test]
    fn degraded_session_is_rejected_before_any_work() {
        let transport = ScriptedTransport::with_responses(&[]);
        let client = RemoteTreeClient::establish(transport, config());
        let mut publisher = RemotePackagePublisher::new(client);

        let dir = tempfile::tempdir().expect("tempdir");
        let err = publisher
            .publish(dir.path(), Path::new("dist"))
            .expect_err("must reject");
        assert!(matches!(err, PublishError::NotReady { .. }));
    }

    #[test]
    fn missing_local_source_is_rejected_without_remote_traffic() {
        let transport = ScriptedTransport::with_responses(&handshake());
        let client = RemoteTreeClient::establish(transport, config());
        let mut publisher = RemotePackagePublisher::new(client);

        let dir = tempfile::tempdir().expect("tempdir");
        let err = publisher
            .publish(&dir.path().join("ghost"), Path::new("dist"))
            .expect_err("must reject");
        assert!(matches!(err, PublishError::SourceMissing { .. }));
    }

    #[test]
    fn file_source_is_rejected() {
        let transport = ScriptedTransport::with_responses(&handshake());
        let client = RemoteTreeClient::establish(transport, config());
        let mut publisher = RemotePackagePublisher::new(client);

        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("pkg.zip");
        fs::write(&file, "bytes").expect("write");
        let err = publisher
            .publish(&file, Path::new("dist"))
            .expect_err("must reject");
        assert!(matches!(err, PublishError::SourceNotDirectory { .. }));
    }

    #[test]
    fn remote_file_destination_is_rejected() {
        let mut responses = handshake();
        // exists() and is_directory() each probe the destination.
        responses.push(Response::Attributes {
            exists: true,
            is_directory: false,
        });
        responses.push(Response::Attributes {
            exists: true,
            is_directory: false,
        });
        let transport = ScriptedTransport::with_responses(&responses);
        let client = RemoteTreeClient::establish(transport, config());
        let mut publisher = RemotePackagePublisher::new(client);

        let dir = tempfile::tempdir().expect("tempdir");
        let err = publisher
            .publish(dir.path(), Path::new("dist"))
            .expect_err("must reject");
        assert!(matches!(err, PublishError::DestinationNotDirectory { .. }));
    }

    #[test]
    fn config_exposes_its_connection_settings() {
        let publisher_config = PublisherConfig::new(config());
        assert_eq!(publisher_config.connection().share(), "updates");
        assert!(!publisher_config.connection().is_anonymous());
    }
}
