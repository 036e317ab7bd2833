//! Daemon startup and serving errors with stable exit codes.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Exit code for configuration problems.
const EXIT_CONFIG: i32 = 1;
/// Exit code for socket failures.
const EXIT_SOCKET: i32 = 10;

/// Error raised while starting or running the daemon.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// The configuration file could not be read.
    #[error("cannot read config '{path}': {source}")]
    ConfigRead {
        /// Configuration file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The configuration file is not valid JSON for the expected shape.
    #[error("cannot parse config '{path}': {source}")]
    ConfigParse {
        /// Configuration file path.
        path: PathBuf,
        /// Decoder error.
        source: serde_json::Error,
    },
    /// The `bind` value is not an IP address.
    #[error("bind address '{value}' is not a valid IP address")]
    InvalidBind {
        /// Offending value.
        value: String,
    },
    /// The configuration declares no shares.
    #[error("config '{path}' declares no shares")]
    NoShares {
        /// Configuration file path.
        path: PathBuf,
    },
    /// Two shares claim the same name.
    #[error("share '{name}' is declared more than once")]
    DuplicateShare {
        /// Duplicated share name.
        name: String,
    },
    /// A share root is missing or not a directory.
    #[error("share '{name}' root '{root}' is not a directory")]
    ShareRoot {
        /// Share name.
        name: String,
        /// Configured root path.
        root: PathBuf,
    },
    /// Binding the listener socket failed.
    #[error("cannot bind {addr}: {source}")]
    Bind {
        /// Requested listen address.
        addr: SocketAddr,
        /// Underlying socket error.
        source: io::Error,
    },
    /// Accepting a connection failed.
    #[error("accept failed on {addr}: {source}")]
    Accept {
        /// Listener address.
        addr: SocketAddr,
        /// Underlying socket error.
        source: io::Error,
    },
}

impl DaemonError {
    /// Process exit code this error maps to.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigRead { .. }
            | Self::ConfigParse { .. }
            | Self::InvalidBind { .. }
            | Self::NoShares { .. }
            | Self::DuplicateShare { .. }
            | Self::ShareRoot { .. } => EXIT_CONFIG,
            Self::Bind { .. } | Self::Accept { .. } => EXIT_SOCKET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_with_one() {
        let err = DaemonError::NoShares {
            path: PathBuf::from("/etc/updeltad.json"),
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn socket_errors_exit_with_ten() {
        let err = DaemonError::Bind {
            addr: "127.0.0.1:9440".parse().expect("addr"),
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(err.exit_code(), 10);
    }
}
