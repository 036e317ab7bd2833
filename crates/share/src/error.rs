//! Error taxonomy for remote tree operations.

use std::io;
use std::path::PathBuf;

use protocol::{ErrorCode, ProtocolError};

/// Error raised by [`crate::RemoteTreeClient`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    /// The session is degraded; no further operations will be attempted.
    #[error("session degraded: {reason}")]
    Degraded {
        /// Explanation captured when the session degraded.
        reason: String,
    },
    /// The transport failed mid-call. The session degrades alongside this.
    #[error("transport failure: {0}")]
    Transport(#[from] ProtocolError),
    /// The server refused the request.
    #[error("server rejected {operation} on '{path}': {code}: {message}")]
    Server {
        /// Operation the client was performing.
        operation: &'static str,
        /// Wire path the request named.
        path: String,
        /// Failure class reported by the server.
        code: ErrorCode,
        /// Server-provided detail.
        message: String,
    },
    /// An anonymous session attempted a mutation.
    #[error("{operation} requires an authenticated session")]
    ReadOnly {
        /// Mutating operation that was rejected.
        operation: &'static str,
    },
    /// A path exists but has the wrong kind for the operation.
    #[error("'{path}' is not a {expected}")]
    TypeMismatch {
        /// Offending path.
        path: String,
        /// Kind the operation required.
        expected: &'static str,
    },
    /// Source and destination resolve to the same path.
    #[error("source and destination are the same path: '{path}'")]
    SelfCopy {
        /// The shared path.
        path: String,
    },
    /// The path is absolute or contains `..` components.
    #[error("path '{path}' would escape the working subtree")]
    PathEscape {
        /// Rejected path.
        path: PathBuf,
    },
    /// The path is not representable on the wire.
    #[error("path '{path}' is not valid UTF-8")]
    NonUtf8Path {
        /// Rejected path.
        path: PathBuf,
    },
    /// A transfer source disappeared or never existed.
    #[error("transfer source '{path}' does not exist")]
    MissingSource {
        /// Missing source path.
        path: PathBuf,
    },
    /// A created directory never became visible within the settle budget.
    #[error("'{path}' did not become visible after {attempts} attempts")]
    NotVisible {
        /// Directory that stayed invisible.
        path: String,
        /// Probe attempts performed.
        attempts: u32,
    },
    /// A store call reported zero bytes written for a non-empty source.
    #[error("store of '{path}' persisted no bytes")]
    StoreIncomplete {
        /// Destination path of the failed store.
        path: String,
    },
    /// The server answered with a frame the protocol does not allow here.
    #[error("unexpected response while {context}")]
    UnexpectedResponse {
        /// Operation in progress when the frame arrived.
        context: &'static str,
    },
    /// A local filesystem operation failed.
    #[error("local i/o failed on '{path}': {source}")]
    LocalIo {
        /// Local path involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Walking a local source tree failed.
    #[error("local tree walk failed: {0}")]
    Walk(#[from] walk::WalkError),
}
