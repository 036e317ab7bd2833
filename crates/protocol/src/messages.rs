//! Request and response frame definitions.
//!
//! All paths travel as slash-separated strings relative to the selected
//! share's working subtree. Path validation happens on both sides of the
//! wire; the frame types carry whatever string they were given.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single client request frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Opens a session. Empty `username` or `password` requests an
    /// anonymous, read-only session.
    Hello {
        /// Account name, empty for anonymous access.
        username: String,
        /// Account secret, empty for anonymous access.
        password: String,
    },
    /// Asks for the names of all shares the server exposes.
    ListShares,
    /// Binds the session to one named share.
    SelectShare {
        /// Share name as returned by [`Request::ListShares`].
        name: String,
    },
    /// Lists the immediate children of a directory.
    ListPath {
        /// Directory path relative to the share root.
        path: String,
    },
    /// Queries existence and kind of a single path.
    GetAttributes {
        /// Path relative to the share root.
        path: String,
    },
    /// Creates one directory. The parent must already exist.
    CreateDirectory {
        /// Directory path relative to the share root.
        path: String,
    },
    /// Deletes one empty directory.
    DeleteDirectory {
        /// Directory path relative to the share root.
        path: String,
    },
    /// Deletes one file.
    DeleteFile {
        /// File path relative to the share root.
        path: String,
    },
    /// Writes a file. Exactly `len` raw payload bytes follow this frame.
    StoreFile {
        /// Destination path relative to the share root.
        path: String,
        /// Number of payload bytes that follow.
        len: u64,
    },
    /// Reads a file. The server answers [`Response::FileData`] and then
    /// streams the raw payload.
    RetrieveFile {
        /// Source path relative to the share root.
        path: String,
    },
    /// Renames a file or directory within the share.
    Rename {
        /// Existing path relative to the share root.
        old: String,
        /// New path relative to the share root.
        new: String,
    },
}

/// A single server response frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// The request succeeded and carries no further data.
    Ok,
    /// Share names available on this server.
    Shares {
        /// Exposed share names.
        names: Vec<String>,
    },
    /// Immediate children of the listed directory.
    Entries {
        /// Child entries in server order.
        entries: Vec<DirEntry>,
    },
    /// Existence and kind of the queried path.
    Attributes {
        /// Whether the path exists at all.
        exists: bool,
        /// Whether the existing path is a directory.
        is_directory: bool,
    },
    /// A store completed; reports the byte count written.
    Stored {
        /// Number of payload bytes persisted.
        bytes: u64,
    },
    /// A retrieve is about to stream `len` raw payload bytes.
    FileData {
        /// Number of payload bytes that follow.
        len: u64,
    },
    /// The request failed on the server.
    Error {
        /// Machine-readable failure class.
        code: ErrorCode,
        /// Human-readable detail.
        message: String,
    },
}

/// One entry in a directory listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Base name of the child, no path separators.
    pub name: String,
    /// Whether the child is a directory.
    pub is_directory: bool,
}

/// Failure classes a server can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The requested share is not exposed by this server.
    UnknownShare,
    /// A share-scoped request arrived before [`Request::SelectShare`].
    NoShareSelected,
    /// The path does not exist.
    NotFound,
    /// The operation requires a directory but found something else.
    NotADirectory,
    /// The operation requires a file but found something else.
    NotAFile,
    /// The session is anonymous and the request mutates the share.
    ReadOnly,
    /// The path is absolute or escapes the share root.
    BadPath,
    /// A server-side I/O failure not covered by another class.
    Io,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UnknownShare => "unknown share",
            Self::NoShareSelected => "no share selected",
            Self::NotFound => "not found",
            Self::NotADirectory => "not a directory",
            Self::NotAFile => "not a file",
            Self::ReadOnly => "session is read-only",
            Self::BadPath => "path rejected",
            Self::Io => "server i/o failure",
        };
        f.write_str(text)
    }
}
