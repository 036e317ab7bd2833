//! The remote tree client and its session state machine.

use std::env;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use logging::{DebugFlag, InfoFlag, debug_gte, emit_debug, emit_info, info_gte};
use protocol::{
    DirEntry, ErrorCode, Request, Response, read_frame, receive_payload, send_payload, write_frame,
};

use crate::config::ShareConfig;
use crate::error::ShareError;
use crate::path;
use crate::settle::{self, SettlePolicy};
use crate::temp::{self, StagedFile};
use crate::transfer::{Topology, TransferSpec};

/// Lifecycle of a share session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No session has been established yet.
    Disconnected,
    /// The handshake is in flight.
    Connecting,
    /// The session is fully usable.
    Ready,
    /// The session failed and will reject every further call.
    Degraded {
        /// Explanation captured at the moment of failure.
        reason: String,
    },
}

/// Existence and kind of a remote path at query time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemotePathState {
    /// Whether the path exists at all.
    pub exists: bool,
    /// Whether the existing path is a directory.
    pub is_directory: bool,
}

impl RemotePathState {
    const ABSENT: Self = Self {
        exists: false,
        is_directory: false,
    };

    const fn is_file(self) -> bool {
        self.exists && !self.is_directory
    }
}

/// Client for one share session over a byte-stream transport.
///
/// The client owns its transport exclusively. All paths given to its
/// operations are interpreted relative to the configured working subtree.
pub struct RemoteTreeClient<S: Read + Write> {
    transport: S,
    config: ShareConfig,
    settle: SettlePolicy,
    state: SessionState,
}

impl RemoteTreeClient<TcpStream> {
    /// Opens a TCP connection and establishes a session over it.
    ///
    /// A socket-level connect failure is returned directly; handshake
    /// failures leave the returned client in [`SessionState::Degraded`].
    pub fn connect(config: ShareConfig) -> Result<Self, ShareError> {
        let stream = TcpStream::connect(config.endpoint())
            .map_err(|err| ShareError::Transport(err.into()))?;
        Ok(Self::establish(stream, config))
    }
}

impl<S: Read + Write> RemoteTreeClient<S> {
    /// Runs the session handshake over an already open transport.
    ///
    /// The handshake authenticates, verifies the share is offered, selects
    /// it, and walks every working-subtree segment. Any failure leaves the
    /// client degraded for life; it never retries.
    pub fn establish(transport: S, config: ShareConfig) -> Self {
        let mut client = Self {
            transport,
            config,
            settle: SettlePolicy::default(),
            state: SessionState::Connecting,
        };
        match client.handshake() {
            Ok(()) => {
                client.state = SessionState::Ready;
                if debug_gte(DebugFlag::Connect, 1) {
                    emit_debug(
                        DebugFlag::Connect,
                        1,
                        format!("session ready on share '{}'", client.config.share()),
                    );
                }
            }
            Err(err) => {
                client.state = SessionState::Degraded {
                    reason: err.to_string(),
                };
            }
        }
        client
    }

    /// Current session state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether the session can serve calls.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready)
    }

    /// Replaces the visibility-polling policy used after directory creates.
    pub const fn set_settle_policy(&mut self, policy: SettlePolicy) {
        self.settle = policy;
    }

    fn handshake(&mut self) -> Result<(), ShareError> {
        if debug_gte(DebugFlag::Connect, 1) {
            let account = if self.config.is_anonymous() {
                "anonymous"
            } else {
                self.config.username()
            };
            emit_debug(
                DebugFlag::Connect,
                1,
                format!(
                    "connecting to share '{}' as {account}",
                    self.config.share()
                ),
            );
        }

        let hello = Request::Hello {
            username: self.config.username().to_owned(),
            password: self.config.password().to_owned(),
        };
        self.expect_ok(&hello, "hello", "")?;

        let names = match self.roundtrip(&Request::ListShares)? {
            Response::Shares { names } => names,
            Response::Error { code, message } => {
                return Err(ShareError::Server {
                    operation: "list shares",
                    path: String::new(),
                    code,
                    message,
                });
            }
            _ => {
                return Err(ShareError::UnexpectedResponse {
                    context: "listing shares",
                });
            }
        };
        if !names.iter().any(|name| name == self.config.share()) {
            return Err(ShareError::Server {
                operation: "select share",
                path: self.config.share().to_owned(),
                code: ErrorCode::UnknownShare,
                message: "server does not expose this share".to_owned(),
            });
        }

        let select = Request::SelectShare {
            name: self.config.share().to_owned(),
        };
        self.expect_ok(&select, "select share", self.config.share().to_owned())?;

        let subtree = self.config.subtree().to_owned();
        if !subtree.is_empty() {
            let mut prefix = String::new();
            for segment in subtree.split('/') {
                prefix = path::join_wire(&prefix, segment);
                let state = self.attributes_wire(&prefix)?;
                if !state.exists {
                    return Err(ShareError::MissingSource {
                        path: PathBuf::from(prefix),
                    });
                }
                if !state.is_directory {
                    return Err(ShareError::TypeMismatch {
                        path: prefix,
                        expected: "directory",
                    });
                }
            }
        }
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), ShareError> {
        match &self.state {
            SessionState::Ready => Ok(()),
            SessionState::Degraded { reason } => Err(ShareError::Degraded {
                reason: reason.clone(),
            }),
            SessionState::Disconnected | SessionState::Connecting => Err(ShareError::Degraded {
                reason: "session not established".to_owned(),
            }),
        }
    }

    fn ensure_writable(&self, operation: &'static str) -> Result<(), ShareError> {
        if self.config.is_anonymous() {
            Err(ShareError::ReadOnly { operation })
        } else {
            Ok(())
        }
    }

    /// Runs one raw transport exchange, degrading the session on failure.
    fn wire<T>(
        &mut self,
        op: impl FnOnce(&mut S) -> Result<T, protocol::ProtocolError>,
    ) -> Result<T, ShareError> {
        match op(&mut self.transport) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.state = SessionState::Degraded {
                    reason: err.to_string(),
                };
                Err(ShareError::Transport(err))
            }
        }
    }

    fn roundtrip(&mut self, request: &Request) -> Result<Response, ShareError> {
        self.wire(|transport| {
            write_frame(transport, request)?;
            read_frame(transport)
        })
    }

    fn expect_ok(
        &mut self,
        request: &Request,
        operation: &'static str,
        wire_path: impl Into<String>,
    ) -> Result<(), ShareError> {
        match self.roundtrip(request)? {
            Response::Ok => Ok(()),
            Response::Error { code, message } => Err(ShareError::Server {
                operation,
                path: wire_path.into(),
                code,
                message,
            }),
            _ => Err(ShareError::UnexpectedResponse { context: operation }),
        }
    }

    fn to_wire(&self, local: &Path) -> Result<String, ShareError> {
        path::wire_path(self.config.subtree(), local)
    }

    fn attributes_wire(&mut self, wire: &str) -> Result<RemotePathState, ShareError> {
        if path::is_excluded_artifact(path::final_segment(wire)) {
            return Ok(RemotePathState::ABSENT);
        }
        match self.roundtrip(&Request::GetAttributes {
            path: wire.to_owned(),
        })? {
            Response::Attributes {
                exists,
                is_directory,
            } => Ok(RemotePathState {
                exists,
                is_directory,
            }),
            Response::Error { code, message } => Err(ShareError::Server {
                operation: "query attributes",
                path: wire.to_owned(),
                code,
                message,
            }),
            _ => Err(ShareError::UnexpectedResponse {
                context: "querying attributes",
            }),
        }
    }

    /// Whether `path` exists on the share.
    ///
    /// Excluded artifact names are always reported absent.
    pub fn exists(&mut self, path: &Path) -> Result<bool, ShareError> {
        self.ensure_ready()?;
        let wire = self.to_wire(path)?;
        Ok(self.attributes_wire(&wire)?.exists)
    }

    /// Whether `path` exists and is a directory.
    pub fn is_directory(&mut self, path: &Path) -> Result<bool, ShareError> {
        self.ensure_ready()?;
        let wire = self.to_wire(path)?;
        let state = self.attributes_wire(&wire)?;
        Ok(state.exists && state.is_directory)
    }

    /// Whether `path` exists and is a file.
    pub fn is_file(&mut self, path: &Path) -> Result<bool, ShareError> {
        self.ensure_ready()?;
        let wire = self.to_wire(path)?;
        Ok(self.attributes_wire(&wire)?.is_file())
    }

    /// Lists the immediate children of a remote directory.
    ///
    /// Excluded artifacts and the `.`/`..` markers never appear in the
    /// result.
    pub fn list_directory(&mut self, path: &Path) -> Result<Vec<DirEntry>, ShareError> {
        self.ensure_ready()?;
        let wire = self.to_wire(path)?;
        self.list_wire(&wire)
    }

    fn list_wire(&mut self, wire: &str) -> Result<Vec<DirEntry>, ShareError> {
        match self.roundtrip(&Request::ListPath {
            path: wire.to_owned(),
        })? {
            Response::Entries { mut entries } => {
                entries.retain(|entry| {
                    entry.name != "."
                        && entry.name != ".."
                        && !path::is_excluded_artifact(&entry.name)
                });
                Ok(entries)
            }
            Response::Error { code, message } => Err(ShareError::Server {
                operation: "list directory",
                path: wire.to_owned(),
                code,
                message,
            }),
            _ => Err(ShareError::UnexpectedResponse {
                context: "listing a directory",
            }),
        }
    }

    /// Creates `path` and every missing ancestor, one segment at a time.
    ///
    /// Already existing directory segments are accepted; a file segment is
    /// a hard failure. Each created segment is confirmed visible through
    /// the settle policy before descending further.
    pub fn make_directory(&mut self, path: &Path) -> Result<(), ShareError> {
        self.ensure_ready()?;
        self.ensure_writable("make_directory")?;
        let wire = self.to_wire(path)?;
        self.make_directory_wire(&wire)
    }

    fn make_directory_wire(&mut self, wire: &str) -> Result<(), ShareError> {
        if wire.is_empty() {
            return Ok(());
        }
        let segments: Vec<String> = wire.split('/').map(str::to_owned).collect();
        let mut prefix = String::new();
        for segment in segments {
            prefix = path::join_wire(&prefix, &segment);
            let state = self.attributes_wire(&prefix)?;
            if state.exists {
                if state.is_directory {
                    continue;
                }
                return Err(ShareError::TypeMismatch {
                    path: prefix,
                    expected: "directory",
                });
            }
            self.create_single_directory(&prefix)?;
        }
        Ok(())
    }

    fn create_single_directory(&mut self, wire: &str) -> Result<(), ShareError> {
        self.expect_ok(
            &Request::CreateDirectory {
                path: wire.to_owned(),
            },
            "create directory",
            wire,
        )?;

        let policy = self.settle;
        let attempts = policy.max_attempts();
        let visible = settle::await_visible(&policy, || {
            let state = self.attributes_wire(wire)?;
            Ok::<_, ShareError>(state.exists && state.is_directory)
        })?;
        if visible {
            Ok(())
        } else {
            Err(ShareError::NotVisible {
                path: wire.to_owned(),
                attempts,
            })
        }
    }

    /// Deletes `path` and everything beneath it, depth first.
    ///
    /// Succeeds trivially when the path does not exist; fails when it is a
    /// file.
    pub fn remove_directory(&mut self, path: &Path) -> Result<(), ShareError> {
        self.ensure_ready()?;
        self.ensure_writable("remove_directory")?;
        let wire = self.to_wire(path)?;
        self.remove_directory_wire(&wire)
    }

    fn remove_directory_wire(&mut self, wire: &str) -> Result<(), ShareError> {
        let state = self.attributes_wire(wire)?;
        if !state.exists {
            return Ok(());
        }
        if !state.is_directory {
            return Err(ShareError::TypeMismatch {
                path: wire.to_owned(),
                expected: "directory",
            });
        }

        for entry in self.list_wire(wire)? {
            let child = path::join_wire(wire, &entry.name);
            if entry.is_directory {
                self.remove_directory_wire(&child)?;
            } else {
                self.delete_file_wire(&child)?;
            }
        }

        if info_gte(InfoFlag::Del, 1) {
            emit_info(InfoFlag::Del, 1, format!("removing directory {wire}"));
        }
        self.expect_ok(
            &Request::DeleteDirectory {
                path: wire.to_owned(),
            },
            "delete directory",
            wire,
        )
    }

    /// Deletes a single remote file.
    ///
    /// Succeeds trivially when the path does not exist; fails when it is a
    /// directory.
    pub fn remove_file(&mut self, path: &Path) -> Result<(), ShareError> {
        self.ensure_ready()?;
        self.ensure_writable("remove_file")?;
        let wire = self.to_wire(path)?;
        let state = self.attributes_wire(&wire)?;
        if !state.exists {
            return Ok(());
        }
        if state.is_directory {
            return Err(ShareError::TypeMismatch {
                path: wire,
                expected: "file",
            });
        }
        self.delete_file_wire(&wire)
    }

    fn delete_file_wire(&mut self, wire: &str) -> Result<(), ShareError> {
        if info_gte(InfoFlag::Del, 1) {
            emit_info(InfoFlag::Del, 1, format!("deleting {wire}"));
        }
        self.expect_ok(
            &Request::DeleteFile {
                path: wire.to_owned(),
            },
            "delete file",
            wire,
        )
    }

    /// Copies the entry described by `spec`.
    ///
    /// Dispatches on topology and on the source's kind. An existing
    /// destination with `overwrite` disabled is left untouched and the
    /// call succeeds.
    pub fn copy(&mut self, spec: &TransferSpec) -> Result<(), ShareError> {
        self.ensure_ready()?;
        if spec.topology().writes_remote() {
            self.ensure_writable("copy")?;
        }

        match spec.topology() {
            Topology::LocalToRemote => {
                let dest = self.to_wire(spec.destination())?;
                match local_kind(spec.source())? {
                    EntryKind::File => self.copy_file_up(spec.source(), &dest, spec.overwrite()),
                    EntryKind::Directory => {
                        self.copy_tree_up(spec.source(), &dest, spec.overwrite())
                    }
                }
            }
            Topology::RemoteToLocal => {
                let src = self.to_wire(spec.source())?;
                match self.remote_kind(&src)? {
                    EntryKind::File => {
                        self.copy_file_down(&src, spec.destination(), spec.overwrite())
                    }
                    EntryKind::Directory => {
                        self.copy_tree_down(&src, spec.destination(), spec.overwrite())
                    }
                }
            }
            Topology::RemoteToRemote => {
                let src = self.to_wire(spec.source())?;
                let dest = self.to_wire(spec.destination())?;
                self.reject_self_copy(&src, &dest)?;
                match self.remote_kind(&src)? {
                    EntryKind::File => self.copy_file_remote(&src, &dest, spec.overwrite()),
                    EntryKind::Directory => self.copy_tree_remote(&src, &dest, spec.overwrite()),
                }
            }
        }
    }

    /// Moves the entry described by `spec`.
    ///
    /// A remote-to-remote move is a server-side rename. Every other
    /// topology is the matching copy followed by a source delete that only
    /// runs after the copy fully succeeded.
    pub fn move_entry(&mut self, spec: &TransferSpec) -> Result<(), ShareError> {
        self.ensure_ready()?;
        self.ensure_writable("move")?;

        if spec.topology() == Topology::RemoteToRemote {
            return self.rename_remote(spec);
        }

        self.copy(spec)?;

        if spec.topology() == Topology::LocalToRemote {
            let source = spec.source();
            let removal = match local_kind(source)? {
                EntryKind::Directory => fs::remove_dir_all(source),
                EntryKind::File => fs::remove_file(source),
            };
            removal.map_err(|err| ShareError::LocalIo {
                path: source.to_path_buf(),
                source: err,
            })?;
            if info_gte(InfoFlag::Del, 1) {
                emit_info(
                    InfoFlag::Del,
                    1,
                    format!("removed moved source {}", source.display()),
                );
            }
            Ok(())
        } else {
            let src = self.to_wire(spec.source())?;
            match self.remote_kind(&src)? {
                EntryKind::Directory => self.remove_directory_wire(&src),
                EntryKind::File => self.delete_file_wire(&src),
            }
        }
    }

    fn rename_remote(&mut self, spec: &TransferSpec) -> Result<(), ShareError> {
        let src = self.to_wire(spec.source())?;
        let dest = self.to_wire(spec.destination())?;
        self.reject_self_copy(&src, &dest)?;

        let src_state = self.attributes_wire(&src)?;
        if !src_state.exists {
            return Err(ShareError::MissingSource {
                path: spec.source().to_path_buf(),
            });
        }

        let dest_state = self.attributes_wire(&dest)?;
        if dest_state.exists {
            if !spec.overwrite() {
                return Ok(());
            }
            if dest_state.is_directory != src_state.is_directory {
                let expected = if src_state.is_directory {
                    "directory"
                } else {
                    "file"
                };
                return Err(ShareError::TypeMismatch {
                    path: dest,
                    expected,
                });
            }
            if dest_state.is_directory {
                self.remove_directory_wire(&dest)?;
            } else {
                self.delete_file_wire(&dest)?;
            }
        }

        if info_gte(InfoFlag::Name, 1) {
            emit_info(InfoFlag::Name, 1, format!("renaming {src} -> {dest}"));
        }
        self.expect_ok(
            &Request::Rename {
                old: src,
                new: dest.clone(),
            },
            "rename",
            dest,
        )
    }

    fn reject_self_copy(&self, src: &str, dest: &str) -> Result<(), ShareError> {
        if src == dest {
            Err(ShareError::SelfCopy {
                path: src.to_owned(),
            })
        } else {
            Ok(())
        }
    }

    fn remote_kind(&mut self, wire: &str) -> Result<EntryKind, ShareError> {
        let state = self.attributes_wire(wire)?;
        if !state.exists {
            return Err(ShareError::MissingSource {
                path: PathBuf::from(wire),
            });
        }
        Ok(if state.is_directory {
            EntryKind::Directory
        } else {
            EntryKind::File
        })
    }

    fn copy_file_up(
        &mut self,
        local: &Path,
        wire_dest: &str,
        overwrite: bool,
    ) -> Result<(), ShareError> {
        let dest_state = self.attributes_wire(wire_dest)?;
        if dest_state.exists {
            if dest_state.is_directory {
                return Err(ShareError::TypeMismatch {
                    path: wire_dest.to_owned(),
                    expected: "file",
                });
            }
            if !overwrite {
                if info_gte(InfoFlag::Skip, 1) {
                    emit_info(InfoFlag::Skip, 1, format!("{wire_dest} exists, skipping"));
                }
                return Ok(());
            }
        }

        let name = path::final_segment(wire_dest);
        let stem = name.strip_prefix('.').unwrap_or(name);
        let staging = path::join_wire(
            path::parent_wire(wire_dest),
            &format!(".{stem}.{}", temp::random_suffix()),
        );

        if let Err(err) = self.store_payload(local, &staging) {
            self.discard_remote_staging(&staging);
            return Err(err);
        }

        // The destination may have changed while the payload streamed.
        let current = match self.attributes_wire(wire_dest) {
            Ok(state) => state,
            Err(err) => {
                self.discard_remote_staging(&staging);
                return Err(err);
            }
        };
        if current.exists {
            if current.is_directory {
                self.discard_remote_staging(&staging);
                return Err(ShareError::TypeMismatch {
                    path: wire_dest.to_owned(),
                    expected: "file",
                });
            }
            if !overwrite {
                self.discard_remote_staging(&staging);
                return Ok(());
            }
            if let Err(err) = self.delete_file_wire(wire_dest) {
                self.discard_remote_staging(&staging);
                return Err(err);
            }
        }

        let rename = Request::Rename {
            old: staging.clone(),
            new: wire_dest.to_owned(),
        };
        if let Err(err) = self.expect_ok(&rename, "rename", wire_dest) {
            self.discard_remote_staging(&staging);
            return Err(err);
        }

        if info_gte(InfoFlag::Copy, 1) {
            emit_info(
                InfoFlag::Copy,
                1,
                format!("{} -> {wire_dest}", local.display()),
            );
        }
        Ok(())
    }

    fn store_payload(&mut self, local: &Path, wire_dest: &str) -> Result<(), ShareError> {
        let mut file = File::open(local).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                ShareError::MissingSource {
                    path: local.to_path_buf(),
                }
            } else {
                ShareError::LocalIo {
                    path: local.to_path_buf(),
                    source: err,
                }
            }
        })?;
        let len = file
            .metadata()
            .map_err(|err| ShareError::LocalIo {
                path: local.to_path_buf(),
                source: err,
            })?
            .len();

        let request = Request::StoreFile {
            path: wire_dest.to_owned(),
            len,
        };
        let response = self.wire(|transport| {
            write_frame(transport, &request)?;
            send_payload(transport, &mut file, len)?;
            read_frame(transport)
        })?;

        match response {
            Response::Stored { bytes } => {
                if len > 0 && bytes == 0 {
                    Err(ShareError::StoreIncomplete {
                        path: wire_dest.to_owned(),
                    })
                } else {
                    Ok(())
                }
            }
            Response::Error { code, message } => Err(ShareError::Server {
                operation: "store file",
                path: wire_dest.to_owned(),
                code,
                message,
            }),
            _ => Err(ShareError::UnexpectedResponse {
                context: "storing a file",
            }),
        }
    }

    /// Best-effort removal of a remote staging file. The session may
    /// already be degraded at this point, in which case nothing is sent.
    fn discard_remote_staging(&mut self, wire: &str) {
        if !self.is_ready() {
            return;
        }
        let request = Request::DeleteFile {
            path: wire.to_owned(),
        };
        match self.roundtrip(&request) {
            Ok(Response::Error { code, message }) => {
                if debug_gte(DebugFlag::Io, 2) {
                    emit_debug(
                        DebugFlag::Io,
                        2,
                        format!("staging file {wire} not removed: {code}: {message}"),
                    );
                }
            }
            Ok(_) | Err(_) => {}
        }
    }

    fn copy_file_down(
        &mut self,
        wire_src: &str,
        local_dest: &Path,
        overwrite: bool,
    ) -> Result<(), ShareError> {
        match fs::metadata(local_dest) {
            Ok(meta) => {
                if meta.is_dir() {
                    return Err(ShareError::TypeMismatch {
                        path: local_dest.display().to_string(),
                        expected: "file",
                    });
                }
                if !overwrite {
                    if info_gte(InfoFlag::Skip, 1) {
                        emit_info(
                            InfoFlag::Skip,
                            1,
                            format!("{} exists, skipping", local_dest.display()),
                        );
                    }
                    return Ok(());
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(ShareError::LocalIo {
                    path: local_dest.to_path_buf(),
                    source: err,
                });
            }
        }

        if let Some(parent) = local_dest.parent() {
            fs::create_dir_all(parent).map_err(|err| ShareError::LocalIo {
                path: parent.to_path_buf(),
                source: err,
            })?;
        }

        let request = Request::RetrieveFile {
            path: wire_src.to_owned(),
        };
        let response = self.wire(|transport| {
            write_frame(transport, &request)?;
            read_frame(transport)
        })?;
        match response {
            Response::FileData { len } => {
                let (mut file, staged) =
                    StagedFile::create_for(local_dest).map_err(|err| ShareError::LocalIo {
                        path: local_dest.to_path_buf(),
                        source: err,
                    })?;
                self.wire(|transport| receive_payload(transport, &mut file, len))?;
                drop(file);
                staged
                    .persist(local_dest)
                    .map_err(|err| ShareError::LocalIo {
                        path: local_dest.to_path_buf(),
                        source: err,
                    })?;
                if info_gte(InfoFlag::Copy, 1) {
                    emit_info(
                        InfoFlag::Copy,
                        1,
                        format!("{wire_src} -> {}", local_dest.display()),
                    );
                }
                Ok(())
            }
            Response::Error {
                code: ErrorCode::NotFound,
                ..
            } => Err(ShareError::MissingSource {
                path: PathBuf::from(wire_src),
            }),
            Response::Error { code, message } => Err(ShareError::Server {
                operation: "retrieve file",
                path: wire_src.to_owned(),
                code,
                message,
            }),
            _ => Err(ShareError::UnexpectedResponse {
                context: "retrieving a file",
            }),
        }
    }

    fn copy_file_remote(
        &mut self,
        wire_src: &str,
        wire_dest: &str,
        overwrite: bool,
    ) -> Result<(), ShareError> {
        let staging_path = env::temp_dir().join(format!(
            ".updelta.{}.{}",
            path::final_segment(wire_src).trim_start_matches('.'),
            temp::random_suffix()
        ));
        let staging = StagedFile::adopt(staging_path.clone());

        self.copy_file_down(wire_src, &staging_path, true)?;
        self.copy_file_up(&staging_path, wire_dest, overwrite)?;
        drop(staging);
        Ok(())
    }

    fn copy_tree_up(
        &mut self,
        local_dir: &Path,
        wire_dest: &str,
        overwrite: bool,
    ) -> Result<(), ShareError> {
        let dest_state = self.attributes_wire(wire_dest)?;
        if dest_state.exists {
            if !dest_state.is_directory {
                return Err(ShareError::TypeMismatch {
                    path: wire_dest.to_owned(),
                    expected: "directory",
                });
            }
            if !overwrite {
                return Ok(());
            }
        }
        self.make_directory_wire(wire_dest)?;

        let walker = walk::WalkBuilder::new(local_dir)
            .include_root(false)
            .follow_symlinks(true)
            .build()?;
        for entry in walker {
            let entry = entry?;
            let child = path::wire_path(wire_dest, entry.relative_path())?;
            if entry.metadata().is_dir() {
                let state = self.attributes_wire(&child)?;
                if state.exists {
                    if state.is_directory {
                        continue;
                    }
                    return Err(ShareError::TypeMismatch {
                        path: child,
                        expected: "directory",
                    });
                }
                self.create_single_directory(&child)?;
            } else {
                self.copy_file_up(entry.full_path(), &child, true)?;
            }
        }
        Ok(())
    }

    fn copy_tree_down(
        &mut self,
        wire_src: &str,
        local_dir: &Path,
        overwrite: bool,
    ) -> Result<(), ShareError> {
        match fs::metadata(local_dir) {
            Ok(meta) => {
                if !meta.is_dir() {
                    return Err(ShareError::TypeMismatch {
                        path: local_dir.display().to_string(),
                        expected: "directory",
                    });
                }
                if !overwrite {
                    return Ok(());
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(ShareError::LocalIo {
                    path: local_dir.to_path_buf(),
                    source: err,
                });
            }
        }
        self.copy_tree_down_inner(wire_src, local_dir)
    }

    fn copy_tree_down_inner(&mut self, wire_src: &str, local_dir: &Path) -> Result<(), ShareError> {
        fs::create_dir_all(local_dir).map_err(|err| ShareError::LocalIo {
            path: local_dir.to_path_buf(),
            source: err,
        })?;

        for entry in self.list_wire(wire_src)? {
            let child_wire = path::join_wire(wire_src, &entry.name);
            let child_local = local_dir.join(&entry.name);
            if entry.is_directory {
                self.copy_tree_down_inner(&child_wire, &child_local)?;
            } else {
                self.copy_file_down(&child_wire, &child_local, true)?;
            }
        }
        Ok(())
    }

    fn copy_tree_remote(
        &mut self,
        wire_src: &str,
        wire_dest: &str,
        overwrite: bool,
    ) -> Result<(), ShareError> {
        let dest_state = self.attributes_wire(wire_dest)?;
        if dest_state.exists {
            if !dest_state.is_directory {
                return Err(ShareError::TypeMismatch {
                    path: wire_dest.to_owned(),
                    expected: "directory",
                });
            }
            if !overwrite {
                return Ok(());
            }
        }
        self.make_directory_wire(wire_dest)?;
        self.copy_tree_remote_inner(wire_src, wire_dest)
    }

    fn copy_tree_remote_inner(
        &mut self,
        wire_src: &str,
        wire_dest: &str,
    ) -> Result<(), ShareError> {
        for entry in self.list_wire(wire_src)? {
            let child_src = path::join_wire(wire_src, &entry.name);
            let child_dest = path::join_wire(wire_dest, &entry.name);
            if entry.is_directory {
                let state = self.attributes_wire(&child_dest)?;
                if !state.exists {
                    self.create_single_directory(&child_dest)?;
                } else if !state.is_directory {
                    return Err(ShareError::TypeMismatch {
                        path: child_dest,
                        expected: "directory",
                    });
                }
                self.copy_tree_remote_inner(&child_src, &child_dest)?;
            } else {
                self.copy_file_remote(&child_src, &child_dest, true)?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EntryKind {
    File,
    Directory,
}

fn local_kind(path: &Path) -> Result<EntryKind, ShareError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ShareError::MissingSource {
            path: path.to_path_buf(),
        }),
        Err(err) => Err(ShareError::LocalIo {
            path: path.to_path_buf(),
            source: err,
        }),
    }
}
