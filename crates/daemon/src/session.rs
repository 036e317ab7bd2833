//! Per-connection request loop.
//!
//! A session answers one request frame at a time until the peer closes the
//! connection. Session state is two fields: whether the `Hello` carried
//! non-empty credentials, and which share a `SelectShare` picked. Anonymous
//! sessions get every mutating request answered with a `ReadOnly` error
//! before any filesystem access.
//!
//! # Errors
//!
//! Handler failures become `Error` response frames and the session keeps
//! serving. Transport failures, including a payload stream that dies
//! mid-transfer, end the session with a [`ProtocolError`].

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::PathBuf;

use logging::{DebugFlag, debug_gte, emit_debug};
use protocol::{
    DirEntry, ErrorCode, ProtocolError, Request, Response, read_frame, receive_payload,
    send_payload, write_frame,
};

use crate::ShareDefinition;

/// Serves one connection until the peer disconnects.
///
/// A clean disconnect between frames returns `Ok(())`. Any other transport
/// failure is returned to the caller.
pub fn serve_connection<S: Read + Write>(
    mut transport: S,
    shares: &[ShareDefinition],
) -> Result<(), ProtocolError> {
    let mut session = Session {
        shares,
        authenticated: false,
        selected: None,
    };
    loop {
        let request = match read_frame::<_, Request>(&mut transport) {
            Ok(request) => request,
            Err(ProtocolError::Io(err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        session.handle(&mut transport, request)?;
    }
}

struct Session<'a> {
    shares: &'a [ShareDefinition],
    authenticated: bool,
    selected: Option<&'a ShareDefinition>,
}

impl Session<'_> {
    fn handle<S: Read + Write>(
        &mut self,
        transport: &mut S,
        request: Request,
    ) -> Result<(), ProtocolError> {
        if debug_gte(DebugFlag::Cmd, 2) {
            emit_debug(DebugFlag::Cmd, 2, format!("request {}", request_name(&request)));
        }
        let response = match request {
            Request::Hello { username, password } => self.hello(&username, &password),
            Request::ListShares => self.list_shares(),
            Request::SelectShare { name } => self.select_share(&name),
            Request::ListPath { path } => self.list_path(&path),
            Request::GetAttributes { path } => self.attributes(&path),
            Request::CreateDirectory { path } => self.create_directory(&path),
            Request::DeleteDirectory { path } => self.delete_directory(&path),
            Request::DeleteFile { path } => self.delete_file(&path),
            Request::Rename { old, new } => self.rename(&old, &new),
            Request::StoreFile { path, len } => return self.store_file(transport, &path, len),
            Request::RetrieveFile { path } => return self.retrieve_file(transport, &path),
        };
        write_frame(transport, &response)
    }

    fn hello(&mut self, username: &str, password: &str) -> Response {
        self.authenticated = !username.is_empty() && !password.is_empty();
        if debug_gte(DebugFlag::Connect, 2) {
            let kind = if self.authenticated {
                "authenticated"
            } else {
                "anonymous"
            };
            emit_debug(DebugFlag::Connect, 2, format!("{kind} session opened"));
        }
        Response::Ok
    }

    fn list_shares(&self) -> Response {
        Response::Shares {
            names: self
                .shares
                .iter()
                .map(|share| share.name().to_owned())
                .collect(),
        }
    }

    fn select_share(&mut self, name: &str) -> Response {
        match self.shares.iter().find(|share| share.name() == name) {
            Some(share) => {
                self.selected = Some(share);
                Response::Ok
            }
            None => error(ErrorCode::UnknownShare, format!("unknown share '{name}'")),
        }
    }

    fn list_path(&self, wire: &str) -> Response {
        let local = match self.resolve(wire) {
            Ok(local) => local,
            Err(response) => return response,
        };
        let metadata = match fs::metadata(&local) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return error(ErrorCode::NotFound, format!("'{wire}' does not exist"));
            }
            Err(err) => return io_error(wire, &err),
        };
        if !metadata.is_dir() {
            return error(ErrorCode::NotADirectory, format!("'{wire}' is not a directory"));
        }

        let reader = match fs::read_dir(&local) {
            Ok(reader) => reader,
            Err(err) => return io_error(wire, &err),
        };
        let mut entries = Vec::new();
        for entry in reader {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => return io_error(wire, &err),
            };
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => return io_error(wire, &err),
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_directory: file_type.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Response::Entries { entries }
    }

    fn attributes(&self, wire: &str) -> Response {
        let local = match self.resolve(wire) {
            Ok(local) => local,
            Err(response) => return response,
        };
        match fs::metadata(&local) {
            Ok(metadata) => Response::Attributes {
                exists: true,
                is_directory: metadata.is_dir(),
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Response::Attributes {
                exists: false,
                is_directory: false,
            },
            Err(err) => io_error(wire, &err),
        }
    }

    fn create_directory(&self, wire: &str) -> Response {
        let local = match self.writable(wire, "create a directory") {
            Ok(local) => local,
            Err(response) => return response,
        };
        match fs::create_dir(&local) {
            Ok(()) => Response::Ok,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                if local.is_dir() {
                    Response::Ok
                } else {
                    error(
                        ErrorCode::NotADirectory,
                        format!("'{wire}' exists and is not a directory"),
                    )
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                error(ErrorCode::NotFound, format!("parent of '{wire}' does not exist"))
            }
            Err(err) => io_error(wire, &err),
        }
    }

    fn delete_directory(&self, wire: &str) -> Response {
        let local = match self.writable(wire, "delete a directory") {
            Ok(local) => local,
            Err(response) => return response,
        };
        match fs::symlink_metadata(&local) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => {
                return error(ErrorCode::NotADirectory, format!("'{wire}' is not a directory"));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return error(ErrorCode::NotFound, format!("'{wire}' does not exist"));
            }
            Err(err) => return io_error(wire, &err),
        }
        match fs::remove_dir(&local) {
            Ok(()) => Response::Ok,
            Err(err) => io_error(wire, &err),
        }
    }

    fn delete_file(&self, wire: &str) -> Response {
        let local = match self.writable(wire, "delete a file") {
            Ok(local) => local,
            Err(response) => return response,
        };
        match fs::symlink_metadata(&local) {
            Ok(metadata) if metadata.is_dir() => {
                return error(ErrorCode::NotAFile, format!("'{wire}' is not a file"));
            }
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return error(ErrorCode::NotFound, format!("'{wire}' does not exist"));
            }
            Err(err) => return io_error(wire, &err),
        }
        match fs::remove_file(&local) {
            Ok(()) => Response::Ok,
            Err(err) => io_error(wire, &err),
        }
    }

    fn rename(&self, old: &str, new: &str) -> Response {
        let old_local = match self.writable(old, "rename") {
            Ok(local) => local,
            Err(response) => return response,
        };
        let new_local = match self.resolve(new) {
            Ok(local) => local,
            Err(response) => return response,
        };
        if let Err(err) = fs::symlink_metadata(&old_local) {
            if err.kind() == io::ErrorKind::NotFound {
                return error(ErrorCode::NotFound, format!("'{old}' does not exist"));
            }
            return io_error(old, &err);
        }
        match fs::rename(&old_local, &new_local) {
            Ok(()) => Response::Ok,
            Err(err) => io_error(old, &err),
        }
    }

    fn store_file<S: Read + Write>(
        &self,
        transport: &mut S,
        wire: &str,
        len: u64,
    ) -> Result<(), ProtocolError> {
        let local = match self.writable(wire, "store a file") {
            Ok(local) => local,
            Err(response) => {
                drain(transport, len)?;
                return write_frame(transport, &response);
            }
        };
        if local.is_dir() {
            drain(transport, len)?;
            let response = error(ErrorCode::NotAFile, format!("'{wire}' is a directory"));
            return write_frame(transport, &response);
        }
        let mut file = match File::create(&local) {
            Ok(file) => file,
            Err(err) => {
                drain(transport, len)?;
                return write_frame(transport, &io_error(wire, &err));
            }
        };
        receive_payload(transport, &mut file, len)?;
        drop(file);
        if debug_gte(DebugFlag::Io, 1) {
            emit_debug(DebugFlag::Io, 1, format!("stored {len} bytes at '{wire}'"));
        }
        write_frame(transport, &Response::Stored { bytes: len })
    }

    fn retrieve_file<S: Read + Write>(
        &self,
        transport: &mut S,
        wire: &str,
    ) -> Result<(), ProtocolError> {
        let local = match self.resolve(wire) {
            Ok(local) => local,
            Err(response) => return write_frame(transport, &response),
        };
        let metadata = match fs::metadata(&local) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let response = error(ErrorCode::NotFound, format!("'{wire}' does not exist"));
                return write_frame(transport, &response);
            }
            Err(err) => return write_frame(transport, &io_error(wire, &err)),
        };
        if metadata.is_dir() {
            let response = error(ErrorCode::NotAFile, format!("'{wire}' is not a file"));
            return write_frame(transport, &response);
        }
        let mut file = match File::open(&local) {
            Ok(file) => file,
            Err(err) => return write_frame(transport, &io_error(wire, &err)),
        };
        let len = metadata.len();
        write_frame(transport, &Response::FileData { len })?;
        send_payload(transport, &mut file, len)?;
        if debug_gte(DebugFlag::Io, 1) {
            emit_debug(DebugFlag::Io, 1, format!("served {len} bytes from '{wire}'"));
        }
        Ok(())
    }

    /// Joins a validated wire path onto the selected share root.
    fn resolve(&self, wire: &str) -> Result<PathBuf, Response> {
        let Some(share) = self.selected else {
            return Err(error(ErrorCode::NoShareSelected, "no share selected"));
        };
        let mut local = share.root().to_path_buf();
        if wire.is_empty() {
            return Ok(local);
        }
        for segment in wire.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(error(
                    ErrorCode::BadPath,
                    format!("invalid segment in path '{wire}'"),
                ));
            }
            local.push(segment);
        }
        Ok(local)
    }

    fn writable(&self, wire: &str, operation: &str) -> Result<PathBuf, Response> {
        if !self.authenticated {
            return Err(error(
                ErrorCode::ReadOnly,
                format!("anonymous session may not {operation}"),
            ));
        }
        self.resolve(wire)
    }
}

fn error(code: ErrorCode, message: impl Into<String>) -> Response {
    Response::Error {
        code,
        message: message.into(),
    }
}

fn io_error(wire: &str, err: &io::Error) -> Response {
    error(ErrorCode::Io, format!("'{wire}': {err}"))
}

fn drain<S: Read>(transport: &mut S, len: u64) -> Result<(), ProtocolError> {
    let mut sink = io::sink();
    receive_payload(transport, &mut sink, len)
}

const fn request_name(request: &Request) -> &'static str {
    match request {
        Request::Hello { .. } => "hello",
        Request::ListShares => "list-shares",
        Request::SelectShare { .. } => "select-share",
        Request::ListPath { .. } => "list-path",
        Request::GetAttributes { .. } => "get-attributes",
        Request::CreateDirectory { .. } => "create-directory",
        Request::DeleteDirectory { .. } => "delete-directory",
        Request::DeleteFile { .. } => "delete-file",
        Request::StoreFile { .. } => "store-file",
        Request::RetrieveFile { .. } => "retrieve-file",
        Request::Rename { .. } => "rename",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct PeerScript {
        incoming: Cursor<Vec<u8>>,
        outgoing: Vec<u8>,
    }

    impl Read for PeerScript {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.incoming.read(buf)
        }
    }

    impl Write for PeerScript {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.outgoing.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn run_session(input: Vec<u8>, shares: &[ShareDefinition]) -> Vec<u8> {
        let mut transport = PeerScript {
            incoming: Cursor::new(input),
            outgoing: Vec::new(),
        };
        serve_connection(&mut transport, shares).expect("session");
        transport.outgoing
    }

    fn push_request(buffer: &mut Vec<u8>, request: &Request) {
        write_frame(buffer, request).expect("encode request");
    }

    fn decode_responses(bytes: &[u8]) -> Vec<Response> {
        let mut cursor = Cursor::new(bytes);
        let mut responses = Vec::new();
        loop {
            match read_frame::<_, Response>(&mut cursor) {
                Ok(response) => responses.push(response),
                Err(ProtocolError::Io(err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
                    return responses;
                }
                Err(err) => panic!("decode failed: {err}"),
            }
        }
    }

    fn hello() -> Request {
        Request::Hello {
            username: "builder".into(),
            password: "secret".into(),
        }
    }

    fn anonymous_hello() -> Request {
        Request::Hello {
            username: String::new(),
            password: String::new(),
        }
    }

    fn single_share(dir: &tempfile::TempDir) -> Vec<ShareDefinition> {
        vec![ShareDefinition::new("updates", dir.path())]
    }

    #[test]
    fn hello_and_share_listing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let shares = vec![
            ShareDefinition::new("updates", dir.path()),
            ShareDefinition::new("archive", dir.path()),
        ];
        let mut input = Vec::new();
        push_request(&mut input, &hello());
        push_request(&mut input, &Request::ListShares);

        let responses = decode_responses(&run_session(input, &shares));
        assert_eq!(
            responses,
            vec![
                Response::Ok,
                Response::Shares {
                    names: vec!["updates".into(), "archive".into()],
                },
            ]
        );
    }

    #[test]
    fn selecting_an_unknown_share_is_refused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut input = Vec::new();
        push_request(&mut input, &hello());
        push_request(
            &mut input,
            &Request::SelectShare {
                name: "nope".into(),
            },
        );

        let responses = decode_responses(&run_session(input, &single_share(&dir)));
        assert!(matches!(
            responses[1],
            Response::Error {
                code: ErrorCode::UnknownShare,
                ..
            }
        ));
    }

    #[test]
    fn operations_without_a_selected_share_are_refused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut input = Vec::new();
        push_request(&mut input, &hello());
        push_request(&mut input, &Request::GetAttributes { path: "x".into() });

        let responses = decode_responses(&run_session(input, &single_share(&dir)));
        assert!(matches!(
            responses[1],
            Response::Error {
                code: ErrorCode::NoShareSelected,
                ..
            }
        ));
    }

    #[test]
    fn attributes_report_absence_without_failing() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("present")).expect("mkdir");
        let mut input = Vec::new();
        push_request(&mut input, &hello());
        push_request(
            &mut input,
            &Request::SelectShare {
                name: "updates".into(),
            },
        );
        push_request(&mut input, &Request::GetAttributes { path: "ghost".into() });
        push_request(
            &mut input,
            &Request::GetAttributes {
                path: "present".into(),
            },
        );

        let responses = decode_responses(&run_session(input, &single_share(&dir)));
        assert_eq!(
            responses[2],
            Response::Attributes {
                exists: false,
                is_directory: false,
            }
        );
        assert_eq!(
            responses[3],
            Response::Attributes {
                exists: true,
                is_directory: true,
            }
        );
    }

    #[test]
    fn traversal_segments_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut input = Vec::new();
        push_request(&mut input, &hello());
        push_request(
            &mut input,
            &Request::SelectShare {
                name: "updates".into(),
            },
        );
        push_request(&mut input, &Request::ListPath { path: "../escape".into() });
        push_request(&mut input, &Request::GetAttributes { path: "a//b".into() });

        let responses = decode_responses(&run_session(input, &single_share(&dir)));
        assert!(matches!(
            responses[2],
            Response::Error {
                code: ErrorCode::BadPath,
                ..
            }
        ));
        assert!(matches!(
            responses[3],
            Response::Error {
                code: ErrorCode::BadPath,
                ..
            }
        ));
    }

    #[test]
    fn listing_returns_sorted_children() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("b.txt"), "b").expect("write");
        fs::write(dir.path().join("a.txt"), "a").expect("write");
        fs::create_dir(dir.path().join("sub")).expect("mkdir");
        let mut input = Vec::new();
        push_request(&mut input, &hello());
        push_request(
            &mut input,
            &Request::SelectShare {
                name: "updates".into(),
            },
        );
        push_request(&mut input, &Request::ListPath { path: String::new() });

        let responses = decode_responses(&run_session(input, &single_share(&dir)));
        assert_eq!(
            responses[2],
            Response::Entries {
                entries: vec![
                    DirEntry {
                        name: "a.txt".into(),
                        is_directory: false,
                    },
                    DirEntry {
                        name: "b.txt".into(),
                        is_directory: false,
                    },
                    DirEntry {
                        name: "sub".into(),
                        is_directory: true,
                    },
                ],
            }
        );
    }

    #[test]
    fn anonymous_mutations_are_refused_and_stream_stays_aligned() {
        let dir = tempfile::tempdir().expect("tempdir");
        let payload = b"hello";
        let mut input = Vec::new();
        push_request(&mut input, &anonymous_hello());
        push_request(
            &mut input,
            &Request::SelectShare {
                name: "updates".into(),
            },
        );
        push_request(
            &mut input,
            &Request::StoreFile {
                path: "f.bin".into(),
                len: payload.len() as u64,
            },
        );
        input.extend_from_slice(payload);
        push_request(&mut input, &Request::ListShares);

        let responses = decode_responses(&run_session(input, &single_share(&dir)));
        assert!(matches!(
            responses[2],
            Response::Error {
                code: ErrorCode::ReadOnly,
                ..
            }
        ));
        assert!(matches!(responses[3], Response::Shares { .. }));
        assert!(!dir.path().join("f.bin").exists());
    }

    #[test]
    fn store_writes_the_file_and_acks_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let payload = b"new package";
        let mut input = Vec::new();
        push_request(&mut input, &hello());
        push_request(
            &mut input,
            &Request::SelectShare {
                name: "updates".into(),
            },
        );
        push_request(
            &mut input,
            &Request::StoreFile {
                path: "out.bin".into(),
                len: payload.len() as u64,
            },
        );
        input.extend_from_slice(payload);

        let responses = decode_responses(&run_session(input, &single_share(&dir)));
        assert_eq!(
            responses[2],
            Response::Stored {
                bytes: payload.len() as u64,
            }
        );
        assert_eq!(fs::read(dir.path().join("out.bin")).expect("read"), payload);
    }

    #[test]
    fn retrieve_streams_file_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let payload = b"archived bytes";
        fs::write(dir.path().join("pkg.zip"), payload).expect("write");
        let mut input = Vec::new();
        push_request(&mut input, &anonymous_hello());
        push_request(
            &mut input,
            &Request::SelectShare {
                name: "updates".into(),
            },
        );
        push_request(
            &mut input,
            &Request::RetrieveFile {
                path: "pkg.zip".into(),
            },
        );

        let output = run_session(input, &single_share(&dir));
        let mut cursor = Cursor::new(output);
        let first: Response = read_frame(&mut cursor).expect("hello response");
        assert_eq!(first, Response::Ok);
        let second: Response = read_frame(&mut cursor).expect("select response");
        assert_eq!(second, Response::Ok);
        let third: Response = read_frame(&mut cursor).expect("file data header");
        assert_eq!(
            third,
            Response::FileData {
                len: payload.len() as u64,
            }
        );
        let mut body = Vec::new();
        cursor.read_to_end(&mut body).expect("read payload");
        assert_eq!(body, payload);
    }

    #[test]
    fn create_directory_tolerates_an_existing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut input = Vec::new();
        push_request(&mut input, &hello());
        push_request(
            &mut input,
            &Request::SelectShare {
                name: "updates".into(),
            },
        );
        push_request(&mut input, &Request::CreateDirectory { path: "d".into() });
        push_request(&mut input, &Request::CreateDirectory { path: "d".into() });

        let responses = decode_responses(&run_session(input, &single_share(&dir)));
        assert_eq!(responses[2], Response::Ok);
        assert_eq!(responses[3], Response::Ok);
        assert!(dir.path().join("d").is_dir());
    }

    #[test]
    fn delete_file_refuses_a_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("d")).expect("mkdir");
        let mut input = Vec::new();
        push_request(&mut input, &hello());
        push_request(
            &mut input,
            &Request::SelectShare {
                name: "updates".into(),
            },
        );
        push_request(&mut input, &Request::DeleteFile { path: "d".into() });

        let responses = decode_responses(&run_session(input, &single_share(&dir)));
        assert!(matches!(
            responses[2],
            Response::Error {
                code: ErrorCode::NotAFile,
                ..
            }
        ));
        assert!(dir.path().join("d").is_dir());
    }

    #[test]
    fn delete_directory_refuses_a_file_and_reports_absence() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("f.txt"), "f").expect("write");
        let mut input = Vec::new();
        push_request(&mut input, &hello());
        push_request(
            &mut input,
            &Request::SelectShare {
                name: "updates".into(),
            },
        );
        push_request(&mut input, &Request::DeleteDirectory { path: "f.txt".into() });
        push_request(&mut input, &Request::DeleteDirectory { path: "ghost".into() });

        let responses = decode_responses(&run_session(input, &single_share(&dir)));
        assert!(matches!(
            responses[2],
            Response::Error {
                code: ErrorCode::NotADirectory,
                ..
            }
        ));
        assert!(matches!(
            responses[3],
            Response::Error {
                code: ErrorCode::NotFound,
                ..
            }
        ));
    }

    #[test]
    fn rename_moves_an_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("a.txt"), "moved").expect("write");
        let mut input = Vec::new();
        push_request(&mut input, &hello());
        push_request(
            &mut input,
            &Request::SelectShare {
                name: "updates".into(),
            },
        );
        push_request(
            &mut input,
            &Request::Rename {
                old: "a.txt".into(),
                new: "b.txt".into(),
            },
        );

        let responses = decode_responses(&run_session(input, &single_share(&dir)));
        assert_eq!(responses[2], Response::Ok);
        assert!(!dir.path().join("a.txt").exists());
        assert_eq!(fs::read(dir.path().join("b.txt")).expect("read"), b"moved");
    }

    #[test]
    fn a_clean_disconnect_ends_the_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = run_session(Vec::new(), &single_share(&dir));
        assert!(output.is_empty());
    }
}
