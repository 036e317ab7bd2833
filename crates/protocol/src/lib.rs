#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `protocol` defines the wire contract spoken between the update client and
//! the share daemon. The protocol is deliberately flat: every call is one
//! request frame answered by one response frame, with no server-side
//! recursion, batching, or transactions. Recursive behavior (tree copies,
//! recursive deletes) is composed client-side from these primitives.
//!
//! # Design
//!
//! - [`Request`] and [`Response`] are serde enums carried as length-prefixed
//!   bincode frames; [`write_frame`] and [`read_frame`] implement the
//!   framing.
//! - File content never travels inside a frame. `StoreFile` and the
//!   `FileData` response announce a byte length, then the raw payload
//!   follows on the stream; [`send_payload`] and [`receive_payload`] move
//!   it in fixed-size chunks.
//! - Frames are capped at [`MAX_FRAME_LEN`] so a corrupt or hostile length
//!   prefix cannot trigger an unbounded allocation.
//!
//! # Errors
//!
//! Transport and codec failures surface as [`ProtocolError`]. Server-side
//! operation failures travel inside [`Response::Error`] as an [`ErrorCode`]
//! plus message and are interpreted by the caller.

mod codec;
mod messages;

pub use codec::{
    MAX_FRAME_LEN, PAYLOAD_CHUNK_LEN, ProtocolError, read_frame, receive_payload, send_payload,
    write_frame,
};
pub use messages::{DirEntry, ErrorCode, Request, Response};
