#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! `updeltad` share daemon.
//!
//! # Overview
//!
//! The daemon exposes a set of named shares, each rooted at a local
//! directory, over the length-prefixed frame protocol from the
//! [`protocol`] crate. Every accepted TCP connection is served on its own
//! thread by a [`session`] loop that answers one request at a time until
//! the peer disconnects.
//!
//! # Design
//!
//! The share table is loaded once at startup and immutable afterwards, so
//! worker threads share it through an [`std::sync::Arc`] without locking.
//! Sessions carry only two pieces of state: whether the peer presented
//! non-empty credentials and which share it selected. Anonymous sessions
//! are served read-only; every mutating request they send is answered
//! with a [`protocol::ErrorCode::ReadOnly`] error without touching disk.
//!
//! # Invariants
//!
//! - Request paths are slash-separated and relative to the selected share
//!   root. Segments that are empty, `.`, `..`, or contain a backslash are
//!   rejected with [`protocol::ErrorCode::BadPath`] before the path is
//!   joined, so a session can never address anything outside its share.
//! - Store and retrieve payloads are streamed in bounded chunks; a request
//!   whose payload cannot be honored still drains the announced bytes so
//!   the frame stream stays aligned.

mod cli;
mod config;
mod error;
mod server;
mod session;

pub use cli::{exit_code_from, run};
pub use config::{DaemonConfig, ShareDefinition};
pub use error::DaemonError;
pub use server::Daemon;
pub use session::serve_connection;
