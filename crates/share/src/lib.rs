#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `share` implements the client side of the flat share protocol as a
//! [`RemoteTreeClient`] that reproduces local filesystem semantics over
//! per-call wire primitives. The server offers no recursion and no
//! transactions, so recursive creation, recursive deletion, and tree
//! copies are all composed here from single-path calls.
//!
//! # Design
//!
//! - A client owns its connection exclusively and binds to exactly one
//!   share and one working subtree for its whole life. The session moves
//!   `Disconnected -> Connecting -> Ready | Degraded`; a degraded session
//!   never self-heals, every later call fails fast.
//! - Anonymous sessions (empty username or password) are read-only. Every
//!   mutating operation is rejected client-side before any wire traffic.
//! - All paths are relative to the working subtree. Absolute paths and
//!   `..` components are rejected before a request is built, so no call
//!   can escape the subtree.
//! - Copy and move share one strategy table keyed on transfer topology and
//!   entry kind; a move is the matching copy followed by a source delete
//!   that only runs once the copy has fully succeeded.
//! - Directory creation confirms each created segment through the bounded
//!   [`settle::await_visible`] polling primitive instead of a fixed sleep.
//!
//! # Errors
//!
//! All operations return [`ShareError`]. Transport failures poison the
//! session ([`SessionState::Degraded`]); server-reported failures and
//! local precondition failures do not.

mod client;
mod config;
mod error;
pub mod path;
pub mod settle;
mod temp;
mod transfer;

pub use client::{RemotePathState, RemoteTreeClient, SessionState};
pub use config::ShareConfig;
pub use error::ShareError;
pub use temp::StagedFile;
pub use transfer::{Topology, TransferSpec};
