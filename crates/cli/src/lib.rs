#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! `updelta` client: builds an incremental update package from two
//! published releases and pushes it to an update share.
//!
//! # Overview
//!
//! A run pulls the previous and current release packages over HTTP,
//! exposes their payloads (mounting disk images, extracting archives),
//! computes the content diff, packages the changed files, and publishes
//! the result through [`publish::RemotePackagePublisher`]. The
//! [`pipeline`] module owns the orchestration; [`config`], [`fetch`], and
//! [`mount`] are its collaborators; [`cli`] wires everything to the
//! command line.
//!
//! # Design
//!
//! Every collaborator takes its inputs explicitly. Which platform entry
//! is built, where the build tree lives, and whether a publish happens
//! are all decided once at the command line and threaded through as
//! values; nothing in this crate reads ambient state.

mod cli;
mod config;
mod exit;
mod fetch;
mod mount;
mod pipeline;

pub use cli::{exit_code_from, run};
pub use config::{BuildParams, ConfigError, Platform};
pub use exit::ExitCode;
pub use fetch::{FetchError, fetch};
pub use mount::{MountError, mount, unmount};
pub use pipeline::{BuildLayout, BuildPipeline, PipelineError};
