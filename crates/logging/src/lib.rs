#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` provides the verbosity flag system shared across the updelta
//! workspace. Output detail is controlled by two families of flags:
//! [`InfoFlag`] categories cover user-facing progress (copies, diffs, mounts,
//! statistics) while [`DebugFlag`] categories cover internals (protocol
//! exchanges, directory settling, tree walks, external commands).
//!
//! # Design
//!
//! A [`VerbosityConfig`] pairs an [`InfoLevels`] and a [`DebugLevels`] table.
//! Each flag carries an independent `u8` level so callers can raise one area
//! without drowning in the rest. The config is installed into thread-local
//! storage via [`init`]; emit sites consult [`info_gte`]/[`debug_gte`] before
//! formatting anything, so disabled categories cost only a table lookup.
//!
//! With the `tracing` feature enabled, [`init_tracing`] installs a
//! subscriber layer that routes standard `tracing` macros through the same
//! flag tables, keyed by event target.
//!
//! # Invariants
//!
//! - Level 0 means a category is silent; checks never panic.
//! - The thread-local config is independent per thread; the daemon installs
//!   it once per connection thread.

mod config;
mod levels;
mod thread_local;

#[cfg(feature = "tracing")]
mod tracing_bridge;

pub use config::VerbosityConfig;
pub use levels::{DebugFlag, DebugLevels, InfoFlag, InfoLevels};
pub use thread_local::{
    DiagnosticEvent, apply_debug_flag, apply_info_flag, debug_gte, drain_events, emit_debug,
    emit_info, info_gte, init,
};

#[cfg(feature = "tracing")]
pub use tracing_bridge::{VerbosityLayer, init_tracing, init_tracing_with_filter};
