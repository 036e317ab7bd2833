//! crates/logging/src/tracing_bridge.rs
//! Bridge between the tracing crate and the workspace verbosity system.
//!
//! This module provides a custom tracing subscriber layer that maps tracing
//! events to the info and debug flag system. It enables using standard Rust
//! tracing macros (trace!, debug!, info!, warn!, error!) while keeping output
//! control in the hands of the verbosity levels.
//!
//! # Architecture
//!
//! - [`VerbosityLayer`]: a tracing-subscriber layer that filters and records events
//! - Events are mapped to info/debug flags based on the event target
//! - The thread-local verbosity configuration decides whether an event is kept

use super::config::VerbosityConfig;
use super::levels::{DebugFlag, InfoFlag};
use super::thread_local::{debug_gte, emit_debug, emit_info, info_gte};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// A tracing layer that bridges tracing events to the verbosity system.
///
/// The layer intercepts tracing events and maps them to the matching info or
/// debug flag based on the event's target and level.
pub struct VerbosityLayer {
    /// Cached verbosity config (kept for context, filtering is thread-local)
    _config: VerbosityConfig,
}

impl VerbosityLayer {
    /// Create a new layer with the given verbosity configuration.
    #[must_use]
    pub const fn new(config: VerbosityConfig) -> Self {
        Self { _config: config }
    }

    /// Map a tracing target to an info flag.
    fn target_to_info_flag(target: &str) -> Option<InfoFlag> {
        // Match against module paths - look for :: separator or exact word match
        match target {
            t if t.contains("::copy") || t == "copy" => Some(InfoFlag::Copy),
            t if t.contains("::del") || t.contains("::delete") || t == "del" || t == "delete" => {
                Some(InfoFlag::Del)
            }
            t if t.contains("::diff") || t == "diff" => Some(InfoFlag::Diff),
            t if t.contains("::misc") || t == "misc" => Some(InfoFlag::Misc),
            t if t.contains("::mount") || t == "mount" => Some(InfoFlag::Mount),
            t if t.contains("::name") || t == "name" => Some(InfoFlag::Name),
            t if t.contains("::progress") || t == "progress" => Some(InfoFlag::Progress),
            t if t.contains("::skip") || t == "skip" => Some(InfoFlag::Skip),
            t if t.contains("::stats") || t == "stats" => Some(InfoFlag::Stats),
            _ => None,
        }
    }

    /// Map a tracing target to a debug flag.
    fn target_to_debug_flag(target: &str) -> Option<DebugFlag> {
        match target {
            t if t.contains("::archive") || t == "archive" => Some(DebugFlag::Archive),
            t if t.contains("::bind") || t == "bind" => Some(DebugFlag::Bind),
            t if t.contains("::connect") || t == "connect" => Some(DebugFlag::Connect),
            t if t.contains("::cmd") || t == "cmd" => Some(DebugFlag::Cmd),
            t if t.contains("::del") || t.contains("::delete") || t == "del" || t == "delete" => {
                Some(DebugFlag::Del)
            }
            t if t.contains("::digest") || t == "digest" => Some(DebugFlag::Digest),
            t if t.contains("::io") || t == "io" => Some(DebugFlag::Io),
            t if t.contains("::proto")
                || t.contains("::protocol")
                || t == "proto"
                || t == "protocol" =>
            {
                Some(DebugFlag::Proto)
            }
            t if t.contains("::settle") || t == "settle" => Some(DebugFlag::Settle),
            t if t.contains("::time") || t == "time" => Some(DebugFlag::Time),
            t if t.contains("::walk") || t == "walk" => Some(DebugFlag::Walk),
            _ => None,
        }
    }

    /// Map a tracing level to a verbosity level.
    const fn level_to_verbosity_level(level: &Level) -> u8 {
        match *level {
            Level::ERROR | Level::WARN | Level::INFO => 1,
            Level::DEBUG => 2,
            Level::TRACE => 3,
        }
    }
}

impl<S> Layer<S> for VerbosityLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let target = metadata.target();
        let level = metadata.level();
        let verbosity_level = Self::level_to_verbosity_level(level);

        // Debug flags are the more specific mapping, try them first
        if let Some(debug_flag) = Self::target_to_debug_flag(target) {
            if debug_gte(debug_flag, verbosity_level) {
                let mut visitor = MessageVisitor::default();
                event.record(&mut visitor);
                if let Some(message) = visitor.message {
                    emit_debug(debug_flag, verbosity_level, message);
                }
            }
            return;
        }

        if let Some(info_flag) = Self::target_to_info_flag(target) {
            if info_gte(info_flag, verbosity_level) {
                let mut visitor = MessageVisitor::default();
                event.record(&mut visitor);
                if let Some(message) = visitor.message {
                    emit_info(info_flag, verbosity_level, message);
                }
            }
        }
    }
}

/// Visitor to extract the message from a tracing event.
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        }
    }
}

/// Initialize tracing with the workspace verbosity configuration.
///
/// Installs a subscriber that bridges tracing events to the info/debug flag
/// system and seeds the thread-local verbosity config.
pub fn init_tracing(config: VerbosityConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    super::thread_local::init(config.clone());

    let layer = VerbosityLayer::new(config);

    tracing_subscriber::registry().with(layer).init();
}

/// Initialize tracing with a custom filter in addition to the verbosity layer.
///
/// Allows combining the flag system with standard tracing filters, such as an
/// `EnvFilter` built from `RUST_LOG`.
pub fn init_tracing_with_filter<F>(config: VerbosityConfig, filter: F)
where
    F: Layer<tracing_subscriber::Registry> + Send + Sync + 'static,
{
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    super::thread_local::init(config.clone());

    let layer = VerbosityLayer::new(config);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .init();
}
