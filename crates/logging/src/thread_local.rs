//! crates/logging/src/thread_local.rs
//! Thread-local storage for verbosity configuration and event collection.

use super::config::VerbosityConfig;
use super::levels::{DebugFlag, InfoFlag};
use std::cell::RefCell;

thread_local! {
    static VERBOSITY: RefCell<VerbosityConfig> = RefCell::new(VerbosityConfig::default());
    #[allow(clippy::missing_const_for_thread_local)]
    static EVENTS: RefCell<Vec<DiagnosticEvent>> = RefCell::new(Vec::new());
}

/// Diagnostic event collected during execution.
#[derive(Clone, Debug)]
pub enum DiagnosticEvent {
    /// Info-level diagnostic event.
    Info {
        /// The info flag category.
        flag: InfoFlag,
        /// The verbosity level.
        level: u8,
        /// The diagnostic message.
        message: String,
    },
    /// Debug-level diagnostic event.
    Debug {
        /// The debug flag category.
        flag: DebugFlag,
        /// The verbosity level.
        level: u8,
        /// The diagnostic message.
        message: String,
    },
}

/// Initialize verbosity configuration for the current thread.
pub fn init(config: VerbosityConfig) {
    VERBOSITY.with(|v| {
        *v.borrow_mut() = config;
    });
}

/// Check if the info flag is at or above the specified level.
pub fn info_gte(flag: InfoFlag, level: u8) -> bool {
    VERBOSITY.with(|v| v.borrow().info.get(flag) >= level)
}

/// Check if the debug flag is at or above the specified level.
pub fn debug_gte(flag: DebugFlag, level: u8) -> bool {
    VERBOSITY.with(|v| v.borrow().debug.get(flag) >= level)
}

/// Emit an info diagnostic event.
pub fn emit_info(flag: InfoFlag, level: u8, message: String) {
    EVENTS.with(|e| {
        e.borrow_mut().push(DiagnosticEvent::Info {
            flag,
            level,
            message,
        });
    });
}

/// Emit a debug diagnostic event.
pub fn emit_debug(flag: DebugFlag, level: u8, message: String) {
    EVENTS.with(|e| {
        e.borrow_mut().push(DiagnosticEvent::Debug {
            flag,
            level,
            message,
        });
    });
}

/// Drain all collected events, clearing the internal buffer.
pub fn drain_events() -> Vec<DiagnosticEvent> {
    EVENTS.with(|e| e.borrow_mut().drain(..).collect())
}

/// Apply an info flag token to the current configuration.
pub fn apply_info_flag(token: &str) -> Result<(), String> {
    VERBOSITY.with(|v| v.borrow_mut().apply_info_flag(token))
}

/// Apply a debug flag token to the current configuration.
pub fn apply_debug_flag(token: &str) -> Result<(), String> {
    VERBOSITY.with(|v| v.borrow_mut().apply_debug_flag(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_and_check() {
        let mut config = VerbosityConfig::default();
        config.info.copy = 2;
        config.debug.settle = 3;

        init(config);

        assert!(info_gte(InfoFlag::Copy, 1));
        assert!(info_gte(InfoFlag::Copy, 2));
        assert!(!info_gte(InfoFlag::Copy, 3));

        assert!(debug_gte(DebugFlag::Settle, 1));
        assert!(debug_gte(DebugFlag::Settle, 3));
        assert!(!debug_gte(DebugFlag::Settle, 4));
    }

    #[test]
    fn emit_and_drain() {
        init(VerbosityConfig::default());

        emit_info(InfoFlag::Diff, 1, "tree compared".to_string());
        emit_debug(DebugFlag::Proto, 2, "frame sent".to_string());

        let events = drain_events();
        assert_eq!(events.len(), 2);

        match &events[0] {
            DiagnosticEvent::Info {
                flag,
                level,
                message,
            } => {
                assert_eq!(*flag, InfoFlag::Diff);
                assert_eq!(*level, 1);
                assert_eq!(message, "tree compared");
            }
            DiagnosticEvent::Debug { .. } => panic!("expected info event"),
        }

        assert!(drain_events().is_empty());
    }

    #[test]
    fn apply_flags_through_thread_local() {
        init(VerbosityConfig::default());

        apply_info_flag("stats2").unwrap();
        apply_debug_flag("walk").unwrap();

        assert!(info_gte(InfoFlag::Stats, 2));
        assert!(debug_gte(DebugFlag::Walk, 1));
    }
}
