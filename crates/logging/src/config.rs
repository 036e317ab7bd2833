//! crates/logging/src/config.rs
//! Verbosity configuration combining info and debug levels.

use super::levels::{DebugFlag, DebugLevels, InfoFlag, InfoLevels};

/// Combined verbosity configuration for info and debug flags.
#[derive(Clone, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VerbosityConfig {
    /// Info flag levels.
    pub info: InfoLevels,
    /// Debug flag levels.
    pub debug: DebugLevels,
}

impl VerbosityConfig {
    /// Create a new configuration from a verbose level (0-4).
    ///
    /// Level 0 is quiet, 1 reports the main pipeline stages, 2 adds
    /// per-file detail plus connection and command diagnostics, 3 and
    /// above open the protocol and settling internals.
    pub fn from_verbose_level(level: u8) -> Self {
        let mut config = Self::default();

        match level {
            0 => {}
            1 => {
                config.info.copy = 1;
                config.info.del = 1;
                config.info.diff = 1;
                config.info.misc = 1;
                config.info.mount = 1;
                config.info.progress = 1;
                config.info.stats = 1;
            }
            2 => {
                config.info.copy = 1;
                config.info.del = 1;
                config.info.diff = 2;
                config.info.misc = 2;
                config.info.mount = 2;
                config.info.name = 1;
                config.info.progress = 1;
                config.info.skip = 1;
                config.info.stats = 1;
                config.debug.bind = 1;
                config.debug.cmd = 1;
                config.debug.connect = 1;
                config.debug.del = 1;
                config.debug.walk = 1;
            }
            3 => {
                config.info.copy = 1;
                config.info.del = 1;
                config.info.diff = 2;
                config.info.misc = 2;
                config.info.mount = 2;
                config.info.name = 2;
                config.info.progress = 1;
                config.info.skip = 2;
                config.info.stats = 1;
                config.debug.archive = 1;
                config.debug.bind = 1;
                config.debug.cmd = 1;
                config.debug.connect = 2;
                config.debug.del = 2;
                config.debug.digest = 1;
                config.debug.proto = 1;
                config.debug.settle = 1;
                config.debug.time = 1;
                config.debug.walk = 2;
            }
            _ => {
                config.info.copy = 1;
                config.info.del = 1;
                config.info.diff = 2;
                config.info.misc = 2;
                config.info.mount = 2;
                config.info.name = 2;
                config.info.progress = 1;
                config.info.skip = 2;
                config.info.stats = 1;
                config.debug.archive = 2;
                config.debug.bind = 1;
                config.debug.cmd = 2;
                config.debug.connect = 2;
                config.debug.del = 3;
                config.debug.digest = 2;
                config.debug.io = 2;
                config.debug.proto = 2;
                config.debug.settle = 2;
                config.debug.time = 2;
                config.debug.walk = 3;
            }
        }

        config
    }

    /// Apply a single info flag token (e.g., "diff2", "copy").
    pub fn apply_info_flag(&mut self, token: &str) -> Result<(), String> {
        let (name, level) = parse_flag_token(token)?;

        let flag = match name {
            "copy" => InfoFlag::Copy,
            "del" | "delete" => InfoFlag::Del,
            "diff" => InfoFlag::Diff,
            "misc" => InfoFlag::Misc,
            "mount" => InfoFlag::Mount,
            "name" => InfoFlag::Name,
            "progress" => InfoFlag::Progress,
            "skip" => InfoFlag::Skip,
            "stats" => InfoFlag::Stats,
            "all" => {
                self.info.set_all(level);
                return Ok(());
            }
            other => return Err(format!("unknown info flag: {other}")),
        };

        self.info.set(flag, level);
        Ok(())
    }

    /// Apply a single debug flag token (e.g., "proto2", "settle").
    pub fn apply_debug_flag(&mut self, token: &str) -> Result<(), String> {
        let (name, level) = parse_flag_token(token)?;

        let flag = match name {
            "archive" => DebugFlag::Archive,
            "bind" => DebugFlag::Bind,
            "connect" => DebugFlag::Connect,
            "cmd" => DebugFlag::Cmd,
            "del" | "delete" => DebugFlag::Del,
            "digest" => DebugFlag::Digest,
            "io" => DebugFlag::Io,
            "proto" | "protocol" => DebugFlag::Proto,
            "settle" => DebugFlag::Settle,
            "time" => DebugFlag::Time,
            "walk" => DebugFlag::Walk,
            "all" => {
                self.debug.set_all(level);
                return Ok(());
            }
            other => return Err(format!("unknown debug flag: {other}")),
        };

        self.debug.set(flag, level);
        Ok(())
    }
}

/// Split a flag token into its name and optional trailing level digit.
///
/// A bare name defaults to level 1; "name0" disables the flag.
fn parse_flag_token(token: &str) -> Result<(&str, u8), String> {
    let token = token.trim();
    if token.is_empty() {
        return Err("empty flag token".to_owned());
    }

    let digit_at = token.find(|c: char| c.is_ascii_digit());
    match digit_at {
        None => Ok((token, 1)),
        Some(pos) => {
            let (name, digits) = token.split_at(pos);
            if name.is_empty() {
                return Err(format!("flag token has no name: {token}"));
            }
            let level: u8 = digits
                .parse()
                .map_err(|_| format!("invalid level in flag token: {token}"))?;
            Ok((name, level))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_level_has_no_output() {
        let config = VerbosityConfig::from_verbose_level(0);
        assert_eq!(config.info.get(InfoFlag::Copy), 0);
        assert_eq!(config.debug.get(DebugFlag::Proto), 0);
    }

    #[test]
    fn level_one_enables_pipeline_stages() {
        let config = VerbosityConfig::from_verbose_level(1);
        assert_eq!(config.info.get(InfoFlag::Diff), 1);
        assert_eq!(config.info.get(InfoFlag::Progress), 1);
        assert_eq!(config.debug.get(DebugFlag::Connect), 0);
    }

    #[test]
    fn level_three_opens_protocol_detail() {
        let config = VerbosityConfig::from_verbose_level(3);
        assert_eq!(config.debug.get(DebugFlag::Proto), 1);
        assert_eq!(config.debug.get(DebugFlag::Settle), 1);
        assert_eq!(config.debug.get(DebugFlag::Walk), 2);
    }

    #[test]
    fn levels_above_four_saturate() {
        let four = VerbosityConfig::from_verbose_level(4);
        let nine = VerbosityConfig::from_verbose_level(9);
        assert_eq!(four.debug.get(DebugFlag::Walk), nine.debug.get(DebugFlag::Walk));
    }

    #[test]
    fn apply_info_flag_with_level() {
        let mut config = VerbosityConfig::default();
        config.apply_info_flag("diff2").unwrap();
        assert_eq!(config.info.get(InfoFlag::Diff), 2);
    }

    #[test]
    fn apply_info_flag_bare_name_defaults_to_one() {
        let mut config = VerbosityConfig::default();
        config.apply_info_flag("copy").unwrap();
        assert_eq!(config.info.get(InfoFlag::Copy), 1);
    }

    #[test]
    fn apply_info_flag_all() {
        let mut config = VerbosityConfig::default();
        config.apply_info_flag("all2").unwrap();
        assert_eq!(config.info.get(InfoFlag::Stats), 2);
        assert_eq!(config.info.get(InfoFlag::Mount), 2);
    }

    #[test]
    fn apply_debug_flag_aliases() {
        let mut config = VerbosityConfig::default();
        config.apply_debug_flag("protocol3").unwrap();
        assert_eq!(config.debug.get(DebugFlag::Proto), 3);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let mut config = VerbosityConfig::default();
        assert!(config.apply_info_flag("bogus").is_err());
        assert!(config.apply_debug_flag("bogus2").is_err());
    }

    #[test]
    fn zero_level_disables_flag() {
        let mut config = VerbosityConfig::from_verbose_level(1);
        config.apply_info_flag("copy0").unwrap();
        assert_eq!(config.info.get(InfoFlag::Copy), 0);
    }
}
