//! crates/logging/src/levels.rs
//! Flag enums and level structures for info and debug verbosity.

/// Info flags for diagnostic categories.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InfoFlag {
    /// File copy operations.
    Copy,
    /// Remote deletion operations.
    Del,
    /// Tree comparison results.
    Diff,
    /// Miscellaneous operations.
    Misc,
    /// Disk-image mount handling.
    Mount,
    /// File name processing.
    Name,
    /// Package build progress.
    Progress,
    /// Skipped entries.
    Skip,
    /// Transfer statistics.
    Stats,
}

/// Debug flags for diagnostic categories.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DebugFlag {
    /// Archive packing and extraction.
    Archive,
    /// Socket binding.
    Bind,
    /// Connection establishment.
    Connect,
    /// External command execution.
    Cmd,
    /// Deletion operations.
    Del,
    /// Content digest calculations.
    Digest,
    /// I/O operations.
    Io,
    /// Wire protocol exchanges.
    Proto,
    /// Directory-visibility settling.
    Settle,
    /// Timing information.
    Time,
    /// Directory tree walks.
    Walk,
}

/// Info verbosity levels for each flag.
#[derive(Clone, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InfoLevels {
    /// File copy operations level.
    pub copy: u8,
    /// Remote deletion operations level.
    pub del: u8,
    /// Tree comparison results level.
    pub diff: u8,
    /// Miscellaneous operations level.
    pub misc: u8,
    /// Disk-image mount handling level.
    pub mount: u8,
    /// File name processing level.
    pub name: u8,
    /// Package build progress level.
    pub progress: u8,
    /// Skipped entries level.
    pub skip: u8,
    /// Transfer statistics level.
    pub stats: u8,
}

impl InfoLevels {
    /// Get the level for a specific flag.
    pub fn get(&self, flag: InfoFlag) -> u8 {
        match flag {
            InfoFlag::Copy => self.copy,
            InfoFlag::Del => self.del,
            InfoFlag::Diff => self.diff,
            InfoFlag::Misc => self.misc,
            InfoFlag::Mount => self.mount,
            InfoFlag::Name => self.name,
            InfoFlag::Progress => self.progress,
            InfoFlag::Skip => self.skip,
            InfoFlag::Stats => self.stats,
        }
    }

    /// Set the level for a specific flag.
    pub fn set(&mut self, flag: InfoFlag, level: u8) {
        match flag {
            InfoFlag::Copy => self.copy = level,
            InfoFlag::Del => self.del = level,
            InfoFlag::Diff => self.diff = level,
            InfoFlag::Misc => self.misc = level,
            InfoFlag::Mount => self.mount = level,
            InfoFlag::Name => self.name = level,
            InfoFlag::Progress => self.progress = level,
            InfoFlag::Skip => self.skip = level,
            InfoFlag::Stats => self.stats = level,
        }
    }

    /// Set all flags to the specified level.
    pub fn set_all(&mut self, level: u8) {
        self.copy = level;
        self.del = level;
        self.diff = level;
        self.misc = level;
        self.mount = level;
        self.name = level;
        self.progress = level;
        self.skip = level;
        self.stats = level;
    }
}

/// Debug verbosity levels for each flag.
#[derive(Clone, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DebugLevels {
    /// Archive packing and extraction level.
    pub archive: u8,
    /// Socket binding level.
    pub bind: u8,
    /// Connection establishment level.
    pub connect: u8,
    /// External command execution level.
    pub cmd: u8,
    /// Deletion operations level.
    pub del: u8,
    /// Content digest calculations level.
    pub digest: u8,
    /// I/O operations level.
    pub io: u8,
    /// Wire protocol exchanges level.
    pub proto: u8,
    /// Directory-visibility settling level.
    pub settle: u8,
    /// Timing information level.
    pub time: u8,
    /// Directory tree walks level.
    pub walk: u8,
}

impl DebugLevels {
    /// Get the level for a specific flag.
    pub fn get(&self, flag: DebugFlag) -> u8 {
        match flag {
            DebugFlag::Archive => self.archive,
            DebugFlag::Bind => self.bind,
            DebugFlag::Connect => self.connect,
            DebugFlag::Cmd => self.cmd,
            DebugFlag::Del => self.del,
            DebugFlag::Digest => self.digest,
            DebugFlag::Io => self.io,
            DebugFlag::Proto => self.proto,
            DebugFlag::Settle => self.settle,
            DebugFlag::Time => self.time,
            DebugFlag::Walk => self.walk,
        }
    }

    /// Set the level for a specific flag.
    pub fn set(&mut self, flag: DebugFlag, level: u8) {
        match flag {
            DebugFlag::Archive => self.archive = level,
            DebugFlag::Bind => self.bind = level,
            DebugFlag::Connect => self.connect = level,
            DebugFlag::Cmd => self.cmd = level,
            DebugFlag::Del => self.del = level,
            DebugFlag::Digest => self.digest = level,
            DebugFlag::Io => self.io = level,
            DebugFlag::Proto => self.proto = level,
            DebugFlag::Settle => self.settle = level,
            DebugFlag::Time => self.time = level,
            DebugFlag::Walk => self.walk = level,
        }
    }

    /// Set all flags to the specified level.
    pub fn set_all(&mut self, level: u8) {
        self.archive = level;
        self.bind = level;
        self.connect = level;
        self.cmd = level;
        self.del = level;
        self.digest = level;
        self.io = level;
        self.proto = level;
        self.settle = level;
        self.time = level;
        self.walk = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_levels_get_set_roundtrip() {
        let mut levels = InfoLevels::default();
        assert_eq!(levels.get(InfoFlag::Diff), 0);

        levels.set(InfoFlag::Diff, 2);
        assert_eq!(levels.get(InfoFlag::Diff), 2);
        assert_eq!(levels.get(InfoFlag::Copy), 0);
    }

    #[test]
    fn info_levels_set_all() {
        let mut levels = InfoLevels::default();
        levels.set_all(3);

        assert_eq!(levels.get(InfoFlag::Copy), 3);
        assert_eq!(levels.get(InfoFlag::Stats), 3);
        assert_eq!(levels.get(InfoFlag::Mount), 3);
    }

    #[test]
    fn debug_levels_get_set_roundtrip() {
        let mut levels = DebugLevels::default();
        levels.set(DebugFlag::Settle, 1);

        assert_eq!(levels.get(DebugFlag::Settle), 1);
        assert_eq!(levels.get(DebugFlag::Proto), 0);
    }

    #[test]
    fn debug_levels_set_all() {
        let mut levels = DebugLevels::default();
        levels.set_all(4);

        assert_eq!(levels.get(DebugFlag::Archive), 4);
        assert_eq!(levels.get(DebugFlag::Walk), 4);
    }
}
