//! Build configuration loaded from `config.json`.
//!
//! The file carries one `params` array with an entry per platform. Each
//! entry names the previous and current release, the download server, and
//! the package file name:
//!
//! ```json
//! {
//!   "params": [
//!     {
//!       "platform": "mac",
//!       "previous_version": "1.4.2",
//!       "current_version": "1.5.0",
//!       "server_url": "https://packages.example.net/releases",
//!       "package_name": "app.dmg"
//!     }
//!   ]
//! }
//! ```
//!
//! Loading selects the entry whose `platform` matches the requested one and
//! derives every URL and name from it. Trailing slashes on `server_url` are
//! stripped so joined URLs never carry a double separator.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Target platform a build entry applies to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Platform {
    /// macOS disk-image packages.
    Mac,
    /// Windows packages.
    Win,
    /// Linux packages.
    Linux,
}

impl Platform {
    /// Platform the running binary was compiled for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Mac
        } else if cfg!(windows) {
            Self::Win
        } else {
            Self::Linux
        }
    }

    /// Key used for this platform in configuration files and remote paths.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Mac => "mac",
            Self::Win => "win",
            Self::Linux => "linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error raised while loading build parameters.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config {path}: {source}")]
    Read {
        /// Configuration file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The configuration file is not valid JSON or misses required fields.
    #[error("cannot parse config {path}: {source}")]
    Parse {
        /// Configuration file path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// No entry in the `params` array matches the requested platform.
    #[error("config {path} has no entry for platform '{platform}'")]
    MissingPlatform {
        /// Configuration file path.
        path: PathBuf,
        /// Platform that was requested.
        platform: Platform,
    },
}

/// Build parameters for one platform entry.
#[derive(Clone, Debug)]
pub struct BuildParams {
    platform: Platform,
    previous_version: String,
    current_version: String,
    server_url: String,
    package_name: String,
}

#[derive(Deserialize)]
struct ConfigFile {
    params: Vec<ParamEntry>,
}

#[derive(Deserialize)]
struct ParamEntry {
    platform: String,
    previous_version: String,
    current_version: String,
    server_url: String,
    package_name: String,
}

impl BuildParams {
    /// Loads the entry for the platform this binary runs on.
    ///
    /// # Errors
    ///
    /// See [`load_for`](Self::load_for).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_for(path, Platform::current())
    }

    /// Loads the entry for an explicit platform.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read,
    /// [`ConfigError::Parse`] on malformed JSON, and
    /// [`ConfigError::MissingPlatform`] when no entry matches.
    pub fn load_for(path: &Path, platform: Platform) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let entry = file
            .params
            .into_iter()
            .find(|entry| entry.platform == platform.key())
            .ok_or(ConfigError::MissingPlatform {
                path: path.to_path_buf(),
                platform,
            })?;
        Ok(Self {
            platform,
            previous_version: entry.previous_version,
            current_version: entry.current_version,
            server_url: entry.server_url.trim_end_matches('/').to_owned(),
            package_name: entry.package_name,
        })
    }

    /// Platform this entry applies to.
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// Version string of the release being updated from.
    #[must_use]
    pub fn previous_version(&self) -> &str {
        &self.previous_version
    }

    /// Version string of the release being updated to.
    #[must_use]
    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Package file name as published by the release pipeline.
    #[must_use]
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Download URL of the previous release package.
    #[must_use]
    pub fn previous_url(&self) -> String {
        self.package_url(&self.previous_version)
    }

    /// Download URL of the current release package.
    #[must_use]
    pub fn current_url(&self) -> String {
        self.package_url(&self.current_version)
    }

    fn package_url(&self, version: &str) -> String {
        format!(
            "{}/{version}/{}/{}",
            self.server_url,
            self.platform.key(),
            self.package_name
        )
    }

    /// File name of the incremental package built by this run.
    ///
    /// Version strings may carry path separators (release branches such as
    /// `1.5/beta`); both separators are flattened to `-` so the name is a
    /// single path segment on every platform.
    #[must_use]
    pub fn diff_package_name(&self) -> String {
        format!(
            "{}~{}.zip",
            sanitize_version(&self.previous_version),
            sanitize_version(&self.current_version)
        )
    }

    /// Remote directory the incremental package is published into,
    /// relative to the share's working subtree.
    #[must_use]
    pub fn diff_remote_dir(&self) -> PathBuf {
        PathBuf::from(&self.current_version).join(self.platform.key())
    }
}

fn sanitize_version(version: &str) -> String {
    version.replace(['/', '\\'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(json: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let mut file = fs::File::create(&path).expect("create");
        file.write_all(json.as_bytes()).expect("write");
        (dir, path)
    }

    const SAMPLE: &str = r#"{
        "params": [
            {
                "platform": "mac",
                "previous_version": "1.4.2",
                "current_version": "1.5.0",
                "server_url": "https://packages.example.net/releases/",
                "package_name": "app.dmg"
            },
            {
                "platform": "linux",
                "previous_version": "1.4.2",
                "current_version": "1.5.0",
                "server_url": "https://packages.example.net/releases",
                "package_name": "app.tar.gz"
            }
        ]
    }"#;

    #[test]
    fn entry_is_selected_by_platform() {
        let (_dir, path) = write_config(SAMPLE);
        let params = BuildParams::load_for(&path, Platform::Linux).expect("load");
        assert_eq!(params.platform(), Platform::Linux);
        assert_eq!(params.package_name(), "app.tar.gz");
    }

    #[test]
    fn missing_platform_is_reported() {
        let (_dir, path) = write_config(SAMPLE);
        let err = BuildParams::load_for(&path, Platform::Win).expect_err("must fail");
        assert!(matches!(err, ConfigError::MissingPlatform { .. }));
    }

    #[test]
    fn urls_join_server_version_platform_and_name() {
        let (_dir, path) = write_config(SAMPLE);
        let params = BuildParams::load_for(&path, Platform::Mac).expect("load");
        assert_eq!(
            params.previous_url(),
            "https://packages.example.net/releases/1.4.2/mac/app.dmg"
        );
        assert_eq!(
            params.current_url(),
            "https://packages.example.net/releases/1.5.0/mac/app.dmg"
        );
    }

    #[test]
    fn trailing_slashes_on_the_server_url_are_stripped() {
        let (_dir, path) = write_config(SAMPLE);
        let params = BuildParams::load_for(&path, Platform::Mac).expect("load");
        assert!(!params.previous_url().contains("//1.4.2"));
    }

    #[test]
    fn diff_package_name_joins_versions() {
        let (_dir, path) = write_config(SAMPLE);
        let params = BuildParams::load_for(&path, Platform::Mac).expect("load");
        assert_eq!(params.diff_package_name(), "1.4.2~1.5.0.zip");
    }

    #[test]
    fn separators_in_versions_are_flattened() {
        let json = r#"{
            "params": [{
                "platform": "linux",
                "previous_version": "1.4/rc",
                "current_version": "1.5\\beta",
                "server_url": "https://packages.example.net",
                "package_name": "app.tar.gz"
            }]
        }"#;
        let (_dir, path) = write_config(json);
        let params = BuildParams::load_for(&path, Platform::Linux).expect("load");
        assert_eq!(params.diff_package_name(), "1.4-rc~1.5-beta.zip");
    }

    #[test]
    fn remote_dir_is_version_then_platform() {
        let (_dir, path) = write_config(SAMPLE);
        let params = BuildParams::load_for(&path, Platform::Mac).expect("load");
        assert_eq!(params.diff_remote_dir(), PathBuf::from("1.5.0/mac"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let (_dir, path) = write_config("{ not json");
        let err = BuildParams::load_for(&path, Platform::Mac).expect_err("must fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = BuildParams::load_for(&dir.path().join("ghost.json"), Platform::Mac)
            .expect_err("must fail");
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
