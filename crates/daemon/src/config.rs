//! Daemon configuration and JSON share table loading.
//!
//! The share table is declared in a JSON file and loaded once at startup:
//!
//! ```json
//! {
//!   "bind": "127.0.0.1",
//!   "port": 9440,
//!   "shares": [
//!     { "name": "updates", "root": "/srv/updates" }
//!   ]
//! }
//! ```
//!
//! `bind` and `port` are optional and may be overridden from the command
//! line. The resulting [`DaemonConfig`] is immutable once the daemon
//! starts serving.

use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::DaemonError;

/// Port used when neither the config file nor the command line names one.
pub const DEFAULT_PORT: u16 = 9440;

const DEFAULT_BIND: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// One named share and the local directory it exposes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShareDefinition {
    name: String,
    root: PathBuf,
}

impl ShareDefinition {
    /// Describes a share called `name` rooted at `root`.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    /// Name clients select the share by.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local directory the share serves.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Immutable runtime configuration for one daemon instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DaemonConfig {
    bind_address: IpAddr,
    port: u16,
    shares: Vec<ShareDefinition>,
}

impl DaemonConfig {
    /// Builds a configuration from already validated parts.
    #[must_use]
    pub fn new(bind_address: IpAddr, port: u16, shares: Vec<ShareDefinition>) -> Self {
        Self {
            bind_address,
            port,
            shares,
        }
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::ConfigRead`] or [`DaemonError::ConfigParse`]
    /// when the file cannot be read or decoded, [`DaemonError::InvalidBind`]
    /// for an unparseable `bind` value, [`DaemonError::NoShares`] for an
    /// empty share table, and [`DaemonError::DuplicateShare`] when two
    /// entries claim the same name.
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let text = fs::read_to_string(path).map_err(|source| DaemonError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile =
            serde_json::from_str(&text).map_err(|source| DaemonError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        let bind_address = match file.bind {
            Some(value) => value
                .parse::<IpAddr>()
                .map_err(|_| DaemonError::InvalidBind { value })?,
            None => DEFAULT_BIND,
        };

        if file.shares.is_empty() {
            return Err(DaemonError::NoShares {
                path: path.to_path_buf(),
            });
        }
        let mut shares: Vec<ShareDefinition> = Vec::with_capacity(file.shares.len());
        for entry in file.shares {
            if shares.iter().any(|known| known.name() == entry.name) {
                return Err(DaemonError::DuplicateShare { name: entry.name });
            }
            shares.push(ShareDefinition::new(entry.name, entry.root));
        }

        Ok(Self {
            bind_address,
            port: file.port.unwrap_or(DEFAULT_PORT),
            shares,
        })
    }

    /// Replaces the bind address.
    #[must_use]
    pub const fn with_bind_address(mut self, bind_address: IpAddr) -> Self {
        self.bind_address = bind_address;
        self
    }

    /// Replaces the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Address the listener binds to.
    #[must_use]
    pub const fn bind_address(&self) -> IpAddr {
        self.bind_address
    }

    /// Port the listener binds to.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// The share table.
    #[must_use]
    pub fn shares(&self) -> &[ShareDefinition] {
        &self.shares
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    bind: Option<String>,
    port: Option<u16>,
    shares: Vec<ShareFileEntry>,
}

#[derive(Debug, Deserialize)]
struct ShareFileEntry {
    name: String,
    root: PathBuf,
}
