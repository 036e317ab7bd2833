//! Blocking HTTP download of release packages.
//!
//! A package URL is fetched into a destination directory under the file
//! name carried by the URL's last path segment. The body is streamed to
//! disk, so download memory stays flat for large packages.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use logging::{InfoFlag, emit_info, info_gte};

/// Error raised while downloading a package.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The URL carries no usable file name in its final path segment.
    #[error("url '{url}' has no file name")]
    NoFileName {
        /// Offending URL.
        url: String,
    },
    /// The destination directory could not be created.
    #[error("cannot create download directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The HTTP request itself failed.
    #[error("request for '{url}' failed: {source}")]
    Request {
        /// Requested URL.
        url: String,
        /// Underlying client error.
        source: reqwest::Error,
    },
    /// The server answered with a non-success status.
    #[error("server answered {status} for '{url}'")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status returned.
        status: reqwest::StatusCode,
    },
    /// Writing the response body to disk failed.
    #[error("cannot write download to {path}: {source}")]
    Write {
        /// Local file being written.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Downloads `url` into `dest_dir`, returning the local file path.
///
/// The destination directory is created when missing. An existing file of
/// the same name is overwritten.
///
/// # Errors
///
/// Fails when the URL carries no file name, the request or transfer fails,
/// or the server answers with a non-success status.
pub fn fetch(url: &str, dest_dir: &Path) -> Result<PathBuf, FetchError> {
    let name = file_name_from_url(url).ok_or_else(|| FetchError::NoFileName {
        url: url.to_owned(),
    })?;
    fs::create_dir_all(dest_dir).map_err(|source| FetchError::CreateDir {
        path: dest_dir.to_path_buf(),
        source,
    })?;

    let mut response = reqwest::blocking::get(url).map_err(|source| FetchError::Request {
        url: url.to_owned(),
        source,
    })?;
    if !response.status().is_success() {
        return Err(FetchError::Status {
            url: url.to_owned(),
            status: response.status(),
        });
    }

    let local_path = dest_dir.join(name);
    let mut file = File::create(&local_path).map_err(|source| FetchError::Write {
        path: local_path.clone(),
        source,
    })?;
    let bytes = io::copy(&mut response, &mut file).map_err(|source| FetchError::Write {
        path: local_path.clone(),
        source,
    })?;

    if info_gte(InfoFlag::Progress, 1) {
        emit_info(
            InfoFlag::Progress,
            1,
            format!("fetched '{url}' ({bytes} bytes)"),
        );
    }
    Ok(local_path)
}

/// Last path segment of `url`, with any query or fragment removed.
fn file_name_from_url(url: &str) -> Option<&str> {
    let stripped = url.split(['?', '#']).next().unwrap_or(url);
    let without_scheme = stripped
        .split_once("://")
        .map_or(stripped, |(_, rest)| rest);
    let (_, name) = without_scheme.rsplit_once('/')?;
    if name.is_empty() { None } else { Some(name) }
}
