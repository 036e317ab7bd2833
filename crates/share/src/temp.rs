//! Private staging files with unique random suffixes.
//!
//! Cross-boundary transfers never write destination paths directly. The
//! payload lands in a uniquely named staging file first and reaches its
//! final name through a rename, so interrupted transfers leave no
//! half-written destination behind. The guard removes the staging file on
//! every path that is not an explicit [`StagedFile::persist`].

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

const SUFFIX_LEN: usize = 6;
const RAND_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const MAX_CREATE_ATTEMPTS: u32 = 100;

/// Produces a fresh random alphanumeric suffix.
pub(crate) fn random_suffix() -> String {
    let mut bytes = [0_u8; SUFFIX_LEN];
    getrandom::fill(&mut bytes).expect("getrandom failed");
    bytes
        .iter()
        .map(|&b| RAND_CHARS[(b as usize) % RAND_CHARS.len()] as char)
        .collect()
}

/// RAII guard over a staging file created next to its destination.
///
/// Dropping the guard deletes the staging file unless
/// [`persist`](StagedFile::persist) moved it into place first.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    armed: bool,
}

impl StagedFile {
    /// Creates a staging file in the same directory as `dest`.
    ///
    /// The name is `.<dest-name>.<suffix>` with a random suffix; creation
    /// uses `O_EXCL` semantics and retries on collision.
    pub fn create_for(dest: &Path) -> io::Result<(File, Self)> {
        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        let name = dest
            .file_name()
            .map_or_else(|| "staging".to_owned(), |n| n.to_string_lossy().into_owned());
        let stem = name.strip_prefix('.').unwrap_or(&name);
        Self::create_in(dir, stem)
    }

    /// Creates a staging file named `.<stem>.<suffix>` inside `dir`.
    pub fn create_in(dir: &Path, stem: &str) -> io::Result<(File, Self)> {
        for _ in 0..MAX_CREATE_ATTEMPTS {
            let candidate = dir.join(format!(".{stem}.{}", random_suffix()));
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
            {
                Ok(file) => {
                    return Ok((
                        file,
                        Self {
                            path: candidate,
                            armed: true,
                        },
                    ));
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
                Err(err) => return Err(err),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no unique staging name for '{stem}' in {}", dir.display()),
        ))
    }

    /// Wraps an already chosen path so it is removed on drop.
    pub(crate) const fn adopt(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    /// Path of the staging file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Moves the staging file to `dest`, replacing any existing file.
    pub fn persist(mut self, dest: &Path) -> io::Result<()> {
        if dest.exists() {
            fs::remove_file(dest)?;
        }
        fs::rename(&self.path, dest)?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.armed {
            // Never created, already renamed away, or truly stuck: all
            // equally unrecoverable from a drop, so errors are ignored.
            let _ = fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn staging_file_lands_next_to_destination() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("package.zip");

        let (_file, staged) = StagedFile::create_for(&dest).expect("create staging");
        assert_eq!(staged.path().parent(), dest.parent());
        let name = staged
            .path()
            .file_name()
            .expect("name")
            .to_string_lossy()
            .into_owned();
        assert!(name.starts_with(".package.zip."), "got: {name}");
    }

    #[test]
    fn dropping_an_armed_guard_removes_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("out.bin");
        let staged_path;
        {
            let (_file, staged) = StagedFile::create_for(&dest).expect("create staging");
            staged_path = staged.path().to_path_buf();
            assert!(staged_path.exists());
        }
        assert!(!staged_path.exists());
    }

    #[test]
    fn persist_replaces_an_existing_destination() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("out.bin");
        fs::write(&dest, "old contents").expect("write old");

        let (mut file, staged) = StagedFile::create_for(&dest).expect("create staging");
        file.write_all(b"new contents").expect("write new");
        drop(file);
        let staged_path = staged.path().to_path_buf();
        staged.persist(&dest).expect("persist");

        assert!(!staged_path.exists());
        assert_eq!(fs::read(&dest).expect("read dest"), b"new contents");
    }

    #[test]
    fn concurrent_guards_get_distinct_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("out.bin");

        let (_f1, s1) = StagedFile::create_for(&dest).expect("first");
        let (_f2, s2) = StagedFile::create_for(&dest).expect("second");
        assert_ne!(s1.path(), s2.path());
    }

    #[test]
    fn suffix_is_alphanumeric() {
        for _ in 0..50 {
            let suffix = random_suffix();
            assert_eq!(suffix.len(), SUFFIX_LEN);
            assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}
