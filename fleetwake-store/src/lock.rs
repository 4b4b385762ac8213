//! Single-instance run lock.
//!
//! The lock is a file created with create-new semantics and removed when the
//! guard drops. A lock file older than [`STALE_AFTER`] belongs to a run that
//! died without cleaning up and is taken over.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::error::StoreError;

/// Age after which an existing lock file is considered abandoned.
pub const STALE_AFTER: Duration = Duration::from_secs(15 * 60);

/// Held for the duration of one run.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Takes the lock at `path`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Locked`] if a fresh lock exists, or IO failures.
    pub fn acquire(path: &Path) -> Result<Self, StoreError> {
        Self::acquire_with(path, STALE_AFTER)
    }

    /// Takes the lock, treating locks older than `stale_after` as abandoned.
    ///
    /// # Errors
    ///
    /// [`StoreError::Locked`] if a fresh lock exists, or IO failures.
    pub fn acquire_with(path: &Path, stale_after: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        match Self::create(path) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !is_stale(path, stale_after)? {
                    return Err(StoreError::Locked(path.display().to_string()));
                }
                warn!(path = %path.display(), "Taking over stale run lock");
                match fs::remove_file(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                Self::create(path).map_err(|e| {
                    if e.kind() == ErrorKind::AlreadyExists {
                        StoreError::Locked(path.display().to_string())
                    } else {
                        e.into()
                    }
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn create(path: &Path) -> std::io::Result<Self> {
        Self::create_with(path, |file| writeln!(file, "{}", std::process::id()))
    }

    /// Creates the lock file and fills it with `write_owner`.
    ///
    /// The guard exists before the write, so a failed write drops it and
    /// removes the file again.
    fn create_with(
        path: &Path,
        write_owner: impl FnOnce(&mut File) -> std::io::Result<()>,
    ) -> std::io::Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let lock = Self {
            path: path.to_path_buf(),
        };
        write_owner(&mut file)?;
        debug!(path = %path.display(), "Run lock acquired");
        Ok(lock)
    }

    /// Lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove run lock");
        } else {
            debug!(path = %self.path.display(), "Run lock released");
        }
    }
}

fn is_stale(path: &Path, stale_after: Duration) -> Result<bool, StoreError> {
    let modified = match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => modified,
        // Removed between our create attempt and now.
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e.into()),
    };
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    Ok(age >= stale_after)
}
