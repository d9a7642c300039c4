//! Run-level lock guaranteeing a single pipeline instance.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use ratebridge_fx::{FxError, FxResult};
use tracing::{debug, info, warn};

/// Exclusive lock backed by a file created with `create_new`.
///
/// Acquisition never waits: if the file exists another run holds the lock.
/// The file is removed when the lock is dropped.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Try to take the lock at `path`.
    pub fn acquire(path: impl AsRef<Path>) -> FxResult<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path).unwrap_or_default();
                warn!(path = %path.display(), holder = %holder.trim(), "Run lock already held");
                return Err(FxError::RunLockHeld(path.display().to_string()));
            }
            Err(e) => {
                return Err(FxError::Configuration(format!(
                    "Cannot create lock file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        // Holder details are informational only.
        if let Err(e) = writeln!(file, "pid={} acquired_at={}", std::process::id(), Utc::now()) {
            debug!(error = %e, "Could not write lock holder details");
        }

        info!(path = %path.display(), "Run lock acquired");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "Run lock released"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to release run lock"),
        }
    }
}
