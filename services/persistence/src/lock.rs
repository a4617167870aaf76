//! Exclusive WAL ownership via a lock file
//!
//! The WAL file is owned by exactly one engine process. The lock file sits
//! next to the WAL (`<wal>.lock`), is created with create-new semantics so
//! a second open fails, and carries the holder's pid for diagnostics. The
//! lock is released when dropped.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::wal::WalError;

/// Held lock over a WAL file.
#[derive(Debug)]
pub struct WalLock {
    path: PathBuf,
}

impl WalLock {
    /// Acquire the lock for the given WAL path.
    ///
    /// Fails with [`WalError::Locked`] when another process holds it.
    pub fn acquire(wal_path: &Path) -> Result<Self, WalError> {
        let path = Self::lock_path(wal_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                debug!(path = %path.display(), "WAL lock acquired");
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(WalError::Locked { path })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Lock file path for a WAL path.
    pub fn lock_path(wal_path: &Path) -> PathBuf {
        let mut name = wal_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        wal_path.with_file_name(name)
    }
}

impl Drop for WalLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
