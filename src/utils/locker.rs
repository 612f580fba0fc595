//! File-based locking to prevent two runs from touching the same destination

use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Advisory lock file for one destination
pub struct DestinationLock {
    lock: RwLock<File>,
    lock_path: PathBuf,
}

impl DestinationLock {
    /// Open (creating if needed) the lock file for `destination` under `lock_dir`
    pub fn open(lock_dir: &Path, destination: &str) -> io::Result<Self> {
        let lock_path = Self::lock_path(lock_dir, destination);

        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        Ok(Self {
            lock: RwLock::new(file),
            lock_path,
        })
    }

    /// Take the exclusive lock without waiting
    ///
    /// Fails if another process (or another handle in this one) holds it.
    /// The lock is released when the guard is dropped.
    pub fn try_acquire(&mut self) -> io::Result<RwLockWriteGuard<'_, File>> {
        debug!("Attempting to acquire lock: {:?}", self.lock_path);
        let guard = self.lock.try_write()?;
        debug!("Acquired destination lock: {:?}", self.lock_path);
        Ok(guard)
    }

    /// Lock file path for a destination label
    fn lock_path(lock_dir: &Path, destination: &str) -> PathBuf {
        let key: String = destination
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        lock_dir.join(format!("bcupper-{}.lock", key.trim_matches('_')))
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}
