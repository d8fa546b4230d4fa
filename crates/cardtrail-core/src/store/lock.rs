//! Advisory file locks around a document file.
//!
//! Mutating commands hold [`DocumentLock`] for the whole load/modify/save
//! cycle; read-only commands take [`DocumentReadLock`] so they never observe
//! a rename in progress.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::StoreError;

#[derive(Clone, Copy)]
enum LockKind {
    Shared,
    Exclusive,
}

#[derive(Debug)]
struct FileGuard {
    file: File,
    path: PathBuf,
}

impl FileGuard {
    fn acquire(path: &Path, timeout: Duration, kind: LockKind) -> Result<Self, StoreError> {
        let io_err = |source: io::Error| StoreError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let start = Instant::now();
        loop {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(path)
                .map_err(io_err)?;

            let acquired = match kind {
                LockKind::Shared => file.try_lock_shared().is_ok(),
                LockKind::Exclusive => file.try_lock_exclusive().is_ok(),
            };
            if acquired {
                return Ok(Self {
                    file,
                    path: path.to_path_buf(),
                });
            }

            if start.elapsed() >= timeout {
                tracing::warn!(path = %path.display(), "document lock contention");
                return Err(StoreError::LockTimeout {
                    path: path.to_path_buf(),
                    waited: start.elapsed(),
                });
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Exclusive lock held while a document is modified.
#[derive(Debug)]
pub struct DocumentLock {
    guard: FileGuard,
}

impl DocumentLock {
    /// # Errors
    ///
    /// [`StoreError::LockTimeout`] when another process holds the lock for
    /// longer than `timeout`.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, StoreError> {
        Ok(Self {
            guard: FileGuard::acquire(path, timeout, LockKind::Exclusive)?,
        })
    }

    /// Release early. Dropping the guard has the same effect.
    pub fn release(self) {
        drop(self);
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.guard.path
    }
}

/// Shared lock for readers; compatible with other readers only.
#[derive(Debug)]
pub struct DocumentReadLock {
    guard: FileGuard,
}

impl DocumentReadLock {
    /// # Errors
    ///
    /// [`StoreError::LockTimeout`] when a writer holds the lock for longer
    /// than `timeout`.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, StoreError> {
        Ok(Self {
            guard: FileGuard::acquire(path, timeout, LockKind::Shared)?,
        })
    }

    pub fn release(self) {
        drop(self);
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.guard.path
    }
}
