use std::{
    fmt,
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::errors::StoreError;

/// Advisory lock flavour taken on the lock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Many readers at once, no writer.
    Shared,
    /// One holder, reader or writer.
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Shared => f.write_str("shared"),
            LockMode::Exclusive => f.write_str("exclusive"),
        }
    }
}

/// Bounded retry budget for non-blocking lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self { max_attempts: 10, retry_delay: Duration::from_millis(100) }
    }
}

/// Scoped OS file lock. The lock is released when the guard is dropped,
/// on every exit path including panics unwinding through the holder.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl FileLock {
    /// Try to take `mode` on `path`, sleeping `retry_delay` between attempts.
    ///
    /// The lock file is created if missing and never truncated, so its inode
    /// stays stable for every process that shares it.
    pub fn acquire(path: &Path, mode: LockMode, settings: &LockSettings) -> Result<Self, StoreError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| StoreError::io(path, e))?;

        let attempts = settings.max_attempts.max(1);
        for attempt in 1..=attempts {
            match try_lock(&file, mode) {
                Ok(()) => {
                    debug!(path = %path.display(), %mode, attempt, "lock acquired");
                    return Ok(Self { file, path: path.to_path_buf(), mode });
                }
                Err(e) if is_contended(&e) => {
                    if attempt < attempts {
                        debug!(path = %path.display(), %mode, attempt, "lock busy, retrying");
                        thread::sleep(settings.retry_delay);
                    }
                }
                Err(e) => return Err(StoreError::io(path, e)),
            }
        }

        warn!(path = %path.display(), %mode, attempts, "lock acquisition exhausted");
        Err(StoreError::LockTimeout { path: path.to_path_buf(), mode, attempts })
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}

// Called through the trait path: newer std versions add inherent `File`
// methods with the same names but different signatures.
fn try_lock(file: &File, mode: LockMode) -> std::io::Result<()> {
    match mode {
        LockMode::Shared => FileExt::try_lock_shared(file),
        LockMode::Exclusive => FileExt::try_lock_exclusive(file),
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    if err.kind() == std::io::ErrorKind::WouldBlock {
        return true;
    }
    match (err.raw_os_error(), fs2::lock_contended_error().raw_os_error()) {
        (Some(got), Some(contended)) => got == contended,
        _ => false,
    }
}
