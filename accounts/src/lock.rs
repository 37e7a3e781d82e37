//! Advisory locking around reads and writes of the account databases.
//!
//! Two levels of locking are used. [`DatabaseLock`] is held on a separate
//! lock file (`/etc/.pwd.lock` by default) for the whole of a
//! read-modify-write cycle, so two `wonka` processes never lose each
//! other's updates. Individual reads and writes additionally lock the
//! target file itself, the convention `flock(2)` based tools use.

use crate::error::{AccountsError, AccountsResult};
use std::fs::{File, OpenOptions, TryLockError};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive lock over all account databases, released on drop.
#[derive(Debug)]
pub struct DatabaseLock {
    file: File,
    path: PathBuf,
}

impl DatabaseLock {
    /// Take the lock on `path`, creating the file if needed and retrying
    /// until `wait` has passed.
    pub fn acquire(path: &Path, wait: Duration) -> AccountsResult<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o600)
            .open(path)
            .map_err(|e| AccountsError::io(path, e))?;

        let deadline = Instant::now() + wait;
        loop {
            match file.try_lock() {
                Ok(()) => break,
                Err(TryLockError::WouldBlock) if Instant::now() < deadline => {
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(TryLockError::WouldBlock) => {
                    return Err(AccountsError::Lock {
                        path: path.to_path_buf(),
                        source: io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("still held by another process after {:?}", wait),
                        ),
                    });
                }
                Err(TryLockError::Error(e)) => {
                    return Err(AccountsError::Lock {
                        path: path.to_path_buf(),
                        source: e,
                    });
                }
            }
        }

        debug!("Acquired database lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DatabaseLock {
    fn drop(&mut self) {
        release(&self.file, &self.path);
        debug!("Released database lock {}", self.path.display());
    }
}

/// Replace the contents of `path` while holding an exclusive lock.
///
/// A missing file is created with `default_mode`; an existing file keeps its
/// permissions because it is opened in place rather than replaced.
pub fn write_with_lock(path: &Path, data: &[u8], default_mode: u32) -> AccountsResult<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .mode(default_mode)
        .open(path)
        .map_err(|e| AccountsError::io(path, e))?;

    file.lock().map_err(|e| AccountsError::Lock {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("Acquired exclusive lock on {}", path.display());

    // Truncation must happen under the lock, never at open time.
    let result = file
        .set_len(0)
        .and_then(|_| file.write_all(data))
        .and_then(|_| file.sync_all())
        .map_err(|e| AccountsError::io(path, e));

    release(&file, path);
    result
}

/// Read the whole of `path` while holding a shared lock.
pub fn read_with_lock(path: &Path) -> AccountsResult<String> {
    let mut file = File::open(path).map_err(|e| AccountsError::io(path, e))?;

    file.lock_shared().map_err(|e| AccountsError::Lock {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut contents = String::new();
    let result = file
        .read_to_string(&mut contents)
        .map(|_| contents)
        .map_err(|e| AccountsError::io(path, e));

    release(&file, path);
    result
}

fn release(file: &File, path: &Path) {
    // The lock is dropped with the descriptor regardless.
    if let Err(e) = file.unlock() {
        warn!("Unable to unlock {}: {}", path.display(), e);
    }
}
