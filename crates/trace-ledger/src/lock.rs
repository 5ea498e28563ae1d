//! Single-writer lock for a ledger file.
//!
//! The lock is a sibling file `<ledger>.lock` created with `create_new`, so
//! exactly one process wins. It holds the owner's pid; a lock whose owner is
//! no longer running is reclaimed. The guard removes the file on drop.
//!
//! Reclaiming renames the lock aside before deleting it. Rename is atomic,
//! so of several waiters that saw the same dead owner only one moves that
//! file; any other waiter moves the winner's fresh lock instead, sees a
//! live pid in it and puts it back.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::LedgerError;

const LOCK_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Path of the lock file guarding `ledger_path`.
#[must_use]
pub fn lock_path_for(ledger_path: &Path) -> PathBuf {
    let mut raw = ledger_path.as_os_str().to_owned();
    raw.push(".lock");
    PathBuf::from(raw)
}

/// Held write lock. Released when dropped.
#[derive(Debug)]
pub struct WriteLock {
    path: PathBuf,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

impl WriteLock {
    /// Acquire the write lock for `ledger_path`, waiting up to `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::LockTimeout`] if another live process keeps
    /// the lock past `timeout`, or [`LedgerError::Io`] if the lock
    /// directory cannot be created.
    pub fn acquire(ledger_path: &Path, timeout: Duration) -> Result<Self, LedgerError> {
        let lock_path = lock_path_for(ledger_path);
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| LedgerError::io(parent, e))?;
        }

        let started = Instant::now();
        loop {
            let holder = match try_acquire(&lock_path) {
                Ok(lock) => {
                    tracing::debug!(lock = %lock_path.display(), "write lock acquired");
                    return Ok(lock);
                }
                Err(LockState::Stale(pid)) => {
                    tracing::warn!(
                        lock = %lock_path.display(),
                        pid,
                        "reclaiming stale write lock"
                    );
                    if reclaim_stale(&lock_path, pid) {
                        continue;
                    }
                    None
                }
                Err(LockState::HeldBy(pid)) => Some(pid),
                Err(LockState::Unknown) => None,
            };

            if started.elapsed() >= timeout {
                return Err(LedgerError::LockTimeout {
                    path: lock_path,
                    holder,
                });
            }
            std::thread::sleep(LOCK_RETRY_DELAY.min(timeout));
        }
    }

    /// The lock file this guard owns.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, PartialEq, Eq)]
enum LockState {
    HeldBy(u32),
    Stale(u32),
    Unknown,
}

fn try_acquire(lock_path: &Path) -> Result<WriteLock, LockState> {
    match OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(lock_path)
    {
        Ok(mut file) => {
            let pid = std::process::id();
            let _ = writeln!(file, "{pid}");
            Ok(WriteLock {
                path: lock_path.to_path_buf(),
            })
        }
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            let mut pid_buf = String::new();
            if OpenOptions::new()
                .read(true)
                .open(lock_path)
                .and_then(|mut file| file.read_to_string(&mut pid_buf))
                .is_err()
            {
                return Err(LockState::Unknown);
            }

            match pid_buf.trim().parse::<u32>().ok() {
                Some(pid) if is_process_running(pid) => Err(LockState::HeldBy(pid)),
                Some(pid) => Err(LockState::Stale(pid)),
                // Another writer may be between create and write.
                None => Err(LockState::Unknown),
            }
        }
        Err(_) => Err(LockState::Unknown),
    }
}

/// Remove a lock left by the dead process `stale_pid`.
///
/// Returns `true` when the caller should retry immediately, either because
/// the stale lock is gone or because someone else already moved it.
fn reclaim_stale(lock_path: &Path, stale_pid: u32) -> bool {
    let mut raw = lock_path.as_os_str().to_owned();
    raw.push(format!(".stale-{}", std::process::id()));
    let aside = PathBuf::from(raw);

    match std::fs::rename(lock_path, &aside) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return true,
        Err(_) => return false,
    }

    if read_owner(&aside) == Some(stale_pid) {
        let _ = std::fs::remove_file(&aside);
        return true;
    }

    // Moved a lock some other waiter had just taken; restore it without
    // clobbering a newer one.
    tracing::debug!(lock = %lock_path.display(), "stale lock already reclaimed elsewhere");
    match std::fs::hard_link(&aside, lock_path) {
        Err(_) if !lock_path.exists() => {
            let _ = std::fs::rename(&aside, lock_path);
        }
        _ => {
            let _ = std::fs::remove_file(&aside);
        }
    }
    false
}

fn read_owner(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn is_process_running(pid: u32) -> bool {
    if pid == std::process::id() {
        return true;
    }
    std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}
