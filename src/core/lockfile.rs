//! Cross-process mutual exclusion via marker files.
//!
//! A `<path>.lock` sibling signals exclusive ownership of `path`. The marker
//! records the owner's pid so a later acquirer can detect a crashed owner,
//! evict the stale marker, and proceed — the system self-heals after a crash
//! mid-write instead of deadlocking until someone deletes the file by hand.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::core::constants::{LOCK_ATTEMPTS, LOCK_BACKOFF_CAP_MS, LOCK_BACKOFF_MS};
use crate::error::{FileError, Result};

/// Exclusive ownership of one path, released on drop.
#[derive(Debug)]
pub struct LockGuard {
    marker: PathBuf,
}

impl LockGuard {
    /// Acquire the lock for `path` with the default attempt budget.
    ///
    /// # Errors
    ///
    /// Returns `FileError::LockTimeout` when the budget is exhausted while
    /// another live process holds the marker, or `FileError::Io` on any
    /// other filesystem failure.
    pub fn acquire(path: &Path) -> Result<Self> {
        Self::acquire_with_budget(path, LOCK_ATTEMPTS)
    }

    /// Acquire with an explicit attempt budget.
    pub fn acquire_with_budget(path: &Path, attempts: u32) -> Result<Self> {
        let marker = marker_path(path);
        let mut rng = rand::thread_rng();

        for attempt in 0..attempts {
            match OpenOptions::new().write(true).create_new(true).open(&marker) {
                Ok(mut file) => {
                    // Marker records the owning pid for liveness checks.
                    file.write_all(std::process::id().to_string().as_bytes())
                        .map_err(|e| FileError::io(&marker, e))?;
                    debug!(marker = %marker.display(), "lock acquired");
                    return Ok(Self { marker });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if reclaim_if_stale(&marker) {
                        // Stale owner evicted: retry immediately.
                        continue;
                    }

                    let backoff = LOCK_BACKOFF_MS * u64::from(attempt + 1)
                        + rng.gen_range(0..LOCK_BACKOFF_MS);
                    let backoff = backoff.min(LOCK_BACKOFF_CAP_MS);
                    debug!(
                        marker = %marker.display(),
                        attempt,
                        backoff_ms = backoff,
                        "lock held, backing off"
                    );
                    thread::sleep(Duration::from_millis(backoff));
                }
                Err(e) => return Err(FileError::io(&marker, e).into()),
            }
        }

        Err(FileError::LockTimeout(path.to_path_buf()).into())
    }

    /// Path of the marker file held by this guard.
    pub fn marker(&self) -> &Path {
        &self.marker
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // The critical section already completed; a failed cleanup only
        // delays the next acquirer until the stale check kicks in.
        if let Err(e) = std::fs::remove_file(&self.marker) {
            debug!(marker = %self.marker.display(), error = %e, "failed to remove lock marker");
        }
    }
}

/// Run `f` while holding the lock for `path`.
///
/// The marker is removed on every exit path, including panics, because the
/// guard releases on drop.
pub fn with_lock<T>(path: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let _guard = LockGuard::acquire(path)?;
    f()
}

fn marker_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".lock");
    PathBuf::from(os)
}

/// Evict the marker if its recorded owner is no longer alive.
///
/// Returns true when the marker was removed (or vanished concurrently) and
/// the caller should retry immediately.
fn reclaim_if_stale(marker: &Path) -> bool {
    let contents = match std::fs::read_to_string(marker) {
        Ok(c) => c,
        // Racing owner released it between our create attempt and the read.
        Err(e) if e.kind() == ErrorKind::NotFound => return true,
        Err(_) => return false,
    };

    let pid: u32 = match contents.trim().parse() {
        Ok(pid) => pid,
        // Unreadable marker: do not guess, let the backoff budget decide.
        Err(_) => return false,
    };

    if process_alive(pid) {
        return false;
    }

    // Re-read right before eviction: another waiter may have reclaimed the
    // dead owner's marker and replaced it with its own in the meantime.
    // Deleting that fresh marker would let two holders into the critical
    // section, so only evict while the content is still the dead pid.
    match std::fs::read_to_string(marker) {
        Ok(now) if now != contents => return false,
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return true,
        Err(_) => return false,
    }

    warn!(marker = %marker.display(), pid, "reclaiming lock from dead process");
    match std::fs::remove_file(marker) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(_) => false,
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    // Reject pids that would go negative as pid_t; kill() gives negative
    // arguments process-group semantics.
    if pid == 0 || pid > i32::MAX as u32 {
        return false;
    }
    // Signal 0 performs the permission/existence check without delivering
    // anything. EPERM means the process exists but is not ours.
    let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    // No cheap liveness check: assume alive and rely on the retry budget.
    true
}
