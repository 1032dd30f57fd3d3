//! Advisory lock on the inventory file.
//!
//! `listen` keeps the inventory in memory and saves it over whatever is on
//! disk, so any edit made to the file while it runs is lost at the next save.
//! The lock is an OS file lock (flock) held by `listen` for its lifetime and
//! by `reset`/`remove` while they rewrite the file.

use anyhow::{Context, Result};
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{self, Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "inventory.lock";

/// Held while the owning process may write the inventory
pub struct StorageLock {
    file: File,
    path: PathBuf,
}

impl Drop for StorageLock {
    fn drop(&mut self) {
        let _ = unlock_file(&self.file);
        let _ = fs::remove_file(&self.path);
    }
}

/// Take the lock for `storage`, failing if another collector process holds it
pub fn acquire(storage: &Path) -> Result<StorageLock> {
    match try_acquire(storage)? {
        Some(lock) => Ok(lock),
        None => anyhow::bail!(
            "inventory {} is in use by another deadcode-collector process \
             (stop `deadcode-collector listen` before modifying it)",
            storage.display()
        ),
    }
}

fn try_acquire(storage: &Path) -> Result<Option<StorageLock>> {
    let dir = lock_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create lock directory: {}", dir.display()))?;

    let path = dir.join(scoped_lock_filename(storage));
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .with_context(|| format!("failed to open lock file: {}", path.display()))?;

    match lock_file_nonblocking(&file) {
        Ok(()) => {
            // Owner info for debugging
            let _ = file.set_len(0);
            let _ = file.seek(SeekFrom::Start(0));
            let _ = writeln!(file, "pid={}", std::process::id());
            let _ = writeln!(file, "storage={}", storage.display());
            let _ = file.flush();

            tracing::debug!(lock = %path.display(), "Inventory lock acquired");
            Ok(Some(StorageLock { file, path }))
        }
        Err(e) if is_lock_busy(&e) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to lock file: {}", path.display())),
    }
}

fn lock_dir() -> PathBuf {
    let mut dir = match std::env::var_os("XDG_RUNTIME_DIR") {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => std::env::temp_dir(),
    };
    dir.push("deadcode");
    dir
}

/// One lock per inventory file, so collectors on different files don't collide
fn scoped_lock_filename(storage: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    storage.to_string_lossy().hash(&mut hasher);
    format!("{LOCK_FILE}.{:016x}", hasher.finish())
}

fn is_lock_busy(error: &io::Error) -> bool {
    matches!(error.kind(), io::ErrorKind::WouldBlock)
        || matches!(error.raw_os_error(), Some(11) | Some(35))
}

#[cfg(unix)]
fn lock_file_nonblocking(file: &File) -> io::Result<()> {
    const LOCK_EX: i32 = 2;
    const LOCK_NB: i32 = 4;
    // SAFETY: flock is called with a valid file descriptor and constant flags.
    let rc = unsafe { flock(file.as_raw_fd(), LOCK_EX | LOCK_NB) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
fn unlock_file(file: &File) -> io::Result<()> {
    const LOCK_UN: i32 = 8;
    // SAFETY: flock is called with a valid file descriptor and constant flags.
    let rc = unsafe { flock(file.as_raw_fd(), LOCK_UN) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
extern "C" {
    fn flock(fd: i32, operation: i32) -> i32;
}

#[cfg(not(unix))]
compile_error!("deadcode-collector inventory locks currently require Unix (macOS/Linux)");
