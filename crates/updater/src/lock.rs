use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

/// A held advisory lock on one container's update-in-progress marker file.
/// Dropping this releases the lock; the file itself is left behind (its
/// presence is not the signal, the OS-level advisory lock is).
pub struct ContainerLock {
    _file: File,
    path: PathBuf,
}

impl ContainerLock {
    /// Attempts a non-blocking exclusive lock on `<lock_dir>/<container_id>.lock`.
    /// `None` means another update is already in progress for this container.
    pub fn try_acquire(lock_dir: &Path, container_id: &str) -> std::io::Result<Option<Self>> {
        std::fs::create_dir_all(lock_dir)?;
        let path = lock_dir.join(format!("{container_id}.lock"));
        let file = OpenOptions::new().read(true).write(true).create(true).open(&path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { _file: file, path })),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Drop for ContainerLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self._file);
        let _ = std::fs::remove_file(&self.path);
    }
}
