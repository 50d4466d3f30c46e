use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

/// An exclusive, non-blocking advisory lock on a well-known file, held
/// for the process lifetime. Across N worker processes racing on the
/// same path, exactly one `try_acquire` returns `Some` — the rest are
/// losers and skip scheduling entirely, per §4.H.
pub struct LeaderGuard {
    _file: File,
    path: PathBuf,
}

impl LeaderGuard {
    pub fn try_acquire(lock_path: &Path) -> std::io::Result<Option<Self>> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().read(true).write(true).create(true).open(lock_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { _file: file, path: lock_path.to_path_buf() })),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self._file);
        tracing::debug!(path = %self.path.display(), "leader lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_of_n_concurrent_starters_becomes_leader() {
        use std::sync::{Arc, Barrier};

        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("scheduler.lock");
        const N: usize = 8;
        let barrier = Arc::new(Barrier::new(N));

        let threads: Vec<_> = (0..N)
            .map(|_| {
                let lock_path = lock_path.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    let guard = LeaderGuard::try_acquire(&lock_path).unwrap();
                    let won = guard.is_some();
                    std::thread::sleep(std::time::Duration::from_millis(50));
                    drop(guard);
                    won
                })
            })
            .collect();

        let winners: usize = threads.into_iter().map(|t| t.join().unwrap() as usize).sum();
        assert_eq!(winners, 1);
    }

    #[test]
    fn second_acquisition_while_first_is_held_fails() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("scheduler.lock");

        let first = LeaderGuard::try_acquire(&lock_path).unwrap();
        assert!(first.is_some());
        let second = LeaderGuard::try_acquire(&lock_path).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn lock_is_released_on_drop_allowing_new_leader() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("scheduler.lock");

        {
            let _first = LeaderGuard::try_acquire(&lock_path).unwrap();
        }
        let second = LeaderGuard::try_acquire(&lock_path).unwrap();
        assert!(second.is_some());
    }
}
