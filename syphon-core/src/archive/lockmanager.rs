//! Advisory `#lock` sentinel files.
//!
//! A lock file tells cooperating tools not to remove the contents of the
//! directory holding it. It does not exclude other writers.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::error::Result;

pub const LOCK_FILENAME: &str = "#lock";

#[derive(Debug, Default)]
pub struct LockManager {
    locks: Vec<PathBuf>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock files currently held, in acquisition order.
    pub fn locks(&self) -> &[PathBuf] {
        &self.locks
    }

    /// Touch `<dir>/#lock` and track it. Locking a directory twice tracks it once.
    pub fn lock(&mut self, dir: &Path) -> Result<PathBuf> {
        let path = std::path::absolute(dir)?.join(LOCK_FILENAME);
        let f = OpenOptions::new().create(true).append(true).open(&path)?;
        f.set_modified(SystemTime::now())?;
        if !self.locks.contains(&path) {
            debug!(lock = %path.display(), "acquired lock");
            self.locks.push(path.clone());
        }
        Ok(path)
    }

    /// Remove a tracked lock file. Untracked paths are left alone.
    pub fn release(&mut self, path: &Path) -> Result<()> {
        let path = std::path::absolute(path)?;
        if let Some(i) = self.locks.iter().position(|p| *p == path) {
            self.locks.remove(i);
            remove_lock(&path)?;
        }
        Ok(())
    }

    /// Remove every tracked lock, newest first.
    pub fn release_all(&mut self) -> Result<()> {
        while let Some(path) = self.locks.pop() {
            remove_lock(&path)?;
        }
        Ok(())
    }
}

impl Drop for LockManager {
    fn drop(&mut self) {
        if let Err(e) = self.release_all() {
            warn!(error = %e, "failed to release lock files");
        }
    }
}

fn remove_lock(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(lock = %path.display(), "released lock");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_creates_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = LockManager::new();
        let p = m.lock(dir.path()).unwrap();
        assert!(p.exists());
        assert_eq!(p.file_name().unwrap(), LOCK_FILENAME);
        assert_eq!(m.locks(), [p.clone()]);
        m.release(&p).unwrap();
        assert!(!p.exists());
        assert!(m.locks().is_empty());
    }

    #[test]
    fn lock_is_idempotent_per_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = LockManager::new();
        let a = m.lock(dir.path()).unwrap();
        let b = m.lock(dir.path()).unwrap();
        assert_eq!(a, b);
        assert_eq!(m.locks().len(), 1);
    }

    #[test]
    fn release_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = LockManager::new();
        let p = m.lock(dir.path()).unwrap();
        fs::remove_file(&p).unwrap();
        m.release(&p).unwrap();
        m.release(&p).unwrap();
    }

    #[test]
    fn release_all_clears_everything() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let mut m = LockManager::new();
        let pa = m.lock(a.path()).unwrap();
        let pb = m.lock(b.path()).unwrap();
        fs::remove_file(&pa).unwrap();
        m.release_all().unwrap();
        assert!(!pb.exists());
        assert!(m.locks().is_empty());
    }

    #[test]
    fn drop_releases_locks() {
        let dir = tempfile::tempdir().unwrap();
        let p = {
            let mut m = LockManager::new();
            m.lock(dir.path()).unwrap()
        };
        assert!(!p.exists());
    }
}
