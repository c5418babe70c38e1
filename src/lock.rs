//! In-process advisory locks keyed by path.
//!
//! A [`LockRegistry`] is the single source of truth for which paths are
//! claimed. Construct one where the rest of the application is wired up and
//! hand clones to whoever needs to lock; clones share state. Nothing here
//! takes OS-level locks, so other processes are not excluded.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::debug;

use crate::error::FsError;
use crate::walk::resolve_path;

/// Registry of held locks. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct LockRegistry {
    held:    Arc<RwLock<HashMap<PathBuf, u64>>>,
    next_id: Arc<AtomicU64>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `path` exclusively.
    ///
    /// Creates the file (and missing parent directories) if needed and opens
    /// it read-write without truncating. The check and the registration happen
    /// under one write lock, so of several concurrent callers exactly one
    /// succeeds.
    ///
    /// Paths are keyed by their canonical form: `dir/f`, `dir/x/../f` and a
    /// symlink to `dir/f` all name the same lock.
    ///
    /// # Errors
    ///
    /// [`FsError::AlreadyLocked`] if the path is held through this registry;
    /// an I/O error if the file cannot be created or opened.
    pub fn acquire(&self, path: impl AsRef<Path>) -> Result<FileLock, FsError> {
        let path = path.as_ref();
        let abs = std::path::absolute(path).map_err(|e| FsError::io("resolve", path, e))?;
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::io("create directory", parent, e))?;
        }
        let key = resolve_path(&abs)?;

        let mut held = self.held.write().unwrap_or_else(PoisonError::into_inner);
        if held.contains_key(&key) {
            return Err(FsError::AlreadyLocked(key));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&key)
            .map_err(|e| FsError::io("open", &key, e))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        held.insert(key.clone(), id);
        debug!(path = %key.display(), "lock acquired");

        Ok(FileLock {
            path: key,
            id,
            file: Mutex::new(Some(file)),
            registry: self.clone(),
        })
    }

    /// Whether `path` is currently held through this registry.
    pub fn is_locked(&self, path: impl AsRef<Path>) -> bool {
        let Ok(key) = resolve_path(path.as_ref()) else {
            return false;
        };
        self.held
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&key)
    }

    /// Number of held locks.
    pub fn len(&self) -> usize {
        self.held.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, path: &Path, id: u64) {
        let mut held = self.held.write().unwrap_or_else(PoisonError::into_inner);
        if held.get(path) == Some(&id) {
            held.remove(path);
        }
    }
}

/// An exclusive claim on one path.
///
/// Writes through the same handle are serialized by an internal mutex.
/// Call [`release`](FileLock::release) when done; dropping a held lock
/// releases it as well.
#[derive(Debug)]
pub struct FileLock {
    path:     PathBuf,
    id:       u64,
    file:     Mutex<Option<File>>,
    registry: LockRegistry,
}

impl FileLock {
    /// Canonical path of the locked file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_locked(&self) -> bool {
        self.file.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Replace the file's content with `data` and flush it to disk.
    ///
    /// # Errors
    /// [`FsError::NotLocked`] after release; an I/O error if any step fails.
    pub fn write(&self, data: &[u8]) -> Result<(), FsError> {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let file = guard
            .as_mut()
            .ok_or_else(|| FsError::NotLocked(self.path.clone()))?;

        file.set_len(0).map_err(|e| FsError::io("truncate", &self.path, e))?;
        file.seek(SeekFrom::Start(0)).map_err(|e| FsError::io("seek", &self.path, e))?;
        file.write_all(data).map_err(|e| FsError::io("write", &self.path, e))?;
        file.sync_all().map_err(|e| FsError::io("sync", &self.path, e))
    }

    /// Read the file's whole content through the locked handle.
    pub fn read(&self) -> Result<Vec<u8>, FsError> {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let file = guard
            .as_mut()
            .ok_or_else(|| FsError::NotLocked(self.path.clone()))?;

        file.seek(SeekFrom::Start(0)).map_err(|e| FsError::io("seek", &self.path, e))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(|e| FsError::io("read", &self.path, e))?;
        Ok(buf)
    }

    /// Close the handle and drop the registry entry.
    ///
    /// # Errors
    /// [`FsError::NotLocked`] if already released.
    pub fn release(&self) -> Result<(), FsError> {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let file = guard
            .take()
            .ok_or_else(|| FsError::NotLocked(self.path.clone()))?;
        drop(file);
        self.registry.remove(&self.path, self.id);
        debug!(path = %self.path.display(), "lock released");
        Ok(())
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if self.is_locked() {
            let _ = self.release();
        }
    }
}
