//! File access used by the extractors and the loader.
//!
//! Every extract / load call takes a `&dyn Storage` instead of touching the
//! file system directly, so the same code runs against real files
//! (`LocalStorage`) or an in-memory map (`MemoryStorage`).

use bytes::Bytes;
use std::{
    collections::HashMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tempfile::Builder;
use tracing::debug;

pub trait Storage: Send + Sync {
    /// Read the whole object at `path`.
    fn read(&self, path: &Path) -> io::Result<Bytes>;

    /// Replace whatever is at `path` with `data`.
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;
}

/// The local file system.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorage;

impl Storage for LocalStorage {
    fn read(&self, path: &Path) -> io::Result<Bytes> {
        let buf = fs::read(path)?;
        debug!(path = %path.display(), bytes = buf.len(), "read file");
        Ok(Bytes::from(buf))
    }

    /// Writes to a temp file next to `path`, then renames it over the target.
    /// The parent directory must already exist.
    ///
    /// The result has the permissions of the file it replaces, or those of
    /// any new file (0666 less the umask) when there was none.
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut builder = Builder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // open(2) applies the umask to this
            builder.permissions(fs::Permissions::from_mode(0o666));
        }
        let mut tmp = builder.tempfile_in(dir)?;
        tmp.write_all(data)?;
        if let Ok(existing) = fs::metadata(path) {
            tmp.as_file().set_permissions(existing.permissions())?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;

        debug!(path = %path.display(), bytes = data.len(), "wrote file");
        Ok(())
    }
}

/// In-memory storage keyed by path.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<PathBuf, Bytes>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `path` with `data`, replacing any previous content.
    pub fn insert(&self, path: impl Into<PathBuf>, data: impl Into<Bytes>) {
        self.lock().insert(path.into(), data.into());
    }

    pub fn get(&self, path: &Path) -> Option<Bytes> {
        self.lock().get(path).cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Bytes>> {
        // a poisoned map is still a valid map
        self.files.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn read(&self, path: &Path) -> io::Result<Bytes> {
        self.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such object: {}", path.display()),
            )
        })
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.insert(path, Bytes::copy_from_slice(data));
        Ok(())
    }
}
