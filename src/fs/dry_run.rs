// src/fs/dry_run.rs

use std::collections::BTreeSet;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use tracing::debug;

use super::FileSystem;

/// Read-only view of another filesystem, used by `--dry-run`.
///
/// Writes are dropped. Removals are only recorded: the file stays on the
/// inner filesystem but reads as absent through this view, so staleness
/// checks that discard a corrupt cache still see "no cache".
#[derive(Debug)]
pub struct DryRunFileSystem {
    inner: Arc<dyn FileSystem>,
    hidden: Mutex<BTreeSet<PathBuf>>,
}

impl DryRunFileSystem {
    pub fn new(inner: Arc<dyn FileSystem>) -> Self {
        Self {
            inner,
            hidden: Mutex::new(BTreeSet::new()),
        }
    }

    fn hidden(&self) -> MutexGuard<'_, BTreeSet<PathBuf>> {
        self.hidden.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_hidden(&self, path: &Path) -> bool {
        self.hidden().contains(path)
    }
}

fn hidden_error(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("removed in dry run: {:?}", path),
    )
}

impl FileSystem for DryRunFileSystem {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        if self.is_hidden(path) {
            return Err(hidden_error(path));
        }
        self.inner.open_read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        debug!(?path, bytes = contents.len(), "dry run: skipping write");
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        !self.is_hidden(path) && self.inner.exists(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        if self.is_hidden(path) {
            return Err(hidden_error(path));
        }
        self.inner.modified(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        if !self.exists(path) {
            return Err(hidden_error(path));
        }
        debug!(?path, "dry run: skipping delete");
        self.hidden().insert(path.to_path_buf());
        Ok(())
    }
}
