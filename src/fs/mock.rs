// src/fs/mock.rs

use super::FileSystem;
use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
struct MockEntry {
    contents: Vec<u8>,
    modified: SystemTime,
}

#[derive(Debug, Default)]
struct MockState {
    files: HashMap<PathBuf, MockEntry>,
    /// Logical clock, in seconds since the epoch. Bumped on every write.
    clock: u64,
}

/// In-memory filesystem for tests.
///
/// Every write or touch stamps the file with a strictly increasing logical
/// time, so modification-time ordering is deterministic no matter how
/// coarse the host clock is. Directories are implicit.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut state = self.lock();
        state.clock += 1;
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(state.clock);
        state.files.insert(
            path.as_ref().to_path_buf(),
            MockEntry {
                contents: content.into(),
                modified,
            },
        );
    }

    /// Bump the modification time of an existing file, or create it empty.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let contents = self
            .lock()
            .files
            .get(path.as_ref())
            .map(|e| e.contents.clone())
            .unwrap_or_default();
        self.add_file(path, contents);
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock()
            .files
            .get(path.as_ref())
            .map(|e| e.contents.clone())
    }

    /// Current value of the logical clock.
    pub fn now(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(self.lock().clock)
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("File not found: {:?}", path),
    )
}

impl FileSystem for MockFileSystem {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        match self.lock().files.get(path) {
            Some(entry) => Ok(Box::new(Cursor::new(entry.contents.clone()))),
            None => Err(not_found(path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().files.contains_key(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        match self.lock().files.get(path) {
            Some(entry) => Ok(entry.modified),
            None => Err(not_found(path)),
        }
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        match self.lock().files.remove(path) {
            Some(_) => Ok(()),
            None => Err(not_found(path)),
        }
    }
}
