// src/errors.rs

//! Crate-wide error types.
//!
//! - [`JobError`] is what [`Job::build`](crate::job::Job::build) returns. It
//!   is `Clone` so a memoized failure can be handed out again on later calls.
//! - [`CodecError`] covers the binary cache-file encoding.
//! - [`JobcacheError`] is the error of the manifest/driver layer.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum JobError {
    /// The build callback (of this job or of a dependency) failed.
    ///
    /// The original error is kept untouched and shared between every job
    /// that observes it.
    #[error("{0:#}")]
    Build(Arc<anyhow::Error>),

    #[error("artifact does not exist: {artifact}")]
    ArtifactMissing { artifact: String },

    /// The policy said "up to date" but the cache file could not be read.
    #[error("cache file vanished before it could be read: {path:?}")]
    CacheMissing { path: PathBuf },

    #[error("cache I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("cannot encode build result: {0}")]
    Encode(#[source] Arc<CodecError>),
}

impl From<CodecError> for JobError {
    fn from(err: CodecError) -> Self {
        JobError::Encode(Arc::new(err))
    }
}

impl JobError {
    /// Wrap a callback failure.
    pub fn build(err: anyhow::Error) -> Self {
        JobError::Build(Arc::new(err))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        JobError::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// The callback error, if this is a build failure.
    pub fn build_error(&self) -> Option<&anyhow::Error> {
        match self {
            JobError::Build(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors of the length-prefixed binary encoding.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("string of {len} bytes exceeds the 65535-byte limit")]
    StringTooLong { len: usize },

    #[error("{count} buildtime dependencies exceed the 65535-entry limit")]
    TooManyEntries { count: usize },

    #[error("invalid UTF-8 in encoded string")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A complete encoding followed by more bytes.
    #[error("{count} unexpected bytes after the encoded result")]
    TrailingBytes { count: usize },

    /// Includes `UnexpectedEof` for truncated streams.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum JobcacheError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Job not found: {0}")]
    UnknownJob(String),

    #[error("Cycle detected in job graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid regex: {0}")]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, JobcacheError>;
