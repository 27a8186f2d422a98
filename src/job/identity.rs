// src/job/identity.rs

//! Content-identity cache keys.
//!
//! A job's cache file lives at
//! `<output_dir>/<sanitized name>-<md5 hex>.<CACHE_FILE_EXTENSION>`, where the
//! digest covers the job name, its flags (in order) and its sorted recursive
//! dependencies. Jobs that agree on all three share a cache file on purpose.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};

pub const CACHE_FILE_EXTENSION: &str = "jobcache";

/// Number of name characters kept in the cache file name.
const NAME_PREFIX_LEN: usize = 20;

/// Truncate to the first 20 characters, replacing anything that is not an
/// ASCII letter or digit with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .take(NAME_PREFIX_LEN)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Lowercase hex MD5 over name, flags and recursive dependencies, concatenated.
pub fn identity_hash(name: &str, flags: &[String], dependencies: &BTreeSet<String>) -> String {
    let mut hasher = Md5::new();
    hasher.update(name.as_bytes());
    for flag in flags {
        hasher.update(flag.as_bytes());
    }
    for dep in dependencies {
        hasher.update(dep.as_bytes());
    }
    hex::encode(hasher.finalize())
}

pub fn cache_file_path(
    output_dir: &Path,
    name: &str,
    flags: &[String],
    dependencies: &BTreeSet<String>,
) -> PathBuf {
    output_dir.join(format!(
        "{}-{}.{}",
        sanitize_name(name),
        identity_hash(name, flags, dependencies),
        CACHE_FILE_EXTENSION
    ))
}
