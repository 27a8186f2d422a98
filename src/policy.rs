// src/policy.rs

//! Rebuild policies.
//!
//! A policy answers one question for a [`Job`]: does it need rebuilding? It
//! also carries the dependency parallelism the job scheduler should use.

use std::fmt::Debug;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::job::Job;
use crate::types::PolicyKind;

pub trait Policy: PolicyClone + Send + Sync + Debug {
    fn needs_rebuild(&self, job: &Job) -> bool;

    /// Maximum number of dependencies built concurrently. Always >= 1.
    fn parallelism(&self) -> usize {
        1
    }
}

/// Owned copy of a policy, handed to worker threads that may outlive the
/// build call that started them. Implemented for every `Clone` policy.
pub trait PolicyClone {
    fn clone_policy(&self) -> Arc<dyn Policy>;
}

impl<T> PolicyClone for T
where
    T: Policy + Clone + 'static,
{
    fn clone_policy(&self) -> Arc<dyn Policy> {
        Arc::new(self.clone())
    }
}

/// Rebuild every job, every time.
#[derive(Debug, Clone, Copy)]
pub struct AlwaysRebuild {
    parallelism: usize,
}

impl AlwaysRebuild {
    pub fn new() -> Self {
        Self { parallelism: 1 }
    }

    /// `parallelism` is clamped to at least 1.
    pub fn with_parallelism(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }
}

impl Default for AlwaysRebuild {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for AlwaysRebuild {
    fn needs_rebuild(&self, _job: &Job) -> bool {
        true
    }

    fn parallelism(&self) -> usize {
        self.parallelism
    }
}

/// Rebuild when the cache file is missing, or when any recursive or
/// buildtime dependency is missing or strictly newer than the cache file.
#[derive(Debug, Clone, Copy)]
pub struct ModificationTime {
    parallelism: usize,
}

impl ModificationTime {
    pub fn new() -> Self {
        Self { parallelism: 1 }
    }

    /// `parallelism` is clamped to at least 1.
    pub fn with_parallelism(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }
}

impl Default for ModificationTime {
    fn default() -> Self {
        Self::new()
    }
}

fn modified(job: &Job, path: &Path) -> io::Result<SystemTime> {
    job.filesystem().modified(path)
}

impl Policy for ModificationTime {
    fn needs_rebuild(&self, job: &Job) -> bool {
        // Buildtime dependencies first: reading them may find the cache file
        // corrupt and delete it, which must count as "no cache".
        let buildtime = job.recursive_buildtime_dependencies();

        let cache_time = match modified(job, job.cache_file()) {
            Ok(t) => t,
            Err(_) => {
                debug!(job = %job.name(), "no cache file; rebuild required");
                return true;
            }
        };

        let deps = job.recursive_dependencies().iter().chain(buildtime.iter());

        for dep in deps {
            match modified(job, Path::new(dep)) {
                Ok(t) if t > cache_time => {
                    debug!(job = %job.name(), dependency = %dep, "dependency newer than cache");
                    return true;
                }
                Ok(_) => {}
                Err(_) => {
                    debug!(job = %job.name(), dependency = %dep, "dependency missing");
                    return true;
                }
            }
        }

        false
    }

    fn parallelism(&self) -> usize {
        self.parallelism
    }
}

/// Build the policy selected on the command line or in the manifest.
pub fn from_kind(kind: PolicyKind, parallelism: usize) -> Box<dyn Policy> {
    match kind {
        PolicyKind::Always => Box::new(AlwaysRebuild::with_parallelism(parallelism)),
        PolicyKind::Mtime => Box::new(ModificationTime::with_parallelism(parallelism)),
    }
}
