// src/job/mod.rs

//! Cacheable build jobs.
//!
//! - [`Job`] is one node of the build graph: a name, declared dependencies,
//!   a build callback and a cache file derived from its identity hash.
//! - [`build_result`] holds the persisted outcome of a build.
//! - [`codec`] is the (gzip-wrapped) binary cache-file format.
//! - [`identity`] derives cache file names.
//! - [`scheduler`] builds a job's dependencies, sequentially or on a
//!   bounded worker pool.

pub mod build_result;
pub mod codec;
pub mod identity;
pub mod scheduler;

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

pub use build_result::{BuildOutput, BuildResult};
pub use scheduler::BuiltDependency;

use crate::errors::JobError;
use crate::fs::{FileSystem, RealFileSystem};
use crate::policy::Policy;

/// Build callback: receives the artifacts of the built dependencies, in
/// declaration order.
pub type BuildFn = dyn Fn(&[String]) -> anyhow::Result<BuildOutput> + Send + Sync;

/// Outcome of one `build` call; memoized per job instance.
pub type JobOutcome = Result<BuildResult, JobError>;

/// A declared dependency: another job, or a plain file path.
#[derive(Debug, Clone)]
pub enum Dependency {
    Job(Arc<Job>),
    Path(String),
}

impl From<Arc<Job>> for Dependency {
    fn from(job: Arc<Job>) -> Self {
        Dependency::Job(job)
    }
}

impl From<&Arc<Job>> for Dependency {
    fn from(job: &Arc<Job>) -> Self {
        Dependency::Job(Arc::clone(job))
    }
}

impl From<String> for Dependency {
    fn from(path: String) -> Self {
        Dependency::Path(path)
    }
}

impl From<&str> for Dependency {
    fn from(path: &str) -> Self {
        Dependency::Path(path.to_string())
    }
}

/// One node of the build graph.
///
/// The recursive dependency set and the cache file path are fixed at
/// construction, so dependencies must be constructed first.
pub struct Job {
    name: String,
    output_dir: PathBuf,
    dependencies: Vec<Dependency>,
    /// Leaf file paths reachable through `dependencies`; job nodes collapsed.
    recursive_dependencies: BTreeSet<String>,
    cache_file: PathBuf,
    build_fn: Box<BuildFn>,
    fs: Arc<dyn FileSystem>,

    /// Held for the whole of `build`, so a job reached twice through the
    /// parallel scheduler is built once.
    build_lock: Mutex<()>,
    outcome: Mutex<Option<JobOutcome>>,
    /// `Some(None)` records a cache read that found nothing usable.
    cache_read: Mutex<Option<Option<BuildResult>>>,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("cache_file", &self.cache_file)
            .field("dependencies", &self.dependencies.len())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Job {
    pub fn builder(name: impl Into<String>, output_dir: impl Into<PathBuf>) -> JobBuilder {
        JobBuilder {
            name: name.into(),
            output_dir: output_dir.into(),
            dependencies: Vec::new(),
            flags: Vec::new(),
            fs: Arc::new(RealFileSystem),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn recursive_dependencies(&self) -> &BTreeSet<String> {
        &self.recursive_dependencies
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    pub fn filesystem(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Buildtime dependencies of the best result available: this run's
    /// memoized result, else the on-disk cache, else none.
    pub fn recursive_buildtime_dependencies(&self) -> BTreeSet<String> {
        if let Some(result) = self.memoized_result() {
            return result.buildtime_dependencies().clone();
        }
        self.read_cache()
            .map(|result| result.buildtime_dependencies().clone())
            .unwrap_or_default()
    }

    /// Build this job (and, if needed, its dependencies) under `policy`.
    ///
    /// The first call decides and memoizes; later calls hand back the same
    /// outcome until [`clear`](Self::clear) is called.
    pub fn build(&self, policy: &dyn Policy) -> JobOutcome {
        let _guard = lock(&self.build_lock);

        if let Some(outcome) = lock(&self.outcome).clone() {
            return outcome;
        }

        let outcome = self.run_build(policy);
        match &outcome {
            Ok(result) => info!(job = %self.name, artifact = %result.artifact(), "job ready"),
            Err(err) => warn!(job = %self.name, error = %err, "job failed"),
        }

        *lock(&self.outcome) = Some(outcome.clone());
        outcome
    }

    /// Forget this run's outcome and the memoized cache read.
    pub fn clear(&self) {
        *lock(&self.outcome) = None;
        *lock(&self.cache_read) = None;
    }

    /// [`clear`](Self::clear) this job and every job below it.
    pub fn clear_recursive(&self) {
        self.clear();
        for dep in &self.dependencies {
            if let Dependency::Job(job) = dep {
                job.clear_recursive();
            }
        }
    }

    fn memoized_result(&self) -> Option<BuildResult> {
        match lock(&self.outcome).as_ref() {
            Some(Ok(result)) => Some(result.clone()),
            _ => None,
        }
    }

    fn run_build(&self, policy: &dyn Policy) -> JobOutcome {
        let result = if policy.needs_rebuild(self) {
            info!(job = %self.name, "rebuilding");
            self.rebuild(policy)?
        } else {
            debug!(job = %self.name, "up to date; using cached result");
            self.read_cache().ok_or_else(|| JobError::CacheMissing {
                path: self.cache_file.clone(),
            })?
        };

        // Also on the cached path: refreshes the cache file's mtime and
        // re-checks that it encodes.
        self.write_cache(&result)?;
        Ok(result)
    }

    fn rebuild(&self, policy: &dyn Policy) -> JobOutcome {
        let built = scheduler::build_dependencies(&self.dependencies, policy)?;
        let artifacts: Vec<String> = built
            .iter()
            .map(|dep| dep.artifact().to_string())
            .collect();

        let output = (self.build_fn)(&artifacts).map_err(JobError::build)?;
        let mut result = match output {
            BuildOutput::Artifact(artifact) => {
                BuildResult::artifact_only(self.fs.as_ref(), artifact)?
            }
            BuildOutput::Result(result) => {
                if !self.fs.exists(Path::new(result.artifact())) {
                    return Err(JobError::ArtifactMissing {
                        artifact: result.artifact().to_string(),
                    });
                }
                result
            }
        };

        for dep in &built {
            if let BuiltDependency::Job(dep_result) = dep {
                result.extend_buildtime_dependencies(dep_result.buildtime_dependencies());
            }
        }

        Ok(result)
    }

    fn read_cache(&self) -> Option<BuildResult> {
        let mut slot = lock(&self.cache_read);
        if let Some(cached) = slot.as_ref() {
            return cached.clone();
        }
        let loaded = self.load_cache_file();
        *slot = Some(loaded.clone());
        loaded
    }

    fn load_cache_file(&self) -> Option<BuildResult> {
        let path = self.cache_file.as_path();

        let opened = self
            .fs
            .modified(path)
            .and_then(|timestamp| Ok((timestamp, self.fs.open_read(path)?)));
        let (timestamp, reader) = match opened {
            Ok(opened) => opened,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(job = %self.name, cache = ?path, "no cache file");
                return None;
            }
            Err(err) => {
                warn!(job = %self.name, cache = ?path, error = %err, "unreadable cache file; discarding");
                self.discard_cache();
                return None;
            }
        };

        match codec::decode_compressed(reader, timestamp) {
            Ok(result) => {
                debug!(job = %self.name, cache = ?path, "loaded cached result");
                Some(result)
            }
            Err(err) => {
                warn!(job = %self.name, cache = ?path, error = %err, "corrupt cache file; discarding");
                self.discard_cache();
                None
            }
        }
    }

    fn discard_cache(&self) {
        if let Err(err) = self.fs.remove_file(&self.cache_file) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(job = %self.name, cache = ?self.cache_file, error = %err, "failed to delete cache file");
            }
        }
    }

    fn write_cache(&self, result: &BuildResult) -> Result<(), JobError> {
        let bytes = codec::encode_compressed(result)?;
        self.fs
            .write(&self.cache_file, &bytes)
            .map_err(|err| JobError::io(&self.cache_file, err))?;
        debug!(job = %self.name, cache = ?self.cache_file, "wrote cache file");
        Ok(())
    }
}

/// Collects a job's declaration; see [`Job::builder`].
#[derive(Debug)]
pub struct JobBuilder {
    name: String,
    output_dir: PathBuf,
    dependencies: Vec<Dependency>,
    flags: Vec<String>,
    fs: Arc<dyn FileSystem>,
}

impl JobBuilder {
    /// Append a dependency; order is the order the build callback sees.
    pub fn depends_on(mut self, dep: impl Into<Dependency>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    pub fn depends_on_all<I, D>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Dependency>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Add a flag to the identity hash (e.g. a compiler option).
    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    pub fn flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Finish the declaration with its build callback.
    pub fn build_with<F, O>(self, build_fn: F) -> Arc<Job>
    where
        F: Fn(&[String]) -> anyhow::Result<O> + Send + Sync + 'static,
        O: Into<BuildOutput>,
    {
        let mut recursive_dependencies = BTreeSet::new();
        for dep in &self.dependencies {
            match dep {
                Dependency::Path(path) => {
                    recursive_dependencies.insert(path.clone());
                }
                Dependency::Job(job) => {
                    recursive_dependencies.extend(job.recursive_dependencies.iter().cloned());
                }
            }
        }

        let cache_file = identity::cache_file_path(
            &self.output_dir,
            &self.name,
            &self.flags,
            &recursive_dependencies,
        );
        debug!(job = %self.name, cache = ?cache_file, "declared job");

        Arc::new(Job {
            name: self.name,
            output_dir: self.output_dir,
            dependencies: self.dependencies,
            recursive_dependencies,
            cache_file,
            build_fn: Box::new(move |deps: &[String]| build_fn(deps).map(Into::into)),
            fs: self.fs,
            build_lock: Mutex::new(()),
            outcome: Mutex::new(None),
            cache_read: Mutex::new(None),
        })
    }
}
