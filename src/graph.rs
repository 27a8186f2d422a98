// src/graph.rs

//! Turn a validated [`Manifest`] into a graph of [`Job`]s.
//!
//! Jobs hash their recursive dependencies at construction, so they are
//! constructed bottom-up in topological order.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::{Manifest, topological_order};
use crate::errors::{JobcacheError, Result};
use crate::exec::ShellCommand;
use crate::exec::shell::resolve;
use crate::fs::FileSystem;
use crate::job::{Dependency, Job};

#[derive(Debug)]
pub struct JobGraph {
    jobs: BTreeMap<String, Arc<Job>>,
    roots: Vec<String>,
    output_dir: PathBuf,
}

impl JobGraph {
    /// Construct every job of `manifest`, resolving relative paths against
    /// `root` and running commands there.
    pub fn from_manifest(manifest: &Manifest, root: &Path, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let output_dir = PathBuf::from(resolve(root, &manifest.config.output_dir));
        let mut jobs: BTreeMap<String, Arc<Job>> = BTreeMap::new();

        for name in topological_order(manifest)? {
            let cfg = manifest
                .job
                .get(&name)
                .ok_or_else(|| JobcacheError::UnknownJob(name.clone()))?;

            let mut deps: Vec<Dependency> = Vec::with_capacity(cfg.after.len() + cfg.inputs.len());
            for dep in &cfg.after {
                let job = jobs
                    .get(dep)
                    .ok_or_else(|| JobcacheError::UnknownJob(dep.clone()))?;
                deps.push(Dependency::Job(Arc::clone(job)));
            }
            deps.extend(cfg.inputs.iter().map(|input| Dependency::Path(resolve(root, input))));

            let command = ShellCommand::from_config(&name, cfg, root, Arc::clone(&fs))?;
            let job = Job::builder(name.clone(), output_dir.clone())
                .depends_on_all(deps)
                .flags(cfg.flags.iter().cloned())
                .filesystem(Arc::clone(&fs))
                .build_with(move |deps: &[String]| command.run(deps));

            debug!(job = %name, cache = ?job.cache_file(), "constructed job");
            jobs.insert(name, job);
        }

        let depended_on: BTreeSet<&str> = manifest
            .job
            .values()
            .flat_map(|cfg| cfg.after.iter().map(String::as_str))
            .collect();
        let roots = jobs
            .keys()
            .filter(|name| !depended_on.contains(name.as_str()))
            .cloned()
            .collect();

        Ok(Self {
            jobs,
            roots,
            output_dir,
        })
    }

    pub fn job(&self, name: &str) -> Option<&Arc<Job>> {
        self.jobs.get(name)
    }

    /// Jobs that no other job depends on, in name order.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn jobs(&self) -> impl Iterator<Item = (&str, &Arc<Job>)> {
        self.jobs.iter().map(|(name, job)| (name.as_str(), job))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}
