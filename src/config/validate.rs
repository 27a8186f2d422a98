// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use regex::Regex;

use crate::config::model::{Manifest, RawManifest};
use crate::errors::{JobcacheError, Result};

impl TryFrom<RawManifest> for Manifest {
    type Error = JobcacheError;

    fn try_from(raw: RawManifest) -> std::result::Result<Self, Self::Error> {
        validate_raw_manifest(&raw)?;
        Ok(Manifest::new_unchecked(raw.config, raw.job))
    }
}

fn validate_raw_manifest(manifest: &RawManifest) -> Result<()> {
    ensure_has_jobs(manifest)?;
    validate_global_config(manifest)?;
    validate_job_dependencies(manifest)?;
    validate_patterns(manifest)?;
    topological_order_raw(manifest)?;
    Ok(())
}

fn ensure_has_jobs(manifest: &RawManifest) -> Result<()> {
    if manifest.job.is_empty() {
        return Err(JobcacheError::ConfigError(
            "manifest must contain at least one [job.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(manifest: &RawManifest) -> Result<()> {
    if manifest.config.parallelism == 0 {
        return Err(JobcacheError::ConfigError(
            "[config].parallelism must be >= 1 (got 0)".to_string(),
        ));
    }
    if manifest.config.output_dir.trim().is_empty() {
        return Err(JobcacheError::ConfigError(
            "[config].output_dir must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_job_dependencies(manifest: &RawManifest) -> Result<()> {
    for (name, job) in manifest.job.iter() {
        for dep in job.after.iter() {
            if !manifest.job.contains_key(dep) {
                return Err(JobcacheError::ConfigError(format!(
                    "job '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(JobcacheError::ConfigError(format!(
                    "job '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_patterns(manifest: &RawManifest) -> Result<()> {
    for (name, job) in manifest.job.iter() {
        if let Some(pattern) = &job.buildtime_deps_on_stdout {
            let re = Regex::new(pattern)?;
            if re.captures_len() < 2 {
                return Err(JobcacheError::ConfigError(format!(
                    "job '{}': buildtime_deps_on_stdout needs a capture group",
                    name
                )));
            }
        }
    }
    Ok(())
}

/// Job names ordered so that every job comes after all jobs in its `after`.
pub fn topological_order(manifest: &Manifest) -> Result<Vec<String>> {
    order_jobs(manifest.job.iter().map(|(name, job)| (name.as_str(), &job.after)))
}

fn topological_order_raw(manifest: &RawManifest) -> Result<Vec<String>> {
    order_jobs(manifest.job.iter().map(|(name, job)| (name.as_str(), &job.after)))
}

fn order_jobs<'a, I>(jobs: I) -> Result<Vec<String>>
where
    I: Iterator<Item = (&'a str, &'a Vec<String>)>,
{
    // Edge direction: dep -> job
    // For:
    //   [job.B]
    //   after = ["A"]
    // we add edge A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for (name, after) in jobs {
        graph.add_node(name);
        for dep in after {
            graph.add_edge(dep.as_str(), name, ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(JobcacheError::DagCycle(format!(
                "cycle detected in job graph involving job '{}'",
                node
            )))
        }
    }
}
