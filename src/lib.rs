// src/lib.rs

//! Incremental build jobs with an on-disk result cache.
//!
//! A [`Job`](job::Job) wraps one unit of build output. Building it under a
//! [`Policy`](policy::Policy) either reuses the cached result (when nothing
//! it depends on changed) or builds its dependencies, possibly in parallel,
//! and then runs its build callback.

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod graph;
pub mod job;
pub mod logging;
pub mod policy;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::Manifest;
use crate::errors::JobcacheError;
use crate::fs::{DryRunFileSystem, FileSystem, RealFileSystem};
use crate::graph::JobGraph;
use crate::policy::Policy;

/// High-level entry point used by `main.rs`.
///
/// Loads the manifest, constructs the job graph, picks the policy and builds
/// the requested jobs (or all root jobs), printing one line per built job.
pub fn run(args: CliArgs) -> Result<()> {
    let manifest_path = PathBuf::from(&args.manifest);
    let manifest = load_and_validate(&manifest_path)?;
    let root = manifest_root_dir(&manifest_path);

    // A dry run must leave the cache directory untouched, even when a
    // staleness check finds a corrupt cache file.
    let fs: Arc<dyn FileSystem> = if args.dry_run {
        Arc::new(DryRunFileSystem::new(Arc::new(RealFileSystem)))
    } else {
        Arc::new(RealFileSystem)
    };
    let graph = JobGraph::from_manifest(&manifest, &root, fs)?;
    let policy = select_policy(&manifest, &args);
    let targets = targets(&graph, &args.jobs)?;
    info!(?targets, parallelism = policy.parallelism(), "selected jobs to build");

    if args.dry_run {
        print_dry_run(&graph, policy.as_ref());
        return Ok(());
    }

    for name in &targets {
        let job = graph
            .job(name)
            .ok_or_else(|| JobcacheError::UnknownJob(name.clone()))?;
        let result = job.build(policy.as_ref()).map_err(JobcacheError::from)?;
        println!("{name}: {}", result.artifact());
    }

    Ok(())
}

/// CLI flags win over `[config]`.
fn select_policy(manifest: &Manifest, args: &CliArgs) -> Box<dyn Policy> {
    let kind = args.policy.unwrap_or(manifest.config.policy);
    let parallelism = args.parallelism.unwrap_or(manifest.config.parallelism);
    policy::from_kind(kind, parallelism)
}

fn targets(graph: &JobGraph, requested: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(graph.roots().to_vec());
    }
    for name in requested {
        if graph.job(name).is_none() {
            return Err(JobcacheError::UnknownJob(name.clone()).into());
        }
    }
    Ok(requested.to_vec())
}

/// Figure out the directory relative paths in the manifest refer to.
///
/// - If the manifest path has a non-empty parent (e.g. "build/Jobfile.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Jobfile.toml" (parent = ""),
///   we fall back to the current working directory "."
fn manifest_root_dir(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print every job, its cache file and whether the policy would rebuild it.
fn print_dry_run(graph: &JobGraph, policy: &dyn Policy) {
    println!("jobcache dry-run");
    println!("  output_dir = {}", graph.output_dir().display());
    println!("  parallelism = {}", policy.parallelism());
    println!();

    for (name, job) in graph.jobs() {
        let state = if policy.needs_rebuild(job) {
            "stale"
        } else {
            "fresh"
        };
        println!("  - {name} [{state}]");
        println!("      cache: {}", job.cache_file().display());
        for dep in job.recursive_dependencies() {
            println!("      input: {dep}");
        }
        for dep in job.recursive_buildtime_dependencies() {
            println!("      buildtime: {dep}");
        }
    }

    debug!("dry-run complete (no commands run)");
}
