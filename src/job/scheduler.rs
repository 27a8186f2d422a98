// src/job/scheduler.rs

//! Dependency scheduler.
//!
//! Builds the declared dependencies of a job and returns them in declaration
//! order. With a policy parallelism of 1, or at most one dependency, this is
//! a plain loop. Otherwise job dependencies go through a bounded pool of
//! worker threads:
//!
//! - the coordinator pushes `(index, job)` pairs onto a work queue and drops
//!   path dependencies straight into their output slot;
//! - each worker takes pairs until the queue is closed and drained, and
//!   pushes `(index, outcome)` onto a result queue sized to hold every result,
//!   so a worker never blocks on send;
//! - the coordinator drains exactly as many results as it dispatched, filling
//!   slots by index. The first failure sets the cancel flag, closes the work
//!   queue and is returned as-is, without waiting for the workers. They
//!   finish what they are building, start nothing new, and their late
//!   results are dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use anyhow::anyhow;
use crossbeam_channel::{self as channel, Receiver, Sender};
use tracing::{debug, warn};

use crate::errors::JobError;
use crate::job::{BuildResult, Dependency, Job, JobOutcome};
use crate::policy::{Policy, PolicyClone};

/// A dependency after building: a job's result, or a path passed through.
#[derive(Debug, Clone)]
pub enum BuiltDependency {
    Job(BuildResult),
    Path(String),
}

impl BuiltDependency {
    /// The value handed to the build callback.
    pub fn artifact(&self) -> &str {
        match self {
            BuiltDependency::Job(result) => result.artifact(),
            BuiltDependency::Path(path) => path,
        }
    }
}

/// Build `deps` under `policy`, preserving declaration order.
pub fn build_dependencies(
    deps: &[Dependency],
    policy: &dyn Policy,
) -> Result<Vec<BuiltDependency>, JobError> {
    let workers = policy.parallelism();
    if workers <= 1 || deps.len() <= 1 {
        build_sequential(deps, policy)
    } else {
        build_parallel(deps, policy, workers)
    }
}

fn build_one(dep: &Dependency, policy: &dyn Policy) -> Result<BuiltDependency, JobError> {
    match dep {
        Dependency::Job(job) => job.build(policy).map(BuiltDependency::Job),
        Dependency::Path(path) => Ok(BuiltDependency::Path(path.clone())),
    }
}

fn build_sequential(
    deps: &[Dependency],
    policy: &dyn Policy,
) -> Result<Vec<BuiltDependency>, JobError> {
    deps.iter().map(|dep| build_one(dep, policy)).collect()
}

fn worker_loop(
    work_rx: Receiver<(usize, Arc<Job>)>,
    result_tx: Sender<(usize, JobOutcome)>,
    policy: Arc<dyn Policy>,
    cancelled: Arc<AtomicBool>,
) {
    for (index, job) in work_rx.iter() {
        if cancelled.load(Ordering::Acquire) {
            break;
        }
        let outcome = job.build(policy.as_ref());
        if result_tx.send((index, outcome)).is_err() {
            break;
        }
    }
}

fn spawn_workers(
    count: usize,
    work_rx: &Receiver<(usize, Arc<Job>)>,
    result_tx: &Sender<(usize, JobOutcome)>,
    policy: &dyn Policy,
    cancelled: &Arc<AtomicBool>,
) -> Result<Vec<JoinHandle<()>>, JobError> {
    (0..count)
        .map(|n| {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let policy = policy.clone_policy();
            let cancelled = Arc::clone(cancelled);
            thread::Builder::new()
                .name(format!("jobcache-worker-{n}"))
                .spawn(move || worker_loop(work_rx, result_tx, policy, cancelled))
                .map_err(|err| JobError::build(anyhow!(err).context("spawning dependency worker")))
        })
        .collect()
}

fn build_parallel(
    deps: &[Dependency],
    policy: &dyn Policy,
    workers: usize,
) -> Result<Vec<BuiltDependency>, JobError> {
    let job_count = deps
        .iter()
        .filter(|dep| matches!(dep, Dependency::Job(_)))
        .count();
    let workers = workers.min(job_count);

    let mut slots: Vec<Option<BuiltDependency>> = (0..deps.len()).map(|_| None).collect();
    let cancelled = Arc::new(AtomicBool::new(false));

    let (work_tx, work_rx) = channel::unbounded::<(usize, Arc<Job>)>();
    let (result_tx, result_rx) = channel::bounded::<(usize, JobOutcome)>(deps.len());

    let spawned = spawn_workers(workers, &work_rx, &result_tx, policy, &cancelled);
    // Only workers hold these now; a closed result queue means they all exited.
    drop(work_rx);
    drop(result_tx);
    let handles = spawned?;

    let mut pending = 0usize;
    for (index, dep) in deps.iter().enumerate() {
        match dep {
            Dependency::Job(job) => {
                if work_tx.send((index, Arc::clone(job))).is_ok() {
                    pending += 1;
                }
            }
            Dependency::Path(path) => slots[index] = Some(BuiltDependency::Path(path.clone())),
        }
    }
    debug!(workers, pending, "dispatched dependencies to worker pool");

    if let Err(err) = collect_results(&result_rx, pending, &mut slots) {
        // Workers are left to wind down on their own.
        cancelled.store(true, Ordering::Release);
        return Err(err);
    }
    drop(work_tx);
    for handle in handles {
        if handle.join().is_err() {
            warn!("dependency worker panicked after reporting");
        }
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.ok_or_else(|| {
                JobError::build(anyhow!("dependency was never scheduled on the worker pool"))
            })
        })
        .collect()
}

fn collect_results(
    result_rx: &Receiver<(usize, JobOutcome)>,
    pending: usize,
    slots: &mut [Option<BuiltDependency>],
) -> Result<(), JobError> {
    for _ in 0..pending {
        let (index, outcome) = result_rx.recv().map_err(|_| {
            JobError::build(anyhow!("dependency workers exited before reporting"))
        })?;
        slots[index] = Some(BuiltDependency::Job(outcome?));
    }
    Ok(())
}
