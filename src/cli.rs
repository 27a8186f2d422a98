// src/cli.rs

//! Command-line flags of the `jobcache` binary.

use clap::builder::RangedU64ValueParser;
use clap::{Parser, ValueEnum};

use crate::types::PolicyKind;

/// Command-line arguments for `jobcache`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobcache",
    version,
    about = "Build a job graph, skipping jobs whose cached result is still fresh.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the build manifest (TOML).
    #[arg(long, value_name = "PATH", default_value = "Jobfile.toml")]
    pub manifest: String,

    /// Build only this job (and what it depends on). May be repeated.
    ///
    /// Default: every job no other job depends on.
    #[arg(long = "job", value_name = "NAME")]
    pub jobs: Vec<String>,

    /// Rebuild policy; overrides `[config].policy`.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub policy: Option<PolicyKind>,

    /// Dependencies built in parallel per job; overrides `[config].parallelism`.
    /// Must be at least 1.
    #[arg(
        short = 'j',
        long = "parallelism",
        value_name = "N",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub parallelism: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBCACHE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print each job's cache file and staleness, but
    /// don't run any commands or touch the cache directory.
    #[arg(long)]
    pub dry_run: bool,
}

/// `--log-level` values; each maps onto a `tracing` level filter.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
