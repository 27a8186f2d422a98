// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::PolicyKind;

/// Build manifest as read from a TOML file.
///
/// ```toml
/// [config]
/// output_dir = ".jobcache"
/// policy = "mtime"
/// parallelism = 4
///
/// [job.gen]
/// cmd = "./gen.sh > build/gen.h"
/// artifact = "build/gen.h"
/// inputs = ["gen.sh"]
///
/// [job.main_o]
/// cmd = "./compile.sh main.c \"$1\" build/main.o"
/// artifact = "build/main.o"
/// after = ["gen"]
/// inputs = ["main.c"]
/// flags = ["-O2"]
/// buildtime_deps_on_stdout = "^dep: (.+)$"
/// ```
///
/// This is the unvalidated form; use [`Manifest`] (via `TryFrom`) elsewhere.
#[derive(Debug, Clone, Deserialize)]
pub struct RawManifest {
    #[serde(default)]
    pub config: ConfigSection,

    /// All jobs from `[job.<name>]`, keyed by job name.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// A validated manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub config: ConfigSection,
    pub job: BTreeMap<String, JobConfig>,
}

impl Manifest {
    /// Construct without validation; only `TryFrom<RawManifest>` should call this.
    pub(crate) fn new_unchecked(config: ConfigSection, job: BTreeMap<String, JobConfig>) -> Self {
        Self { config, job }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Directory holding the cache files, relative to the manifest.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// `"mtime"` (default) or `"always"`.
    #[serde(default)]
    pub policy: PolicyKind,

    /// How many dependencies of one job may build at the same time.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

fn default_output_dir() -> String {
    ".jobcache".to_string()
}

fn default_parallelism() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            policy: PolicyKind::default(),
            parallelism: default_parallelism(),
        }
    }
}

/// `[job.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Shell command producing the artifact. Dependency artifacts are passed
    /// as positional parameters (`$1`, `$2`, ...), jobs from `after` first.
    pub cmd: String,

    /// Path of the file the command produces.
    pub artifact: String,

    /// Jobs this job depends on.
    #[serde(default)]
    pub after: Vec<String>,

    /// Plain file dependencies.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Extra strings folded into the cache identity (e.g. compiler flags).
    #[serde(default)]
    pub flags: Vec<String>,

    /// Regex applied to each stdout line; capture group 1 of a match names a
    /// buildtime dependency (a file read by the command but not declared).
    #[serde(default)]
    pub buildtime_deps_on_stdout: Option<String>,
}
