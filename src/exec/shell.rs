// src/exec/shell.rs

//! Shell-command build callback.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::{debug, info};

use crate::config::JobConfig;
use crate::fs::FileSystem;
use crate::job::{BuildOutput, BuildResult};

/// Environment variable holding the (resolved) artifact path.
pub const ARTIFACT_ENV: &str = "JOBCACHE_ARTIFACT";

/// Resolve `path` against `root` unless it is absolute.
pub fn resolve(root: &Path, path: &str) -> String {
    let p = Path::new(path);
    if p.is_absolute() {
        path.to_string()
    } else {
        root.join(p).to_string_lossy().into_owned()
    }
}

/// A manifest job's command, ready to be used as a build callback.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    job: String,
    cmd: String,
    root: PathBuf,
    artifact: String,
    deps_pattern: Option<Regex>,
    fs: Arc<dyn FileSystem>,
}

impl ShellCommand {
    pub fn from_config(
        job: &str,
        cfg: &JobConfig,
        root: &Path,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let deps_pattern = cfg
            .buildtime_deps_on_stdout
            .as_deref()
            .map(Regex::new)
            .transpose()
            .with_context(|| format!("compiling buildtime_deps_on_stdout for job '{}'", job))?;

        Ok(Self {
            job: job.to_string(),
            cmd: cfg.cmd.clone(),
            root: root.to_path_buf(),
            artifact: resolve(root, &cfg.artifact),
            deps_pattern,
            fs,
        })
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    fn command(&self, deps: &[String]) -> Command {
        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd).args(deps);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd).arg(&self.job).args(deps);
            c
        };
        cmd.current_dir(&self.root)
            .env(ARTIFACT_ENV, &self.artifact)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Run the command with the dependency artifacts as positional arguments.
    pub fn run(&self, deps: &[String]) -> Result<BuildOutput> {
        info!(job = %self.job, cmd = %self.cmd, "starting build command");

        let output = self
            .command(deps)
            .output()
            .with_context(|| format!("spawning process for job '{}'", self.job))?;

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(job = %self.job, "stderr: {}", line);
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            bail!("command for job '{}' exited with code {}", self.job, code);
        }

        let mut buildtime = BTreeSet::new();
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(job = %self.job, "stdout: {}", line);
            let Some(re) = &self.deps_pattern else {
                continue;
            };
            if let Some(dep) = re.captures(line).and_then(|caps| caps.get(1)) {
                buildtime.insert(resolve(&self.root, dep.as_str().trim()));
            }
        }

        let result = BuildResult::new(self.fs.as_ref(), self.artifact.clone(), buildtime)?;
        Ok(result.into())
    }
}
