#![allow(dead_code)]

use std::collections::BTreeMap;
use jobcache::config::{ConfigSection, JobConfig, Manifest, RawManifest};
use jobcache::types::PolicyKind;

/// Builder for `Manifest` to simplify test setup.
pub struct ManifestBuilder {
    manifest: RawManifest,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self {
            manifest: RawManifest {
                config: ConfigSection::default(),
                job: BTreeMap::new(),
            },
        }
    }

    pub fn with_job(mut self, name: &str, job: JobConfig) -> Self {
        self.manifest.job.insert(name.to_string(), job);
        self
    }

    pub fn output_dir(mut self, dir: &str) -> Self {
        self.manifest.config.output_dir = dir.to_string();
        self
    }

    pub fn policy(mut self, policy: PolicyKind) -> Self {
        self.manifest.config.policy = policy;
        self
    }

    pub fn parallelism(mut self, n: usize) -> Self {
        self.manifest.config.parallelism = n;
        self
    }

    pub fn raw(self) -> RawManifest {
        self.manifest
    }

    pub fn build(self) -> Manifest {
        Manifest::try_from(self.manifest).expect("Failed to build valid manifest from builder")
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `JobConfig`.
pub struct JobConfigBuilder {
    job: JobConfig,
}

impl JobConfigBuilder {
    pub fn new(cmd: &str, artifact: &str) -> Self {
        Self {
            job: JobConfig {
                cmd: cmd.to_string(),
                artifact: artifact.to_string(),
                after: vec![],
                inputs: vec![],
                flags: vec![],
                buildtime_deps_on_stdout: None,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.job.after.push(dep.to_string());
        self
    }

    pub fn input(mut self, path: &str) -> Self {
        self.job.inputs.push(path.to_string());
        self
    }

    pub fn flag(mut self, flag: &str) -> Self {
        self.job.flags.push(flag.to_string());
        self
    }

    pub fn buildtime_deps_on_stdout(mut self, pattern: &str) -> Self {
        self.job.buildtime_deps_on_stdout = Some(pattern.to_string());
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}
