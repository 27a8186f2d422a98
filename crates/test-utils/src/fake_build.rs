use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use jobcache::fs::mock::MockFileSystem;
use jobcache::job::{BuildOutput, BuildResult};

/// A fake build callback that:
/// - records the dependency artifacts of every invocation
/// - writes its artifact into a `MockFileSystem`
/// - optionally reports buildtime dependencies, or fails.
#[derive(Clone)]
pub struct FakeBuild {
    fs: MockFileSystem,
    artifact: String,
    buildtime: BTreeSet<String>,
    fail_with: Option<String>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakeBuild {
    pub fn new(fs: &MockFileSystem, artifact: &str) -> Self {
        Self {
            fs: fs.clone(),
            artifact: artifact.to_string(),
            buildtime: BTreeSet::new(),
            fail_with: None,
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_buildtime_dep(mut self, path: &str) -> Self {
        self.buildtime.insert(path.to_string());
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Dependency artifacts passed to each invocation, in call order.
    pub fn seen(&self) -> Vec<Vec<String>> {
        self.seen.lock().unwrap().clone()
    }

    pub fn run(&self, deps: &[String]) -> Result<BuildOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(deps.to_vec());

        if let Some(message) = &self.fail_with {
            return Err(anyhow!(message.clone()));
        }

        self.fs.add_file(&self.artifact, deps.join("\n"));
        if self.buildtime.is_empty() {
            Ok(BuildOutput::Artifact(self.artifact.clone()))
        } else {
            let result = BuildResult::new(&self.fs, self.artifact.clone(), self.buildtime.iter().cloned())?;
            Ok(result.into())
        }
    }

    /// A callback closure over a clone of this fake.
    pub fn callback(&self) -> impl Fn(&[String]) -> Result<BuildOutput> + Send + Sync + 'static {
        let this = self.clone();
        move |deps: &[String]| this.run(deps)
    }

    /// A callback that fails loudly from its second invocation on.
    pub fn once_only(&self) -> impl Fn(&[String]) -> Result<BuildOutput> + Send + Sync + 'static {
        let this = self.clone();
        move |deps: &[String]| {
            if this.calls() >= 1 {
                return Err(anyhow!("build callback for {} invoked twice", this.artifact));
            }
            this.run(deps)
        }
    }
}
