// src/job/build_result.rs

//! The persisted outcome of a successful build.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::SystemTime;

use crate::errors::JobError;
use crate::fs::FileSystem;

/// An artifact reference plus the extra files that must be staleness-checked.
///
/// `BuildResult` only *refers* to the artifact by path. The engine never
/// moves, deletes or otherwise owns the artifact file; it only checks that it
/// exists when a fresh result is constructed.
///
/// Equality ignores `timestamp`, which is provenance, not content.
#[derive(Debug, Clone)]
pub struct BuildResult {
    artifact: String,
    buildtime_dependencies: BTreeSet<String>,
    timestamp: SystemTime,
}

impl BuildResult {
    /// Construct a fresh result, timestamped now.
    ///
    /// Fails with [`JobError::ArtifactMissing`] if `artifact` does not exist.
    pub fn new<I, S>(
        fs: &dyn FileSystem,
        artifact: impl Into<String>,
        buildtime_dependencies: I,
    ) -> Result<Self, JobError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let artifact = artifact.into();
        if !fs.exists(Path::new(&artifact)) {
            return Err(JobError::ArtifactMissing { artifact });
        }
        Ok(Self::unchecked(
            artifact,
            buildtime_dependencies.into_iter().map(Into::into).collect(),
            SystemTime::now(),
        ))
    }

    /// Shorthand for a result without buildtime dependencies.
    pub fn artifact_only(fs: &dyn FileSystem, artifact: impl Into<String>) -> Result<Self, JobError> {
        Self::new(fs, artifact, std::iter::empty::<String>())
    }

    /// Construct without checking the artifact (used when decoding).
    pub(crate) fn unchecked(
        artifact: String,
        buildtime_dependencies: BTreeSet<String>,
        timestamp: SystemTime,
    ) -> Self {
        Self {
            artifact,
            buildtime_dependencies,
            timestamp,
        }
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn buildtime_dependencies(&self) -> &BTreeSet<String> {
        &self.buildtime_dependencies
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Fold in buildtime dependencies reported by built dependencies.
    pub(crate) fn extend_buildtime_dependencies<'a, I>(&mut self, deps: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        self.buildtime_dependencies.extend(deps.into_iter().cloned());
    }
}

impl PartialEq for BuildResult {
    fn eq(&self, other: &Self) -> bool {
        self.artifact == other.artifact
            && self.buildtime_dependencies == other.buildtime_dependencies
    }
}

impl Eq for BuildResult {}

/// What a build callback hands back.
///
/// A bare artifact path is wrapped into a [`BuildResult`] without buildtime
/// dependencies; a full `BuildResult` carries its own.
#[derive(Debug, Clone)]
pub enum BuildOutput {
    Artifact(String),
    Result(BuildResult),
}

impl From<String> for BuildOutput {
    fn from(artifact: String) -> Self {
        BuildOutput::Artifact(artifact)
    }
}

impl From<&str> for BuildOutput {
    fn from(artifact: &str) -> Self {
        BuildOutput::Artifact(artifact.to_string())
    }
}

impl From<BuildResult> for BuildOutput {
    fn from(result: BuildResult) -> Self {
        BuildOutput::Result(result)
    }
}
