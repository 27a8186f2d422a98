use std::str::FromStr;

use clap::ValueEnum;
use serde::Deserialize;

/// Which rebuild policy to use.
///
/// - `Mtime`: rebuild when the cache file is missing or older than an input
///   (default behaviour).
/// - `Always`: ignore the cache and rebuild everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Mtime,
    Always,
}

impl Default for PolicyKind {
    fn default() -> Self {
        PolicyKind::Mtime
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mtime" => Ok(PolicyKind::Mtime),
            "always" => Ok(PolicyKind::Always),
            other => Err(format!(
                "invalid policy: {other} (expected \"mtime\" or \"always\")"
            )),
        }
    }
}
