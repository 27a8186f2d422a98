// tests/cli_build.rs
#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use filetime::{FileTime, set_file_mtime};
use jobcache::cli::CliArgs;
use jobcache::types::PolicyKind;

type TestResult = Result<(), Box<dyn Error>>;

const MANIFEST: &str = r#"
[config]
output_dir = "cache"
parallelism = 2

[job.gen]
cmd = "echo gen >> runs.log; cp gen.txt gen.h"
artifact = "gen.h"
inputs = ["gen.txt"]

[job.main]
cmd = "echo main >> runs.log; cat \"$1\" \"$2\" > main.o; echo \"dep: extra.h\""
artifact = "main.o"
after = ["gen"]
inputs = ["main.c"]
buildtime_deps_on_stdout = "^dep: (.+)$"
"#;

fn args(manifest: &Path) -> CliArgs {
    CliArgs {
        manifest: manifest.to_string_lossy().into_owned(),
        jobs: Vec::new(),
        policy: None,
        parallelism: None,
        log_level: None,
        dry_run: false,
    }
}

fn runs(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("runs.log"))
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}

fn project() -> Result<tempfile::TempDir, Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("Jobfile.toml"), MANIFEST)?;
    fs::write(dir.path().join("gen.txt"), "#define X 1\n")?;
    fs::write(dir.path().join("main.c"), "int main;\n")?;
    fs::write(dir.path().join("extra.h"), "")?;
    for file in ["gen.txt", "main.c", "extra.h"] {
        let past = SystemTime::now() - Duration::from_secs(3600);
        set_file_mtime(dir.path().join(file), FileTime::from_system_time(past))?;
    }
    Ok(dir)
}

#[test]
fn second_run_is_a_cache_hit() -> TestResult {
    let dir = project()?;
    let manifest = dir.path().join("Jobfile.toml");

    jobcache::run(args(&manifest))?;
    assert_eq!(runs(dir.path()), vec!["gen", "main"]);
    assert_eq!(
        fs::read_to_string(dir.path().join("main.o"))?,
        "#define X 1\nint main;\n"
    );

    jobcache::run(args(&manifest))?;
    assert_eq!(runs(dir.path()).len(), 2);
    Ok(())
}

#[test]
fn stdout_reported_dependency_triggers_rebuild() -> TestResult {
    let dir = project()?;
    let manifest = dir.path().join("Jobfile.toml");
    jobcache::run(args(&manifest))?;

    let future = SystemTime::now() + Duration::from_secs(60);
    set_file_mtime(dir.path().join("extra.h"), FileTime::from_system_time(future))?;
    jobcache::run(args(&manifest))?;

    // Only `main` read extra.h.
    assert_eq!(runs(dir.path()), vec!["gen", "main", "main"]);
    Ok(())
}

#[test]
fn always_policy_reruns_everything() -> TestResult {
    let dir = project()?;
    let manifest = dir.path().join("Jobfile.toml");
    jobcache::run(args(&manifest))?;

    let mut always = args(&manifest);
    always.policy = Some(PolicyKind::Always);
    always.parallelism = Some(1);
    jobcache::run(always)?;

    assert_eq!(runs(dir.path()).len(), 4);
    Ok(())
}

#[test]
fn dry_run_runs_no_commands() -> TestResult {
    let dir = project()?;
    let mut dry = args(&dir.path().join("Jobfile.toml"));
    dry.dry_run = true;

    jobcache::run(dry)?;
    assert!(runs(dir.path()).is_empty());
    assert!(!dir.path().join("cache").exists());
    Ok(())
}

#[test]
fn dry_run_leaves_corrupt_cache_files_alone() -> TestResult {
    let dir = project()?;
    let manifest = dir.path().join("Jobfile.toml");
    jobcache::run(args(&manifest))?;

    let mut cache_files = Vec::new();
    for entry in fs::read_dir(dir.path().join("cache"))? {
        let path = entry?.path();
        fs::write(&path, "garbage")?;
        cache_files.push(path);
    }
    assert_eq!(cache_files.len(), 2);

    let mut dry = args(&manifest);
    dry.dry_run = true;
    jobcache::run(dry)?;

    for path in &cache_files {
        assert_eq!(fs::read_to_string(path)?, "garbage");
    }
    assert_eq!(runs(dir.path()).len(), 2);
    Ok(())
}

#[test]
fn selected_job_builds_only_its_subgraph() -> TestResult {
    let dir = project()?;
    let mut only_gen = args(&dir.path().join("Jobfile.toml"));
    only_gen.jobs = vec!["gen".to_string()];

    jobcache::run(only_gen)?;
    assert_eq!(runs(dir.path()), vec!["gen"]);
    Ok(())
}

#[test]
fn unknown_job_is_rejected() -> TestResult {
    let dir = project()?;
    let mut bogus = args(&dir.path().join("Jobfile.toml"));
    bogus.jobs = vec!["nope".to_string()];

    let err = jobcache::run(bogus).unwrap_err();
    assert!(err.to_string().contains("nope"));
    Ok(())
}

#[test]
fn failing_command_reports_exit_code() -> TestResult {
    let dir = tempfile::tempdir()?;
    let manifest = dir.path().join("Jobfile.toml");
    fs::write(
        &manifest,
        r#"
        [job.broken]
        cmd = "exit 3"
        artifact = "never.o"
        "#,
    )?;

    let err = jobcache::run(args(&manifest)).unwrap_err();
    assert!(format!("{err:#}").contains("exited with code 3"), "got {err:#}");
    assert!(!dir.path().join(".jobcache").exists());
    Ok(())
}
