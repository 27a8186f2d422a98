// tests/job_caching.rs

use std::error::Error;
use std::sync::Arc;

use jobcache::errors::{CodecError, JobError};
use jobcache::fs::FileSystem;
use jobcache::fs::mock::MockFileSystem;
use jobcache::job::Job;
use jobcache::policy::{AlwaysRebuild, ModificationTime, Policy};
use jobcache_test_utils::fake_build::FakeBuild;
use jobcache_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn job_with_inputs(fs: &MockFileSystem, name: &str, build: &FakeBuild, inputs: &[&str]) -> Arc<Job> {
    Job::builder(name, "cache")
        .depends_on_all(inputs.iter().copied())
        .filesystem(Arc::new(fs.clone()))
        .build_with(build.callback())
}

#[test]
fn unchanged_job_is_not_rebuilt() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src/a.c", "int a;");
    let build = FakeBuild::new(&fs, "out/a.o");
    let job = Job::builder("a", "cache")
        .depends_on("src/a.c")
        .filesystem(Arc::new(fs.clone()))
        .build_with(build.once_only());
    let policy = ModificationTime::new();

    let first = job.build(&policy)?;
    job.clear();
    let second = job.build(&policy)?;

    assert_eq!(first, second);
    assert_eq!(build.calls(), 1);
    assert_eq!(build.seen(), vec![vec!["src/a.c".to_string()]]);
    Ok(())
}

#[test]
fn repeated_build_returns_memoized_outcome() -> TestResult {
    let fs = MockFileSystem::new();
    let build = FakeBuild::new(&fs, "a.o");
    let job = job_with_inputs(&fs, "a", &build, &[]);
    let policy = AlwaysRebuild::new();

    let first = job.build(&policy)?;
    let cache_time = fs.modified(job.cache_file())?;
    let second = job.build(&policy)?;

    assert_eq!(first, second);
    assert_eq!(build.calls(), 1);
    // Memoized: nothing touched the cache file again.
    assert_eq!(fs.modified(job.cache_file())?, cache_time);
    Ok(())
}

#[test]
fn touching_declared_input_forces_rebuild() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src/a.c", "int a;");
    let build = FakeBuild::new(&fs, "a.o");
    let job = job_with_inputs(&fs, "a", &build, &["src/a.c"]);
    let policy = ModificationTime::new();

    job.build(&policy)?;

    job.clear();
    let unchanged = job.build(&policy)?;
    let reference = fs.now();
    assert!(unchanged.timestamp() <= reference);
    assert_eq!(build.calls(), 1);

    fs.touch("src/a.c");
    job.clear();
    let rebuilt = job.build(&policy)?;
    assert!(rebuilt.timestamp() > reference);
    assert_eq!(build.calls(), 2);
    Ok(())
}

#[test]
fn touching_buildtime_dependency_forces_rebuild() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("src/a.c", "#include \"a.h\"");
    fs.add_file("include/a.h", "");
    let build = FakeBuild::new(&fs, "a.o").with_buildtime_dep("include/a.h");
    let job = job_with_inputs(&fs, "a", &build, &["src/a.c"]);
    let policy = ModificationTime::new();

    let first = job.build(&policy)?;
    assert!(first.buildtime_dependencies().contains("include/a.h"));
    assert!(!job.recursive_dependencies().contains("include/a.h"));

    job.clear();
    job.build(&policy)?;
    assert_eq!(build.calls(), 1);

    fs.touch("include/a.h");
    job.clear();
    job.build(&policy)?;
    assert_eq!(build.calls(), 2);
    Ok(())
}

#[test]
fn buildtime_dependencies_propagate_to_dependents() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("gen.h", "");
    let inner_build = FakeBuild::new(&fs, "inner.o").with_buildtime_dep("gen.h");
    let outer_build = FakeBuild::new(&fs, "outer.bin");
    let inner = job_with_inputs(&fs, "inner", &inner_build, &[]);
    let outer = Job::builder("outer", "cache")
        .depends_on(&inner)
        .filesystem(Arc::new(fs.clone()))
        .build_with(outer_build.callback());
    let policy = ModificationTime::new();

    let result = outer.build(&policy)?;
    assert!(result.buildtime_dependencies().contains("gen.h"));
    assert_eq!(outer_build.seen(), vec![vec!["inner.o".to_string()]]);

    outer.clear_recursive();
    outer.build(&policy)?;
    assert_eq!((inner_build.calls(), outer_build.calls()), (1, 1));

    fs.touch("gen.h");
    outer.clear_recursive();
    outer.build(&policy)?;
    assert_eq!((inner_build.calls(), outer_build.calls()), (2, 2));
    Ok(())
}

#[test]
fn stale_parent_reuses_fresh_dependency() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("lib.c", "");
    fs.add_file("main.c", "");
    let lib_build = FakeBuild::new(&fs, "lib.o");
    let main_build = FakeBuild::new(&fs, "main.bin");
    let lib = job_with_inputs(&fs, "lib", &lib_build, &["lib.c"]);
    let main = Job::builder("main", "cache")
        .depends_on(&lib)
        .depends_on("main.c")
        .filesystem(Arc::new(fs.clone()))
        .build_with(main_build.callback());
    let policy = ModificationTime::new();

    main.build(&policy)?;
    fs.touch("main.c");
    main.clear_recursive();
    main.build(&policy)?;

    assert_eq!(lib_build.calls(), 1);
    assert_eq!(main_build.calls(), 2);
    assert_eq!(main_build.seen()[1], vec!["lib.o".to_string(), "main.c".to_string()]);
    Ok(())
}

#[test]
fn missing_input_means_rebuild() -> TestResult {
    let fs = MockFileSystem::new();
    let build = FakeBuild::new(&fs, "a.o");
    let job = job_with_inputs(&fs, "a", &build, &["never/created.c"]);
    let policy = ModificationTime::new();

    job.build(&policy)?;
    job.clear();
    job.build(&policy)?;
    assert_eq!(build.calls(), 2);
    Ok(())
}

#[test]
fn always_rebuild_ignores_cache() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("a.c", "");
    let build = FakeBuild::new(&fs, "a.o");
    let job = job_with_inputs(&fs, "a", &build, &["a.c"]);

    job.build(&ModificationTime::new())?;
    job.clear();
    job.build(&AlwaysRebuild::new())?;
    assert_eq!(build.calls(), 2);
    Ok(())
}

#[test]
fn cached_path_rewrites_cache_file() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("a.c", "");
    let build = FakeBuild::new(&fs, "a.o");
    let job = job_with_inputs(&fs, "a", &build, &["a.c"]);
    let policy = ModificationTime::new();

    job.build(&policy)?;
    let before = fs.modified(job.cache_file())?;
    job.clear();
    let cached = job.build(&policy)?;

    assert_eq!(cached.timestamp(), before);
    assert!(fs.modified(job.cache_file())? > before);
    assert_eq!(build.calls(), 1);
    Ok(())
}

#[test]
fn failure_is_memoized_and_nothing_is_cached() {
    let fs = MockFileSystem::new();
    let build = FakeBuild::new(&fs, "a.o").failing("compiler crashed");
    let job = job_with_inputs(&fs, "a", &build, &[]);
    let policy = AlwaysRebuild::new();

    let first = job.build(&policy).unwrap_err();
    let second = job.build(&policy).unwrap_err();

    assert_eq!(first.to_string(), "compiler crashed");
    assert_eq!(second.to_string(), "compiler crashed");
    assert_eq!(build.calls(), 1);
    assert!(!fs.exists(job.cache_file()));

    job.clear();
    assert!(job.build(&policy).is_err());
    assert_eq!(build.calls(), 2);
}

#[test]
fn dependency_failure_propagates_unchanged() {
    let fs = MockFileSystem::new();
    let inner_build = FakeBuild::new(&fs, "inner.o").failing("syntax error in inner.c");
    let outer_build = FakeBuild::new(&fs, "outer.bin");
    let inner = job_with_inputs(&fs, "inner", &inner_build, &[]);
    let outer = Job::builder("outer", "cache")
        .depends_on(&inner)
        .filesystem(Arc::new(fs.clone()))
        .build_with(outer_build.callback());
    let policy = ModificationTime::new();

    let outer_err = outer.build(&policy).unwrap_err();
    let inner_err = inner.build(&policy).unwrap_err();

    match (&outer_err, &inner_err) {
        (JobError::Build(a), JobError::Build(b)) => assert!(Arc::ptr_eq(a, b)),
        other => panic!("expected shared build errors, got {:?}", other),
    }
    assert_eq!(outer_build.calls(), 0);
    assert!(!fs.exists(outer.cache_file()));
}

#[test]
fn callback_returning_missing_artifact_fails() {
    let fs = MockFileSystem::new();
    let job = Job::builder("ghost", "cache")
        .filesystem(Arc::new(fs.clone()))
        .build_with(|_deps: &[String]| Ok("nowhere.o"));

    let err = job.build(&AlwaysRebuild::new()).unwrap_err();
    assert!(matches!(err, JobError::ArtifactMissing { ref artifact } if artifact == "nowhere.o"));
}

/// Claims everything is fresh, even without a cache file.
#[derive(Debug, Clone)]
struct NeverRebuild;

impl Policy for NeverRebuild {
    fn needs_rebuild(&self, _job: &Job) -> bool {
        false
    }
}

#[test]
fn fresh_verdict_without_cache_is_an_error() {
    let fs = MockFileSystem::new();
    let build = FakeBuild::new(&fs, "a.o");
    let job = job_with_inputs(&fs, "a", &build, &[]);

    let err = job.build(&NeverRebuild).unwrap_err();
    match err {
        JobError::CacheMissing { path } => assert_eq!(path, job.cache_file()),
        other => panic!("expected CacheMissing, got {:?}", other),
    }
    assert_eq!(build.calls(), 0);
}

#[test]
fn unencodable_result_is_a_cloneable_encode_error() {
    let fs = MockFileSystem::new();
    let long = "x".repeat(70_000);
    let build = FakeBuild::new(&fs, &long);
    let job = job_with_inputs(&fs, "huge", &build, &[]);

    let err = job.build(&AlwaysRebuild::new()).unwrap_err();
    match err.clone() {
        JobError::Encode(codec) => {
            assert!(matches!(*codec, CodecError::StringTooLong { len: 70_000 }));
        }
        other => panic!("expected Encode, got {:?}", other),
    }
    assert!(err.to_string().starts_with("cannot encode build result"));
    assert!(!fs.exists(job.cache_file()));
}
