// tests/cli_args.rs

use clap::Parser;
use jobcache::cli::CliArgs;
use jobcache::types::PolicyKind;

#[test]
fn zero_parallelism_flag_is_rejected() {
    assert!(CliArgs::try_parse_from(["jobcache", "-j", "0"]).is_err());
    assert!(CliArgs::try_parse_from(["jobcache", "--parallelism", "0"]).is_err());
}

#[test]
fn flags_parse_into_overrides() {
    let args = CliArgs::try_parse_from([
        "jobcache",
        "--manifest",
        "build/Jobfile.toml",
        "-j",
        "4",
        "--policy",
        "always",
        "--job",
        "a",
        "--job",
        "b",
        "--dry-run",
    ])
    .unwrap();

    assert_eq!(args.manifest, "build/Jobfile.toml");
    assert_eq!(args.parallelism, Some(4));
    assert_eq!(args.policy, Some(PolicyKind::Always));
    assert_eq!(args.jobs, vec!["a".to_string(), "b".to_string()]);
    assert!(args.dry_run);
}

#[test]
fn defaults_leave_manifest_config_in_charge() {
    let args = CliArgs::try_parse_from(["jobcache"]).unwrap();
    assert_eq!(args.manifest, "Jobfile.toml");
    assert_eq!(args.parallelism, None);
    assert_eq!(args.policy, None);
    assert!(args.jobs.is_empty());
}
