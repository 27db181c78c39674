// tests/integration/cli_args.rs

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use relaunch::cli::{CliArgs, LogLevel};
use relaunch::errors::RelaunchError;
use relaunch::exec::Toolchain;
use relaunch::logging::effective_level;
use relaunch::types::{parse_duration, WatcherKind, MAX_DURATION};
use relaunch::check_source_files;

#[test]
fn files_flags_and_trailing_args() {
    let args = CliArgs::try_parse_from([
        "relaunch",
        "api/main.go",
        "worker/main.go",
        "--walk",
        "--delay",
        "2s",
        "--on-reload",
        "make assets",
        "--on-reload",
        "make css",
        "--quiet-rerun",
        "--",
        "-port",
        "8080",
    ])
    .unwrap();

    assert_eq!(
        args.files,
        vec![PathBuf::from("api/main.go"), PathBuf::from("worker/main.go")]
    );
    assert_eq!(args.args, vec!["-port".to_string(), "8080".to_string()]);
    assert_eq!(args.watcher_kind(), Some(WatcherKind::Poll));
    assert_eq!(args.delay, Some(Duration::from_secs(2)));
    assert_eq!(args.on_reload.len(), 2);
    assert!(args.quiet_rerun);
}

#[test]
fn watcher_flag_accepts_aliases() {
    let args = CliArgs::try_parse_from(["relaunch", "--watcher", "notify", "main.go"]).unwrap();
    assert_eq!(args.watcher_kind(), Some(WatcherKind::Signal));

    let args = CliArgs::try_parse_from(["relaunch", "--watcher", "poll", "main.go"]).unwrap();
    assert_eq!(args.watcher_kind(), Some(WatcherKind::Poll));

    let args = CliArgs::try_parse_from(["relaunch", "main.go"]).unwrap();
    assert_eq!(args.watcher_kind(), None);
}

#[test]
fn conflicting_or_malformed_flags_are_rejected() {
    assert!(CliArgs::try_parse_from(["relaunch", "--walk", "--watcher", "signal"]).is_err());
    assert!(CliArgs::try_parse_from(["relaunch", "--watcher", "inotify"]).is_err());
    assert!(CliArgs::try_parse_from(["relaunch", "--delay", "5"]).is_err());
}

#[test]
fn oversized_durations_are_rejected() {
    // Overflows u64 seconds once converted from hours.
    assert!(parse_duration("6000000000000000h").is_err());
    assert!(parse_duration("400000000000000m").is_err());
    assert!(parse_duration("100000000000000s").is_err());
    assert!(parse_duration("99999999999999999999s").is_err());
    assert_eq!(parse_duration("8760h").unwrap(), MAX_DURATION);
    assert!(parse_duration("8761h").is_err());

    assert!(CliArgs::try_parse_from(["relaunch", "--delay", "6000000000000000h"]).is_err());
    assert!(CliArgs::try_parse_from(["relaunch", "--delay", "100000000000000s"]).is_err());
}

#[test]
fn log_level_precedence() {
    assert_eq!(
        effective_level(Some(LogLevel::Debug), Some("error")),
        tracing::Level::DEBUG
    );
    assert_eq!(effective_level(None, Some("warning")), tracing::Level::WARN);
    assert_eq!(effective_level(None, Some("loud")), tracing::Level::INFO);
    assert_eq!(effective_level(None, None), tracing::Level::INFO);
}

#[test]
fn source_files_must_exist_with_the_right_extension() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("api")).unwrap();
    fs::write(tmp.path().join("api/main.go"), "package main\n").unwrap();
    fs::write(tmp.path().join("notes.txt"), "hi\n").unwrap();
    let go = Toolchain::go();

    check_source_files(&[PathBuf::from("api/main.go")], &go, tmp.path()).unwrap();

    let err = check_source_files(&[PathBuf::from("notes.txt")], &go, tmp.path()).unwrap_err();
    assert!(matches!(err, RelaunchError::ConfigError(ref m) if m.contains("not a .go file")));

    let err = check_source_files(&[PathBuf::from("gone/main.go")], &go, tmp.path()).unwrap_err();
    assert!(matches!(err, RelaunchError::ConfigError(ref m) if m.contains("not found")));
}
