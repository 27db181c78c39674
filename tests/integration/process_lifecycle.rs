// tests/integration/process_lifecycle.rs

use std::path::Path;
use std::time::Duration;

use relaunch::errors::RelaunchError;
use relaunch::exec::hooks::run_reload_commands;
use relaunch::exec::{ChildHandle, Lifecycle, ProcessLifecycle, Toolchain};
use relaunch::fs::RealFileSystem;
use relaunch::types::Platform;

use crate::common::{init_tracing, wait_until, ProjectBuilder, TempProject};

/// Writes an executable named after the project directory that prints its
/// first argument and then sleeps.
const BUILD_SCRIPT: &str = r#"app="$(basename "$PWD")"; printf '#!/bin/sh\necho "hello from $1"\nexec sleep 30\n' > "$app" && chmod +x "$app""#;

fn toolchain(script: &str) -> Toolchain {
    Toolchain {
        build: vec!["sh".into(), "-c".into(), script.into()],
        ..Toolchain::go()
    }
}

fn prepared(builder: ProjectBuilder, tc: &Toolchain) -> TempProject {
    let mut tp = builder.main("app/main.go").build_on_disk();
    tp.project
        .prepare(tc, &RealFileSystem, &tp.root, Platform::current())
        .unwrap();
    tp
}

#[tokio::test]
async fn build_failure_carries_the_diagnostics() {
    init_tracing();
    let tc = toolchain("echo 'main.go:3:2: undefined: handler' >&2; exit 2");
    let tp = prepared(ProjectBuilder::new().name("api"), &tc);

    let err = ProcessLifecycle::new(tc).build(&tp.project).await.unwrap_err();

    match err {
        RelaunchError::BuildFailed { project, message } => {
            assert_eq!(project, "api");
            assert!(message.contains("undefined: handler"), "{message}");
        }
        other => panic!("expected BuildFailed, got {other:?}"),
    }
    assert!(tp.err.contents().contains("undefined: handler"));
}

#[tokio::test]
async fn missing_build_program_is_a_build_failure() {
    let tc = Toolchain {
        build: vec!["relaunch-no-such-compiler".into()],
        ..Toolchain::go()
    };
    let tp = prepared(ProjectBuilder::new(), &tc);

    let err = ProcessLifecycle::new(tc).build(&tp.project).await.unwrap_err();
    assert!(matches!(err, RelaunchError::BuildFailed { .. }), "{err:?}");
}

#[tokio::test]
async fn built_program_runs_with_arguments_and_is_killed() {
    init_tracing();
    let tc = toolchain(BUILD_SCRIPT);
    let tp = prepared(ProjectBuilder::new().arg("relaunch"), &tc);
    assert_eq!(tp.project.app_name(), "app");
    let lifecycle = ProcessLifecycle::new(tc);

    lifecycle.build(&tp.project).await.unwrap();
    assert!(tp.path("app/app").is_file());

    let mut child = lifecycle.run(&tp.project, false).await.unwrap();
    assert!(child.id().is_some());
    let out = tp.out.clone();
    assert!(
        wait_until(Duration::from_secs(5), || out.contents().contains("hello from relaunch")).await
    );

    lifecycle
        .kill(Some(child.as_mut()), tp.project.app_name())
        .await
        .unwrap();
    assert!(child.has_exited().unwrap());

    // Killing again is a no-op.
    lifecycle
        .kill(Some(child.as_mut()), tp.project.app_name())
        .await
        .unwrap();
}

#[tokio::test]
async fn quiet_run_discards_stdout() {
    let tc = toolchain(BUILD_SCRIPT);
    let tp = prepared(ProjectBuilder::new(), &tc);
    let lifecycle = ProcessLifecycle::new(tc);

    lifecycle.build(&tp.project).await.unwrap();
    let mut child = lifecycle.run(&tp.project, true).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(tp.out.contents().is_empty());

    lifecycle
        .kill(Some(child.as_mut()), tp.project.app_name())
        .await
        .unwrap();
}

#[tokio::test]
async fn running_without_a_build_fails() {
    let tc = toolchain("true");
    let tp = prepared(ProjectBuilder::new(), &tc);

    let err = ProcessLifecycle::new(tc).run(&tp.project, false).await.unwrap_err();
    assert!(matches!(err, RelaunchError::RunFailed { .. }), "{err:?}");
}

#[tokio::test]
async fn reload_commands_see_the_changed_file() {
    let tc = toolchain("true");
    let tp = prepared(
        ProjectBuilder::new()
            .on_reload_command("echo \"changed: $RELAUNCH_CHANGED_PATH\"")
            .on_reload_command("pwd"),
        &tc,
    );

    run_reload_commands(&tp.project, Path::new("/src/handlers.go"))
        .await
        .unwrap();

    let lines = tp.out.lines();
    assert_eq!(lines[0], "changed: /src/handlers.go");
    assert_eq!(Path::new(&lines[1]), tp.path("app"));
}

#[tokio::test]
async fn failing_reload_command_stops_the_chain() {
    let tc = toolchain("true");
    let tp = prepared(
        ProjectBuilder::new()
            .on_reload_command("exit 3")
            .on_reload_command("echo unreachable"),
        &tc,
    );

    let err = run_reload_commands(&tp.project, Path::new("main.go"))
        .await
        .unwrap_err();

    assert!(matches!(err, RelaunchError::HookFailed(_)), "{err:?}");
    assert!(!tp.out.contents().contains("unreachable"));
}
