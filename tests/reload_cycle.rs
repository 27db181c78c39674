// tests/reload_cycle.rs

mod common;
use crate::common::{
    init_tracing, mock_supervisor, spawn_run, with_timeout, FakeLifecycle, LifecycleCall,
    ManualDetector, ProjectBuilder,
};

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;

use relaunch::fs::mock::MockFileSystem;
use relaunch::project::{Project, ReloadHook};

fn api_project() -> ProjectBuilder {
    ProjectBuilder::new().name("api").file("handlers.go", "package main\n")
}

fn recording_hook(log: &Arc<Mutex<Vec<String>>>, label: &'static str) -> ReloadHook {
    let log = Arc::clone(log);
    Arc::new(move |_project: &Project, path: &Path| -> anyhow::Result<()> {
        log.lock().unwrap().push(format!("{label} {}", path.display()));
        Ok(())
    })
}

#[tokio::test(start_paused = true)]
async fn burst_of_changes_triggers_a_single_reload() {
    init_tracing();
    let fs = MockFileSystem::new();
    let lifecycle = FakeLifecycle::new();
    let (project, _err) = api_project()
        .reload_interval(Duration::from_secs(2))
        .build_in(&fs, Path::new("/work/api"));
    let mut sup = mock_supervisor(&fs, &lifecycle);
    sup.add(project).unwrap();
    let stop = sup.stop_handle();

    let (detector, trigger) = ManualDetector::new();
    let run = spawn_run(sup, detector);
    trigger.running().await;
    assert_eq!(lifecycle.builds(), 1);
    assert_eq!(lifecycle.runs(), 1);

    trigger.change("/work/api/main.go");
    sleep(Duration::from_millis(100)).await;
    trigger.change("/work/api/handlers.go");
    sleep(Duration::from_millis(500)).await;

    assert_eq!(lifecycle.kills(), 1);
    assert_eq!(lifecycle.builds(), 2);
    assert_eq!(lifecycle.runs(), 2);

    stop.stop();
    let (_sup, result) = with_timeout(run).await.unwrap();
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn change_after_the_interval_reloads_again() {
    let fs = MockFileSystem::new();
    let lifecycle = FakeLifecycle::new();
    let (project, _err) = api_project().build_in(&fs, Path::new("/work/api"));
    let mut sup = mock_supervisor(&fs, &lifecycle);
    sup.add(project).unwrap();
    let stop = sup.stop_handle();

    let (detector, trigger) = ManualDetector::new();
    let run = spawn_run(sup, detector);
    trigger.running().await;

    trigger.change("/work/api/main.go");
    sleep(Duration::from_millis(2500)).await;
    trigger.change("/work/api/main.go");
    sleep(Duration::from_millis(100)).await;

    assert_eq!(lifecycle.runs(), 3);

    stop.stop();
    let (_sup, result) = with_timeout(run).await.unwrap();
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failed_build_reports_once_and_keeps_previous_handle() {
    let fs = MockFileSystem::new();
    let lifecycle = FakeLifecycle::new();
    let (project, err) = api_project().build_in(&fs, Path::new("/work/api"));
    let mut sup = mock_supervisor(&fs, &lifecycle);
    let slot = sup.add(project).unwrap();
    let stop = sup.stop_handle();

    let (detector, trigger) = ManualDetector::new();
    let run = spawn_run(sup, detector);
    trigger.running().await;

    lifecycle.fail_next_build("undefined: foo");
    trigger.change("/work/api/main.go");
    sleep(Duration::from_millis(200)).await;

    let reports = err.lines();
    let failures: Vec<_> = reports
        .iter()
        .filter(|l| l.contains("undefined: foo"))
        .collect();
    assert_eq!(failures.len(), 1, "reports: {reports:?}");
    assert!(failures[0].starts_with("[api] "));
    assert_eq!(lifecycle.runs(), 1);

    {
        let cycle = slot.lock_cycle().await;
        assert!(cycle.child.is_some());
        assert_eq!(cycle.runs, 1);
    }

    // The next change past the interval rebuilds normally.
    sleep(Duration::from_secs(2)).await;
    trigger.change("/work/api/main.go");
    sleep(Duration::from_millis(200)).await;
    assert_eq!(lifecycle.runs(), 2);

    stop.stop();
    let (_sup, result) = with_timeout(run).await.unwrap();
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failed_run_is_reported_to_the_project() {
    let fs = MockFileSystem::new();
    let lifecycle = FakeLifecycle::new();
    let (project, err) = api_project().build_in(&fs, Path::new("/work/api"));
    let mut sup = mock_supervisor(&fs, &lifecycle);
    sup.add(project).unwrap();
    let stop = sup.stop_handle();

    let (detector, trigger) = ManualDetector::new();
    let run = spawn_run(sup, detector);
    trigger.running().await;

    lifecycle.fail_next_run("permission denied");
    trigger.change("/work/api/main.go");
    sleep(Duration::from_millis(200)).await;

    assert_eq!(
        err.lines()
            .iter()
            .filter(|l| l.contains("permission denied"))
            .count(),
        1
    );

    stop.stop();
    let (_sup, result) = with_timeout(run).await.unwrap();
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn irrelevant_files_do_not_reload() {
    let fs = MockFileSystem::new();
    let lifecycle = FakeLifecycle::new();
    let (project, _err) = api_project().build_in(&fs, Path::new("/work/api"));
    let mut sup = mock_supervisor(&fs, &lifecycle);
    sup.add(project).unwrap();
    let stop = sup.stop_handle();

    let (detector, trigger) = ManualDetector::new();
    let run = spawn_run(sup, detector);
    trigger.running().await;

    trigger.change("/work/api/README.md");
    trigger.change("/work/other/main.go");
    sleep(Duration::from_millis(200)).await;

    assert_eq!(lifecycle.builds(), 1);

    stop.stop();
    let (_sup, result) = with_timeout(run).await.unwrap();
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn only_the_changed_project_reloads() {
    let fs = MockFileSystem::new();
    let lifecycle = FakeLifecycle::new();
    let (api, _) = ProjectBuilder::new().name("api").build_in(&fs, Path::new("/work/api"));
    let (web, _) = ProjectBuilder::new().name("web").build_in(&fs, Path::new("/work/web"));
    let mut sup = mock_supervisor(&fs, &lifecycle);
    sup.add_all([api, web]).unwrap();
    let stop = sup.stop_handle();

    let (detector, trigger) = ManualDetector::new();
    let run = spawn_run(sup, detector);
    trigger.running().await;

    trigger.change("/work/web/main.go");
    sleep(Duration::from_millis(200)).await;

    let web_builds = lifecycle
        .calls()
        .iter()
        .filter(|c| matches!(c, LifecycleCall::Build { project } if project == "web"))
        .count();
    let api_builds = lifecycle
        .calls()
        .iter()
        .filter(|c| matches!(c, LifecycleCall::Build { project } if project == "api"))
        .count();
    assert_eq!(web_builds, 2);
    assert_eq!(api_builds, 1);

    stop.stop();
    let (_sup, result) = with_timeout(run).await.unwrap();
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn settle_delay_postpones_the_first_reload_and_becomes_the_interval() {
    let fs = MockFileSystem::new();
    let lifecycle = FakeLifecycle::new();
    let (project, _err) = api_project()
        .settle_delay(Duration::from_secs(3))
        .build_in(&fs, Path::new("/work/api"));
    let mut sup = mock_supervisor(&fs, &lifecycle);
    let slot = sup.add(project).unwrap();
    let stop = sup.stop_handle();

    let (detector, trigger) = ManualDetector::new();
    let run = spawn_run(sup, detector);
    trigger.running().await;

    trigger.change("/work/api/main.go");
    sleep(Duration::from_secs(1)).await;
    assert_eq!(lifecycle.builds(), 1, "reload must wait for the settle delay");

    // Absorbed by the pending reload.
    trigger.change("/work/api/handlers.go");
    sleep(Duration::from_secs(3)).await;

    assert_eq!(lifecycle.builds(), 2);
    assert_eq!(slot.reload_interval(), Duration::from_secs(3));

    stop.stop();
    let (_sup, result) = with_timeout(run).await.unwrap();
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn reload_runs_kill_then_build_then_run() {
    let fs = MockFileSystem::new();
    let lifecycle = FakeLifecycle::new();
    let (project, _err) = api_project().build_in(&fs, Path::new("/work/api"));
    let mut sup = mock_supervisor(&fs, &lifecycle);
    sup.add(project).unwrap();
    let stop = sup.stop_handle();

    let (detector, trigger) = ManualDetector::new();
    let run = spawn_run(sup, detector);
    trigger.running().await;

    trigger.change("/work/api/main.go");
    sleep(Duration::from_millis(200)).await;

    let first_pid = lifecycle.children()[0].pid();
    assert_eq!(
        lifecycle.calls(),
        vec![
            LifecycleCall::Build { project: "api".into() },
            LifecycleCall::Run { project: "api".into(), quiet: false },
            LifecycleCall::Kill { app: "api".into(), pid: Some(first_pid) },
            LifecycleCall::Build { project: "api".into() },
            LifecycleCall::Run { project: "api".into(), quiet: false },
        ]
    );
    assert!(!lifecycle.children()[0].is_running());
    assert!(lifecycle.children()[1].is_running());

    stop.stop();
    let (_sup, result) = with_timeout(run).await.unwrap();
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn overlapping_reloads_of_one_project_run_one_after_another() {
    let fs = MockFileSystem::new();
    let lifecycle = FakeLifecycle::new().with_build_delay(Duration::from_secs(3));
    let (project, _err) = api_project().build_in(&fs, Path::new("/work/api"));
    let mut sup = mock_supervisor(&fs, &lifecycle);
    sup.add(project).unwrap();
    let stop = sup.stop_handle();

    let (detector, trigger) = ManualDetector::new();
    let run = spawn_run(sup, detector);
    trigger.running().await;

    trigger.change("/work/api/main.go");
    // Past the interval while the first rebuild is still running.
    sleep(Duration::from_millis(2100)).await;
    trigger.change("/work/api/main.go");
    sleep(Duration::from_secs(10)).await;

    let kinds: Vec<&str> = lifecycle
        .calls()
        .iter()
        .map(|c| match c {
            LifecycleCall::Build { .. } => "build",
            LifecycleCall::Run { .. } => "run",
            LifecycleCall::Kill { .. } => "kill",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["build", "run", "kill", "build", "run", "kill", "build", "run"]
    );

    stop.stop();
    let (_sup, result) = with_timeout(run).await.unwrap();
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn quiet_rerun_discards_output_after_the_first_run() {
    let fs = MockFileSystem::new();
    let lifecycle = FakeLifecycle::new();
    let (project, _err) = api_project()
        .quiet_rerun()
        .build_in(&fs, Path::new("/work/api"));
    let mut sup = mock_supervisor(&fs, &lifecycle);
    sup.add(project).unwrap();
    let stop = sup.stop_handle();

    let (detector, trigger) = ManualDetector::new();
    let run = spawn_run(sup, detector);
    trigger.running().await;

    trigger.change("/work/api/main.go");
    sleep(Duration::from_millis(200)).await;

    let quiet: Vec<bool> = lifecycle
        .calls()
        .iter()
        .filter_map(|c| match c {
            LifecycleCall::Run { quiet, .. } => Some(*quiet),
            _ => None,
        })
        .collect();
    assert_eq!(quiet, vec![false, true]);

    stop.stop();
    let (_sup, result) = with_timeout(run).await.unwrap();
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn reload_hooks_see_the_changed_file() {
    let fs = MockFileSystem::new();
    let lifecycle = FakeLifecycle::new();
    let (project, _err) = api_project().build_in(&fs, Path::new("/work/api"));

    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let project = project
        .on_reload(recording_hook(&seen, "before"))
        .on_reloaded(recording_hook(&seen, "after"));

    let mut sup = mock_supervisor(&fs, &lifecycle);
    sup.add(project).unwrap();
    let stop = sup.stop_handle();

    let (detector, trigger) = ManualDetector::new();
    let run = spawn_run(sup, detector);
    trigger.running().await;

    trigger.change("/work/api/handlers.go");
    sleep(Duration::from_millis(200)).await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            "before /work/api/handlers.go".to_string(),
            "after /work/api/handlers.go".to_string(),
        ]
    );

    stop.stop();
    let (_sup, result) = with_timeout(run).await.unwrap();
    result.unwrap();
}
