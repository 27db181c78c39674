// tests/poll_watcher.rs

mod common;
use crate::common::{init_tracing, mock_supervisor, wait_until, FakeLifecycle, ProjectBuilder};

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use tokio::time::{sleep, Instant};

use relaunch::errors::RelaunchError;
use relaunch::fs::mock::MockFileSystem;
use relaunch::project::SharedProject;
use relaunch::watch::{ChangeDetector, LoopExit, PollWatcher, StopHandle, DEFAULT_POLL_INTERVAL};

type Seen = Arc<Mutex<Vec<PathBuf>>>;

fn register(fs: &MockFileSystem) -> SharedProject {
    let (project, _) = ProjectBuilder::new()
        .file("handlers/users.go", "package handlers\n")
        .file("vendor/lib/lib.go", "package lib\n")
        .file("README.md", "# api\n")
        .build_in(fs, Path::new("/work/api"));
    let mut sup = mock_supervisor(fs, &FakeLifecycle::new());
    sup.add(project).unwrap()
}

fn watcher(fs: &MockFileSystem) -> (PollWatcher, Seen) {
    let mut watcher = PollWatcher::new()
        .with_interval(Duration::from_millis(50))
        .with_fs(Arc::new(fs.clone()));
    let seen: Seen = Arc::default();
    let sink = Arc::clone(&seen);
    watcher.on_change(Arc::new(move |_slot: SharedProject, path: PathBuf| {
        sink.lock().unwrap().push(path);
    }));
    (watcher, seen)
}

#[test]
fn default_interval_is_1350ms() {
    assert_eq!(DEFAULT_POLL_INTERVAL, Duration::from_millis(1350));
}

#[tokio::test]
async fn modified_source_is_reported_until_a_reload_catches_up() {
    init_tracing();
    let fs = MockFileSystem::new();
    let slot = register(&fs);
    let (mut watcher, seen) = watcher(&fs);
    watcher.subscribe(&[Arc::clone(&slot)]).unwrap();

    let stop = StopHandle::new();
    let signal = stop.signal();
    let task = tokio::spawn(async move { watcher.run(signal).await });

    sleep(Duration::from_millis(150)).await;
    assert!(seen.lock().unwrap().is_empty(), "files older than the start are ignored");

    fs.touch("/work/api/handlers/users.go", SystemTime::now());
    assert!(wait_until(Duration::from_secs(5), || !seen.lock().unwrap().is_empty()).await);
    assert_eq!(seen.lock().unwrap()[0], PathBuf::from("/work/api/handlers/users.go"));

    // Once a reload is recorded after the write, the file is old news.
    sleep(Duration::from_millis(10)).await;
    slot.admit(Instant::now(), SystemTime::now());
    sleep(Duration::from_millis(60)).await;
    seen.lock().unwrap().clear();
    sleep(Duration::from_millis(250)).await;
    assert!(seen.lock().unwrap().is_empty());

    stop.stop();
    assert_eq!(task.await.unwrap(), LoopExit::Stopped);
}

#[tokio::test]
async fn walk_stops_at_the_first_modified_file() {
    let fs = MockFileSystem::new();
    let slot = register(&fs);
    let (mut watcher, seen) = watcher(&fs);
    watcher.subscribe(&[slot]).unwrap();

    let stop = StopHandle::new();
    let signal = stop.signal();
    let task = tokio::spawn(async move { watcher.run(signal).await });
    sleep(Duration::from_millis(100)).await;

    let now = SystemTime::now();
    fs.touch("/work/api/handlers/users.go", now);
    fs.touch("/work/api/main.go", now);
    sleep(Duration::from_millis(300)).await;

    let seen = seen.lock().unwrap().clone();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|p| p == Path::new("/work/api/main.go")), "{seen:?}");

    stop.stop();
    task.await.unwrap();
}

#[tokio::test]
async fn ignored_directories_and_other_files_are_skipped() {
    let fs = MockFileSystem::new();
    let slot = register(&fs);
    let (mut watcher, seen) = watcher(&fs);
    watcher.subscribe(&[slot]).unwrap();

    let stop = StopHandle::new();
    let signal = stop.signal();
    let task = tokio::spawn(async move { watcher.run(signal).await });
    sleep(Duration::from_millis(100)).await;

    fs.touch("/work/api/vendor/lib/lib.go", SystemTime::now());
    fs.touch("/work/api/README.md", SystemTime::now());
    sleep(Duration::from_millis(300)).await;

    assert!(seen.lock().unwrap().is_empty());

    stop.stop();
    task.await.unwrap();
}

#[tokio::test]
async fn walk_errors_go_to_error_listeners() {
    let fs = MockFileSystem::new();
    let slot = register(&fs);

    // The watcher looks at a filesystem where the project is missing.
    let empty = MockFileSystem::new();
    let (mut watcher, seen) = watcher(&empty);
    let errors = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&errors);
    watcher.on_error(Arc::new(move |err: &RelaunchError| {
        sink.lock().unwrap().push(err.to_string());
    }));
    watcher.subscribe(&[slot]).unwrap();
    assert_eq!(errors.lock().unwrap().len(), 1);

    let stop = StopHandle::new();
    let signal = stop.signal();
    let task = tokio::spawn(async move { watcher.run(signal).await });

    assert!(wait_until(Duration::from_secs(5), || errors.lock().unwrap().len() >= 2).await);
    assert!(seen.lock().unwrap().is_empty());

    stop.stop();
    assert_eq!(task.await.unwrap(), LoopExit::Stopped);
}
