#![allow(dead_code)]

pub use relaunch_test_utils::*;

use std::path::Path;
use std::sync::Arc;

use relaunch::engine::Supervisor;
use relaunch::exec::Toolchain;
use relaunch::fs::mock::MockFileSystem;
use relaunch::types::Platform;

/// Supervisor over an in-memory filesystem rooted at `/work`, with a fake
/// lifecycle.
pub fn mock_supervisor(fs: &MockFileSystem, lifecycle: &FakeLifecycle) -> Supervisor {
    Supervisor::new(Arc::new(lifecycle.clone()), Toolchain::default())
        .with_fs(Arc::new(fs.clone()))
        .with_cwd("/work")
        .with_platform(Platform::Other)
}

/// Supervisor over the real filesystem with a fake lifecycle.
pub fn disk_supervisor(cwd: &Path, lifecycle: &FakeLifecycle) -> Supervisor {
    Supervisor::new(Arc::new(lifecycle.clone()), Toolchain::default())
        .with_cwd(cwd)
        .with_platform(Platform::Other)
}

use relaunch::engine::Sources;
use relaunch::errors::Result;
use tokio::task::JoinHandle;

/// Run `sup` with `detector` on a background task, handing the supervisor
/// back when the run ends.
pub fn spawn_run(
    mut sup: Supervisor,
    detector: ManualDetector,
) -> JoinHandle<(Supervisor, Result<()>)> {
    tokio::spawn(async move {
        let result = sup.run_with(Box::new(detector), Sources::new(), None).await;
        (sup, result)
    })
}
