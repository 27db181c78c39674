#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use relaunch::config::model::{RawConfigFile, RawProject};
use relaunch::config::ConfigFile;
use relaunch::exec::{OutputSink, SharedBuffer};
use relaunch::fs::mock::MockFileSystem;
use relaunch::project::Project;
use relaunch::types::WatcherKind;
use tempfile::TempDir;

/// Builder for a project plus the files it lives in.
///
/// The project's output goes to in-memory buffers so tests can inspect
/// failure reports.
pub struct ProjectBuilder {
    name: Option<String>,
    main: String,
    files: Vec<(String, String)>,
    dirs: Vec<String>,
    args: Vec<String>,
    reload_interval: Option<Duration>,
    settle_delay: Option<Duration>,
    ignore: Vec<String>,
    on_reload_commands: Vec<String>,
    disable_rerun_output: bool,
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            main: "main.go".to_string(),
            files: Vec::new(),
            dirs: Vec::new(),
            args: Vec::new(),
            reload_interval: None,
            settle_delay: None,
            ignore: Vec::new(),
            on_reload_commands: Vec::new(),
            disable_rerun_output: false,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Main file, relative to the project root.
    pub fn main(mut self, rel: &str) -> Self {
        self.main = rel.to_string();
        self
    }

    /// Extra file, relative to the project root.
    pub fn file(mut self, rel: &str, content: &str) -> Self {
        self.files.push((rel.to_string(), content.to_string()));
        self
    }

    /// Extra directory, relative to the project root.
    pub fn dir(mut self, rel: &str) -> Self {
        self.dirs.push(rel.to_string());
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn reload_interval(mut self, interval: Duration) -> Self {
        self.reload_interval = Some(interval);
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = Some(delay);
        self
    }

    pub fn ignore(mut self, glob: &str) -> Self {
        self.ignore.push(glob.to_string());
        self
    }

    pub fn on_reload_command(mut self, cmd: &str) -> Self {
        self.on_reload_commands.push(cmd.to_string());
        self
    }

    pub fn quiet_rerun(mut self) -> Self {
        self.disable_rerun_output = true;
        self
    }

    fn project(&self, root: &Path, out: &SharedBuffer, err: &SharedBuffer) -> Project {
        let mut project = Project::new(root.join(&self.main))
            .with_args(self.args.iter().cloned())
            .with_output(OutputSink::Buffer(out.clone()), OutputSink::Buffer(err.clone()));
        project.name = self.name.clone();
        project.reload_interval = self.reload_interval;
        project.settle_delay = self.settle_delay;
        project.ignore = self.ignore.clone();
        project.on_reload_commands = self.on_reload_commands.clone();
        project.disable_rerun_output = self.disable_rerun_output;
        project
    }

    /// Create the project's files in a fresh temporary directory.
    pub fn build_on_disk(self) -> TempProject {
        let tmp = tempfile::tempdir().unwrap();
        // Canonical so watcher event paths compare equal.
        let root = tmp.path().canonicalize().unwrap();

        for dir in &self.dirs {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        let main = root.join(&self.main);
        std::fs::create_dir_all(main.parent().unwrap()).unwrap();
        std::fs::write(&main, "package main\n\nfunc main() {}\n").unwrap();
        for (rel, content) in &self.files {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }

        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        let project = self.project(&root, &out, &err);
        TempProject {
            tmp,
            root,
            project,
            out,
            err,
        }
    }

    /// Populate `fs` under `root` and return the (unprepared) project.
    pub fn build_in(self, fs: &MockFileSystem, root: &Path) -> (Project, SharedBuffer) {
        fs.add_dir(root);
        for dir in &self.dirs {
            fs.add_dir(root.join(dir));
        }
        fs.add_file(root.join(&self.main), "package main\n");
        for (rel, content) in &self.files {
            fs.add_file(root.join(rel), content.as_bytes());
        }
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        (self.project(root, &out, &err), err)
    }
}

/// A project materialized in a temporary directory.
pub struct TempProject {
    tmp: TempDir,
    pub root: PathBuf,
    pub project: Project,
    pub out: SharedBuffer,
    pub err: SharedBuffer,
}

impl TempProject {
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Clone of the project, for registering it.
    pub fn project(&self) -> Project {
        self.project.clone()
    }

    pub fn tempdir(&self) -> &TempDir {
        &self.tmp
    }
}

/// Builder for `ConfigFile` to simplify test setup.
#[derive(Default)]
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watcher(mut self, kind: WatcherKind) -> Self {
        self.config.config.watcher = Some(kind);
        self
    }

    pub fn delay(mut self, delay: &str) -> Self {
        self.config.config.delay = Some(delay.to_string());
        self
    }

    pub fn on_reload(mut self, cmd: &str) -> Self {
        self.config.config.on_reload.push(cmd.to_string());
        self
    }

    pub fn project(mut self, name: &str, main: &str) -> Self {
        self.config.project.insert(
            name.to_string(),
            RawProject {
                main: Some(PathBuf::from(main)),
                ..RawProject::default()
            },
        );
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
