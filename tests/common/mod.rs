//! Common test utilities

#![allow(dead_code)]

use devflow::config::{build_registry, parse_config};
use devflow::error::{ExecutionError, ExecutionResult};
use devflow::runner::{AtomicStep, StepRunner, TaskRegistry};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a temporary project with a devflow.toml file
pub fn create_project(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("devflow.toml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// Create a temporary project with a pyproject.toml file
pub fn create_pyproject(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("pyproject.toml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// Build a registry straight from TOML text
pub fn registry_from(toml: &str) -> TaskRegistry {
    let config = parse_config(toml, Path::new("devflow.toml")).unwrap();
    build_registry(&config).unwrap()
}

/// Read a file written by a task, without the trailing newline
pub fn read_output(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name))
        .unwrap()
        .trim_end()
        .to_string()
}

/// Step runner that records what it was asked to spawn
#[derive(Default)]
pub struct RecordingRunner {
    spawned: RefCell<Vec<String>>,
    codes: HashMap<String, i32>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make steps of `task` exit with `code`; 127 acts as a missing program
    pub fn failing(mut self, task: &str, code: i32) -> Self {
        self.codes.insert(task.to_string(), code);
        self
    }

    /// Source task names of spawned steps, in order
    pub fn spawned(&self) -> Vec<String> {
        self.spawned.borrow().clone()
    }
}

impl StepRunner for RecordingRunner {
    fn run(&self, step: &AtomicStep) -> ExecutionResult<()> {
        self.spawned.borrow_mut().push(step.source_task_name.clone());
        match self.codes.get(&step.source_task_name) {
            Some(&127) => Err(not_found(step.program())),
            Some(&code) => Err(ExecutionError::CommandFailed(code)),
            None => Ok(()),
        }
    }
}

/// Spawn error for a program that does not exist
pub fn not_found(program: &str) -> ExecutionError {
    ExecutionError::Spawn {
        program: program.to_string(),
        source: io::Error::from(io::ErrorKind::NotFound),
    }
}
