//! Core configuration types
//!
//! This module defines the data structures of the `[tool.devflow]` table in
//! `pyproject.toml` or of a standalone `devflow.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default virtual environment directory, relative to the project root
pub const DEFAULT_VENV_DIR: &str = ".venv";

/// Top-level configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DevflowConfig {
    /// Virtual environment directory (relative to the project root)
    #[serde(default = "default_venv_dir")]
    pub venv_dir: String,

    /// Tasks defined in the configuration
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskConfig>,
}

impl Default for DevflowConfig {
    fn default() -> Self {
        DevflowConfig {
            venv_dir: default_venv_dir(),
            tasks: BTreeMap::new(),
        }
    }
}

/// A task definition
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct TaskConfig {
    /// Program to run, as a bare name or a full argument vector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandLine>,

    /// Arguments appended after `command`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Run inside the project venv
    #[serde(default = "default_true")]
    pub use_venv: bool,

    /// Environment overrides
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Working directory relative to the project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    /// Names of the tasks this pipeline runs, in order
    #[serde(default, alias = "steps", skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Vec<String>>,
}

/// The `command` key: `"pytest"` or `["python", "-m", "pytest"]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CommandLine {
    /// Single program name
    Program(String),

    /// Program followed by arguments
    Argv(Vec<String>),
}

impl CommandLine {
    /// The command as an argument vector
    pub fn to_argv(&self) -> Vec<String> {
        match self {
            CommandLine::Program(p) => vec![p.clone()],
            CommandLine::Argv(argv) => argv.clone(),
        }
    }
}

fn default_venv_dir() -> String {
    DEFAULT_VENV_DIR.to_string()
}

fn default_true() -> bool {
    true
}
