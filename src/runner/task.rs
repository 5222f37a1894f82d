//! Task definitions and the task registry
//!
//! This module contains the runtime representation of tasks. The registry is
//! built once by the configuration layer and only read afterwards; tasks
//! refer to each other by name.

use crate::error::{ConfigError, ConfigResult};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A named unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskDefinition {
    /// A single external command
    Command(CommandTask),

    /// An ordered list of other task names
    Pipeline(PipelineTask),
}

impl TaskDefinition {
    /// Short label used when listing tasks
    pub fn kind(&self) -> &'static str {
        match self {
            TaskDefinition::Command(_) => "command",
            TaskDefinition::Pipeline(_) => "pipeline",
        }
    }

    /// One-line summary of what the task does
    pub fn summary(&self) -> String {
        match self {
            TaskDefinition::Command(cmd) => cmd.argv.join(" "),
            TaskDefinition::Pipeline(p) => p.steps.join(", "),
        }
    }
}

/// An external command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTask {
    /// Executable followed by its arguments
    pub argv: Vec<String>,

    /// Run inside the project venv
    pub use_venv: bool,

    /// Environment overrides, applied last
    pub env: BTreeMap<String, String>,

    /// Working directory relative to the project root
    pub working_dir: Option<PathBuf>,
}

impl CommandTask {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandTask {
            argv: argv.into_iter().map(Into::into).collect(),
            use_venv: true,
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_use_venv(mut self, use_venv: bool) -> Self {
        self.use_venv = use_venv;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// A sequence of task references, run in listed order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineTask {
    pub steps: Vec<String>,
}

impl PipelineTask {
    pub fn new<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PipelineTask {
            steps: steps.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<CommandTask> for TaskDefinition {
    fn from(task: CommandTask) -> Self {
        TaskDefinition::Command(task)
    }
}

impl From<PipelineTask> for TaskDefinition {
    fn from(task: PipelineTask) -> Self {
        TaskDefinition::Pipeline(task)
    }
}

/// Read-only mapping from task name to definition.
///
/// Pipeline step references are not checked here; missing names surface when
/// a task that reaches them is resolved.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, TaskDefinition>,
}

impl TaskRegistry {
    /// Build a registry, rejecting empty or duplicate names and empty commands
    pub fn from_definitions<I, S>(definitions: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (S, TaskDefinition)>,
        S: Into<String>,
    {
        let mut tasks = BTreeMap::new();
        for (name, definition) in definitions {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyTaskName);
            }
            if let TaskDefinition::Command(cmd) = &definition {
                if cmd.argv.first().map_or(true, |p| p.is_empty()) {
                    return Err(ConfigError::EmptyCommand(name));
                }
            }
            if tasks.contains_key(&name) {
                return Err(ConfigError::DuplicateTask(name));
            }
            tasks.insert(name, definition);
        }
        Ok(TaskRegistry { tasks })
    }

    pub fn get(&self, name: &str) -> Option<&TaskDefinition> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Task names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaskDefinition)> {
        self.tasks.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
