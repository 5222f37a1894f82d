//! Error types for devflow

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code used for configuration and resolution failures
pub const EXIT_FAILURE: i32 = 1;

/// Exit code used when a step's program cannot be found
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit code used when a step's program cannot be executed
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

/// Result type alias for devflow operations
pub type Result<T> = std::result::Result<T, DevflowError>;

/// Main error type for devflow
#[derive(Error, Debug)]
pub enum DevflowError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Step execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DevflowError {
    /// Process exit code this error maps to
    pub fn exit_code(&self) -> i32 {
        match self {
            DevflowError::Execution(e) => e.exit_code(),
            _ => EXIT_FAILURE,
        }
    }
}

/// Configuration discovery, parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Project root not found: no pyproject.toml or devflow.toml in {0} or any parent directory")]
    ProjectRootNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read '{path}': {error}")]
    Read { path: PathBuf, error: String },

    #[error("Failed to parse '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Task '{0}' must specify either 'command' or 'pipeline'")]
    MissingBody(String),

    #[error("Task '{0}' cannot specify both 'command' and 'pipeline'")]
    AmbiguousBody(String),

    #[error("Task '{0}' has an empty command")]
    EmptyCommand(String),

    #[error("Task '{name}' has an absolute working_dir '{dir}'; it must be relative to the project root")]
    AbsoluteWorkingDir { name: String, dir: String },

    #[error("Task names must not be empty")]
    EmptyTaskName,

    #[error("Task '{0}' is defined more than once")]
    DuplicateTask(String),
}

/// Errors raised while expanding a task into an execution plan
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{}", render_not_found(.name, .suggestions, .available))]
    TaskNotFound {
        name: String,
        suggestions: Vec<String>,
        available: Vec<String>,
    },

    #[error("Cycle detected in pipeline: {}", .chain.join(" -> "))]
    CycleDetected { chain: Vec<String> },
}

impl ResolveError {
    /// Name of the missing task, if this is a lookup failure
    pub fn missing_task(&self) -> Option<&str> {
        match self {
            ResolveError::TaskNotFound { name, .. } => Some(name),
            ResolveError::CycleDetected { .. } => None,
        }
    }

    /// The cycle chain, if this is a cycle failure
    pub fn cycle(&self) -> Option<&[String]> {
        match self {
            ResolveError::CycleDetected { chain } => Some(chain),
            ResolveError::TaskNotFound { .. } => None,
        }
    }
}

fn render_not_found(name: &str, suggestions: &[String], available: &[String]) -> String {
    let mut msg = format!("Task '{}' not found.", name);
    if !suggestions.is_empty() {
        msg.push_str(&format!(" Did you mean: {}?", suggestions.join(", ")));
    }
    if !available.is_empty() {
        msg.push_str(&format!(" Available tasks: {}", available.join(", ")));
    }
    msg
}

/// Step execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Command failed with exit code {0}")]
    CommandFailed(i32),
}

impl ExecutionError {
    /// Exit code this failure contributes to the plan
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecutionError::Spawn { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => EXIT_NOT_FOUND,
                io::ErrorKind::PermissionDenied => EXIT_NOT_EXECUTABLE,
                _ => EXIT_FAILURE,
            },
            ExecutionError::CommandFailed(code) => *code,
        }
    }
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for resolution operations
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;
