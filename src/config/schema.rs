//! Configuration validation
//!
//! Turns the raw configuration into a [`TaskRegistry`]. Each task is checked
//! on its own; references between tasks are left to resolution.

use crate::config::types::{DevflowConfig, TaskConfig};
use crate::error::{ConfigError, ConfigResult};
use crate::runner::{CommandTask, PipelineTask, TaskDefinition, TaskRegistry};
use std::path::{Path, PathBuf};

/// Validate a complete configuration
pub fn validate_config(config: &DevflowConfig) -> ConfigResult<()> {
    build_registry(config).map(|_| ())
}

/// Build the task registry from configuration
pub fn build_registry(config: &DevflowConfig) -> ConfigResult<TaskRegistry> {
    let definitions = config
        .tasks
        .iter()
        .map(|(name, task)| Ok((name.clone(), task_definition(name, task)?)))
        .collect::<ConfigResult<Vec<_>>>()?;

    TaskRegistry::from_definitions(definitions)
}

/// Validate a single task and convert it to its runtime definition
pub fn task_definition(name: &str, task: &TaskConfig) -> ConfigResult<TaskDefinition> {
    match (&task.command, &task.pipeline) {
        (Some(_), Some(_)) => Err(ConfigError::AmbiguousBody(name.to_string())),
        (None, None) => Err(ConfigError::MissingBody(name.to_string())),
        (None, Some(steps)) => {
            if let Some(step) = steps.iter().find(|s| s.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "Task '{}' has an empty pipeline step name '{}'",
                    name, step
                )));
            }
            Ok(PipelineTask::new(steps.iter().cloned()).into())
        }
        (Some(command), None) => {
            let mut argv = command.to_argv();
            if argv.first().map_or(true, |p| p.trim().is_empty()) {
                return Err(ConfigError::EmptyCommand(name.to_string()));
            }
            argv.extend(task.args.iter().cloned());

            let working_dir = match &task.working_dir {
                Some(dir) => Some(relative_dir(name, dir)?),
                None => None,
            };

            Ok(TaskDefinition::Command(CommandTask {
                argv,
                use_venv: task.use_venv,
                env: task.env.clone(),
                working_dir,
            }))
        }
    }
}

fn relative_dir(name: &str, dir: &str) -> ConfigResult<PathBuf> {
    let path = Path::new(dir);
    if path.is_absolute() || path.has_root() {
        return Err(ConfigError::AbsoluteWorkingDir {
            name: name.to_string(),
            dir: dir.to_string(),
        });
    }
    Ok(path.to_path_buf())
}
