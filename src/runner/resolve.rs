//! Pipeline resolution
//!
//! Expands a requested task into a flat, ordered [`ExecutionPlan`]. Expansion
//! is pre-order and depth-first; a task reached again through a different
//! branch is expanded again, while a task reached again through its own
//! expansion is a cycle.

use crate::error::{ResolveError, ResolveResult};
use crate::runner::{compose, resolve_argv, CommandTask, Context, EnvMap, TaskDefinition, TaskRegistry};
use crate::utils::suggest_names;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// One fully resolved command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicStep {
    /// Task the step was expanded from
    pub source_task_name: String,

    /// Program and arguments, passed to the OS as-is
    pub argv: Vec<String>,

    /// The task's own environment overrides
    pub declared_env: BTreeMap<String, String>,

    /// Complete environment of the process
    pub resolved_env: EnvMap,

    /// Working directory of the process
    pub resolved_cwd: PathBuf,

    pub use_venv: bool,

    /// Expected venv location when the task wants a venv that does not exist
    pub missing_venv: Option<PathBuf>,
}

impl AtomicStep {
    /// Program to spawn
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    /// The argument vector rendered for log lines
    pub fn display_command(&self) -> String {
        self.argv
            .iter()
            .map(|arg| {
                if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '"') {
                    format!("{:?}", arg)
                } else {
                    arg.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The declared environment overrides rendered for log lines
    pub fn display_env(&self) -> String {
        let pairs: Vec<String> = self
            .declared_env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{{{}}}", pairs.join(", "))
    }
}

/// Ordered steps produced by resolving one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    task_name: String,
    steps: Vec<AtomicStep>,
}

impl ExecutionPlan {
    /// The task that was requested
    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn steps(&self) -> &[AtomicStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_steps(self) -> Vec<AtomicStep> {
        self.steps
    }

    /// Tasks that contribute more than one step, in first-seen order
    pub fn repeated_tasks(&self) -> Vec<&str> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order = Vec::new();
        for step in &self.steps {
            let count = counts.entry(step.source_task_name.as_str()).or_insert(0);
            *count += 1;
            if *count == 2 {
                order.push(step.source_task_name.as_str());
            }
        }
        order
    }
}

/// Resolve `task_name` against `registry` into an execution plan.
///
/// Fails with [`ResolveError::TaskNotFound`] when the task or any task it
/// reaches is missing, and with [`ResolveError::CycleDetected`] when a task
/// is reached again while it is still being expanded.
pub fn resolve(task_name: &str, registry: &TaskRegistry, ctx: &Context) -> ResolveResult<ExecutionPlan> {
    let resolver = Resolver { registry, ctx };
    let mut visiting = Vec::new();
    let mut steps = Vec::new();
    resolver.expand(task_name, &mut visiting, &mut steps)?;

    Ok(ExecutionPlan {
        task_name: task_name.to_string(),
        steps,
    })
}

struct Resolver<'a> {
    registry: &'a TaskRegistry,
    ctx: &'a Context,
}

impl Resolver<'_> {
    fn expand(
        &self,
        name: &str,
        visiting: &mut Vec<String>,
        steps: &mut Vec<AtomicStep>,
    ) -> ResolveResult<()> {
        if visiting.iter().any(|n| n == name) {
            let mut chain = visiting.clone();
            chain.push(name.to_string());
            return Err(ResolveError::CycleDetected { chain });
        }

        let definition = self
            .registry
            .get(name)
            .ok_or_else(|| self.not_found(name))?;

        visiting.push(name.to_string());

        match definition {
            TaskDefinition::Command(task) => steps.push(self.atomic_step(name, task)),
            TaskDefinition::Pipeline(pipeline) => {
                for step in &pipeline.steps {
                    self.expand(step, visiting, steps)?;
                }
            }
        }

        visiting.pop();
        Ok(())
    }

    fn atomic_step(&self, name: &str, task: &CommandTask) -> AtomicStep {
        let venv = self.ctx.venv.as_ref();
        let composed = compose(task, &self.ctx.project_root, venv, &self.ctx.ambient_env);

        AtomicStep {
            source_task_name: name.to_string(),
            argv: resolve_argv(task, venv),
            declared_env: task.env.clone(),
            resolved_env: composed.env,
            resolved_cwd: composed.cwd,
            use_venv: task.use_venv,
            missing_venv: match (task.use_venv, venv) {
                (true, None) => self.ctx.venv_path.clone(),
                _ => None,
            },
        }
    }

    fn not_found(&self, name: &str) -> ResolveError {
        ResolveError::TaskNotFound {
            name: name.to_string(),
            suggestions: suggest_names(name, self.registry.names()),
            available: self.registry.names().map(str::to_string).collect(),
        }
    }
}
