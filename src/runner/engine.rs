//! Resolve-then-execute entry point used by the CLI

use crate::error::{ResolveError, EXIT_FAILURE};
use crate::runner::{resolve, Context, Executor, PlanOutcome, StepRunner, TaskDefinition, TaskRegistry};
use crate::ui::Reporter;
use std::fmt;

/// Lifecycle of one task run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Resolving,
    Resolved,
    ResolutionFailed,
    Executing,
    Succeeded,
    /// Stopped at the step with this index
    Failed { step: usize },
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::ResolutionFailed | RunState::Succeeded | RunState::Failed { .. }
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Pending => write!(f, "pending"),
            RunState::Resolving => write!(f, "resolving"),
            RunState::Resolved => write!(f, "resolved"),
            RunState::ResolutionFailed => write!(f, "resolution failed"),
            RunState::Executing => write!(f, "executing"),
            RunState::Succeeded => write!(f, "succeeded"),
            RunState::Failed { step } => write!(f, "failed at step {}", step + 1),
        }
    }
}

/// Outcome of [`Engine::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRun {
    pub state: RunState,
    pub exit_code: i32,
    /// Set when resolution failed
    pub resolve_error: Option<ResolveError>,
    /// Set when the plan was executed
    pub outcome: Option<PlanOutcome>,
}

/// Runs named tasks from a registry
pub struct Engine<'a> {
    registry: &'a TaskRegistry,
    ctx: &'a Context,
    runner: &'a dyn StepRunner,
    reporter: &'a dyn Reporter,
}

impl<'a> Engine<'a> {
    pub fn new(
        registry: &'a TaskRegistry,
        ctx: &'a Context,
        runner: &'a dyn StepRunner,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Engine {
            registry,
            ctx,
            runner,
            reporter,
        }
    }

    /// Run the named task and return the process exit code
    pub fn run_task(&self, name: &str) -> i32 {
        self.run(name).exit_code
    }

    /// Run the named task, reporting errors once, and return the full record
    pub fn run(&self, name: &str) -> TaskRun {
        let mut state = RunState::Pending;
        self.transition(name, &mut state, RunState::Resolving);

        let plan = match resolve(name, self.registry, self.ctx) {
            Ok(plan) => plan,
            Err(err) => {
                self.transition(name, &mut state, RunState::ResolutionFailed);
                self.report_resolve_error(name, &err);
                return TaskRun {
                    state,
                    exit_code: EXIT_FAILURE,
                    resolve_error: Some(err),
                    outcome: None,
                };
            }
        };
        self.transition(name, &mut state, RunState::Resolved);

        let repeated = plan.repeated_tasks();
        if !repeated.is_empty() {
            self.reporter.warn(
                name,
                &format!(
                    "Tasks reached through more than one path will run again: {}",
                    repeated.join(", ")
                ),
            );
        }

        let kind = match self.registry.get(name) {
            Some(TaskDefinition::Pipeline(_)) => "pipeline",
            _ => "task",
        };
        self.reporter.info(name, &format!("Starting {}", kind));

        self.transition(name, &mut state, RunState::Executing);
        let outcome = Executor::new(self.runner, self.reporter, self.ctx.dry_run).execute(plan);

        let next = match outcome.failed_step {
            Some(step) => RunState::Failed { step },
            None => RunState::Succeeded,
        };
        self.transition(name, &mut state, next);

        match state {
            RunState::Failed { step } => {
                let source = outcome
                    .steps
                    .get(step)
                    .map(|s| s.task_name.as_str())
                    .unwrap_or(name);
                let mut message = format!(
                    "Failed at step {}/{} ('{}') with exit code {}",
                    step + 1,
                    outcome.steps.len(),
                    source,
                    outcome.exit_code()
                );
                if let Some(reason) = &outcome.reason {
                    message.push_str(&format!(": {}", reason));
                }
                self.reporter.error(name, &message);
            }
            _ if self.ctx.dry_run => self.reporter.info(name, "Dry run complete; nothing was executed"),
            _ => self.reporter.info(name, "Completed successfully"),
        }

        TaskRun {
            state,
            exit_code: outcome.exit_code(),
            resolve_error: None,
            outcome: Some(outcome),
        }
    }

    fn transition(&self, name: &str, state: &mut RunState, next: RunState) {
        self.reporter
            .debug(name, &format!("State: {} -> {}", state, next));
        *state = next;
    }

    fn report_resolve_error(&self, name: &str, err: &ResolveError) {
        self.reporter.error(name, &err.to_string());
        let hint = match err {
            ResolveError::TaskNotFound { .. } => "To see available tasks, run: devflow task --list",
            ResolveError::CycleDetected { .. } => "Fix the cycle in your task definitions.",
        };
        self.reporter.info(name, hint);
    }
}
