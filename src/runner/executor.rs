//! Plan execution
//!
//! Runs the steps of an [`ExecutionPlan`] strictly in order and stops at the
//! first step that does not succeed.

use crate::error::ExecutionError;
use crate::runner::{AtomicStep, ExecutionPlan, ProcessRunner, StepRunner};
use crate::ui::Reporter;

/// What happened to one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Exited with code 0
    Succeeded,
    /// Logged instead of spawned
    DryRun,
    /// Exited non-zero
    Failed(i32),
    /// Could not be started; carries the mapped exit code
    SpawnFailed(i32),
    /// Not run because an earlier step failed
    Skipped,
}

impl StepOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, StepOutcome::Succeeded | StepOutcome::DryRun)
    }
}

/// Per-step record of a plan run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub task_name: String,
    pub outcome: StepOutcome,
}

/// Result of executing a whole plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutcome {
    /// The requested task
    pub task_name: String,
    pub steps: Vec<StepReport>,
    /// Index of the step that stopped the run
    pub failed_step: Option<usize>,
    /// Why the failing step could not be started, if it never ran
    pub reason: Option<String>,
    exit_code: i32,
}

impl PlanOutcome {
    /// 0 when every step succeeded, otherwise the failing step's code
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Whether steps were left unrun
    pub fn short_circuited(&self) -> bool {
        self.steps.iter().any(|s| s.outcome == StepOutcome::Skipped)
    }
}

/// Executes plans with a given runner and reporter
pub struct Executor<'a> {
    runner: &'a dyn StepRunner,
    reporter: &'a dyn Reporter,
    dry_run: bool,
}

impl<'a> Executor<'a> {
    pub fn new(runner: &'a dyn StepRunner, reporter: &'a dyn Reporter, dry_run: bool) -> Self {
        Executor {
            runner,
            reporter,
            dry_run,
        }
    }

    /// Run every step of `plan` in order, stopping at the first failure
    pub fn execute(&self, plan: ExecutionPlan) -> PlanOutcome {
        let task_name = plan.task_name().to_string();
        let steps = plan.into_steps();
        let total = steps.len();

        self.reporter.debug(
            &task_name,
            &format!(
                "Executing {} step(s){}",
                total,
                if self.dry_run { " (dry run)" } else { "" }
            ),
        );

        let mut reports = Vec::with_capacity(total);
        let mut failure: Option<(usize, i32)> = None;
        let mut reason = None;

        for (index, step) in steps.iter().enumerate() {
            if failure.is_some() {
                self.reporter
                    .verbose(&step.source_task_name, "Skipped (an earlier step failed)");
                reports.push(StepReport {
                    task_name: step.source_task_name.clone(),
                    outcome: StepOutcome::Skipped,
                });
                continue;
            }

            let (outcome, spawn_error) = self.run_step(step, index, total);
            if let StepOutcome::Failed(code) | StepOutcome::SpawnFailed(code) = outcome {
                failure = Some((index, code));
                reason = spawn_error;
                if index + 1 < total {
                    self.reporter.verbose(
                        &task_name,
                        &format!(
                            "Pipeline short-circuited at '{}' with exit code {}",
                            step.source_task_name, code
                        ),
                    );
                }
            }
            reports.push(StepReport {
                task_name: step.source_task_name.clone(),
                outcome,
            });
        }

        PlanOutcome {
            task_name,
            steps: reports,
            failed_step: failure.map(|(index, _)| index),
            reason,
            exit_code: failure.map_or(0, |(_, code)| code),
        }
    }

    /// Failures are only logged at verbose level here; the caller reports
    /// the run's failure once.
    fn run_step(
        &self,
        step: &AtomicStep,
        index: usize,
        total: usize,
    ) -> (StepOutcome, Option<String>) {
        let phase = step.source_task_name.as_str();

        if let Some(path) = &step.missing_venv {
            self.reporter.warn(
                phase,
                &format!("Venv not found at {}, executing without venv", path.display()),
            );
        }

        if self.dry_run {
            self.reporter.info(
                phase,
                &format!(
                    "Would run: {} (env={}, cwd={})",
                    step.display_command(),
                    step.display_env(),
                    step.resolved_cwd.display()
                ),
            );
            return (StepOutcome::DryRun, None);
        }

        if total > 1 {
            self.reporter.verbose(phase, &format!("Step {}/{}", index + 1, total));
        }
        self.reporter
            .info(phase, &format!("Running: {}", step.display_command()));
        self.reporter.debug(
            phase,
            &format!(
                "cwd={}, use_venv={}, {} environment variable(s)",
                step.resolved_cwd.display(),
                step.use_venv,
                step.resolved_env.len()
            ),
        );

        match self.runner.run(step) {
            Ok(()) => {
                self.reporter.verbose(phase, "Completed");
                (StepOutcome::Succeeded, None)
            }
            Err(err @ ExecutionError::CommandFailed(_)) => {
                let code = err.exit_code();
                self.reporter
                    .verbose(phase, &format!("Failed with exit code {}", code));
                (StepOutcome::Failed(code), None)
            }
            Err(err @ ExecutionError::Spawn { .. }) => {
                let message = err.to_string();
                self.reporter.verbose(phase, &message);
                (StepOutcome::SpawnFailed(err.exit_code()), Some(message))
            }
        }
    }
}

/// Execute `plan` with real processes and return the plan's exit code
pub fn execute(plan: ExecutionPlan, dry_run: bool, reporter: &dyn Reporter) -> i32 {
    Executor::new(&ProcessRunner, reporter, dry_run)
        .execute(plan)
        .exit_code()
}
