//! Process execution for atomic steps
//!
//! Steps are spawned directly from their argument vector; nothing is ever
//! passed through a shell.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::AtomicStep;
use std::io;
use std::process::{Command as StdCommand, ExitStatus, Stdio};

/// Runs one atomic step to completion
pub trait StepRunner {
    /// Block until the step's process exits. Exit code 0 is `Ok`.
    fn run(&self, step: &AtomicStep) -> ExecutionResult<()>;
}

/// Spawns real processes with inherited standard streams
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl StepRunner for ProcessRunner {
    fn run(&self, step: &AtomicStep) -> ExecutionResult<()> {
        let status = spawn_and_wait(step).map_err(|source| ExecutionError::Spawn {
            program: step.program().to_string(),
            source,
        })?;

        match exit_code(status) {
            0 => Ok(()),
            code => Err(ExecutionError::CommandFailed(code)),
        }
    }
}

fn spawn_and_wait(step: &AtomicStep) -> io::Result<ExitStatus> {
    let (program, args) = step
        .argv
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

    if !step.resolved_cwd.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!(
                "working directory '{}' does not exist",
                step.resolved_cwd.display()
            ),
        ));
    }

    let mut command = StdCommand::new(program);
    command.args(args);
    command.current_dir(&step.resolved_cwd);

    // The composed environment is the whole environment of the child.
    command.env_clear();
    command.envs(&step.resolved_env);

    command.stdin(Stdio::inherit());
    command.stdout(Stdio::inherit());
    command.stderr(Stdio::inherit());

    command.status()
}

/// Exit code of a finished process. On Unix a signal death maps to
/// `128 + signal`, the shell convention.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
