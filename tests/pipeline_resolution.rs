//! Integration tests for pipeline resolution and the run engine

mod common;

use common::{registry_from, RecordingRunner};
use devflow::error::ResolveError;
use devflow::runner::{lookup, resolve, Context, Engine, RunState, StepOutcome, VenvInfo};
use devflow::ui::{Level, MemoryReporter};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;

const PROJECT: &str = r#"
[tasks.lint]
command = "ruff"
args = ["check", "."]

[tasks.types]
command = "mypy"

[tasks.test]
command = "pytest"

[tasks.check]
pipeline = ["lint", "types"]

[tasks.ci]
pipeline = ["check", "test"]
"#;

fn context() -> Context {
    Context::new()
        .with_project_root(PathBuf::from("/project"))
        .with_ambient_env(BTreeMap::from([("PATH".to_string(), "/usr/bin".to_string())]))
}

fn sources(plan: &devflow::runner::ExecutionPlan) -> Vec<&str> {
    plan.steps()
        .iter()
        .map(|s| s.source_task_name.as_str())
        .collect()
}

#[test]
fn test_nested_pipeline_order() {
    let registry = registry_from(PROJECT);
    let plan = resolve("ci", &registry, &context()).unwrap();

    assert_eq!(plan.task_name(), "ci");
    assert_eq!(sources(&plan), vec!["lint", "types", "test"]);
    assert_eq!(plan.steps()[0].argv, vec!["ruff", "check", "."]);
}

#[test]
fn test_command_task_is_a_single_step() {
    let registry = registry_from(PROJECT);
    let plan = resolve("test", &registry, &context()).unwrap();

    assert_eq!(plan.len(), 1);
    assert_eq!(plan.steps()[0].resolved_cwd, PathBuf::from("/project"));
}

#[test]
fn test_cycle_reports_full_chain() {
    let registry = registry_from(
        r#"
[tasks.a]
pipeline = ["b"]

[tasks.b]
pipeline = ["c"]

[tasks.c]
pipeline = ["a"]
"#,
    );

    let err = resolve("a", &registry, &context()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cycle detected in pipeline: a -> b -> c -> a"
    );
    assert_eq!(err.cycle().unwrap().len(), 4);
}

#[test]
fn test_missing_step_suggests_close_names() {
    let registry = registry_from(
        r#"
[tasks.test]
command = "pytest"

[tasks.ci]
pipeline = ["tets"]
"#,
    );

    let err = resolve("ci", &registry, &context()).unwrap_err();
    match &err {
        ResolveError::TaskNotFound {
            name, suggestions, ..
        } => {
            assert_eq!(name, "tets");
            assert_eq!(suggestions, &vec!["test".to_string()]);
        }
        other => panic!("expected a missing task, got {:?}", other),
    }
    assert!(err.to_string().contains("Did you mean: test?"));
}

#[test]
fn test_diamond_runs_shared_task_twice() {
    let registry = registry_from(
        r#"
[tasks.setup]
command = "make"

[tasks.left]
pipeline = ["setup"]

[tasks.right]
pipeline = ["setup"]

[tasks.all]
pipeline = ["left", "right"]
"#,
    );

    let plan = resolve("all", &registry, &context()).unwrap();
    assert_eq!(sources(&plan), vec!["setup", "setup"]);
    assert_eq!(plan.repeated_tasks(), vec!["setup"]);
}

#[cfg(unix)]
#[test]
fn test_environment_precedence_with_venv() {
    let dir = tempfile::TempDir::new().unwrap();
    let bin = dir.path().join(".venv").join("bin");
    fs::create_dir_all(&bin).unwrap();
    fs::write(bin.join("pytest"), "").unwrap();

    let registry = registry_from(
        r#"
[tasks.test]
command = "pytest"
working_dir = "tests"
env = { VIRTUAL_ENV = "override", MODE = "task" }
"#,
    );
    let ctx = Context::new()
        .with_project_root(dir.path().to_path_buf())
        .with_venv(VenvInfo::detect(dir.path(), ".venv"))
        .with_ambient_env(BTreeMap::from([
            ("PATH".to_string(), "/usr/bin".to_string()),
            ("PYTHONHOME".to_string(), "/opt/python".to_string()),
            ("MODE".to_string(), "ambient".to_string()),
        ]));

    let plan = resolve("test", &registry, &ctx).unwrap();
    let step = &plan.steps()[0];

    let env = &step.resolved_env;
    assert_eq!(lookup(env, "MODE"), Some(OsStr::new("task")));
    assert_eq!(lookup(env, "VIRTUAL_ENV"), Some(OsStr::new("override")));
    assert_eq!(lookup(env, "PYTHONHOME"), None);
    assert_eq!(
        lookup(env, "PATH"),
        Some(OsStr::new(&format!("{}:/usr/bin", bin.display())))
    );
    assert_eq!(step.missing_venv, None);
    assert_eq!(step.argv[0], bin.join("pytest").display().to_string());
    assert_eq!(step.resolved_cwd, dir.path().join("tests"));
}

#[test]
fn test_engine_short_circuits_on_failure() {
    let registry = registry_from(PROJECT);
    let ctx = context();
    let runner = RecordingRunner::new().failing("types", 3);
    let reporter = MemoryReporter::new();

    let run = Engine::new(&registry, &ctx, &runner, &reporter).run("ci");

    assert_eq!(run.exit_code, 3);
    assert_eq!(run.state, RunState::Failed { step: 1 });
    assert_eq!(runner.spawned(), vec!["lint", "types"]);

    let outcome = run.outcome.unwrap();
    assert_eq!(outcome.steps[2].outcome, StepOutcome::Skipped);
    assert!(reporter.contains("Failed at step 2/3 ('types') with exit code 3"));
}

#[test]
fn test_engine_reports_one_error_per_failed_run() {
    let registry = registry_from(PROJECT);
    let ctx = context();
    let reporter = MemoryReporter::new();

    let failing = RecordingRunner::new().failing("types", 3);
    Engine::new(&registry, &ctx, &failing, &reporter).run("ci");
    let missing = RecordingRunner::new().failing("lint", 127);
    Engine::new(&registry, &ctx, &missing, &reporter).run("ci");

    let errors: Vec<String> = reporter
        .events()
        .into_iter()
        .filter(|e| e.level == Level::Error)
        .map(|e| e.message)
        .collect();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0], "Failed at step 2/3 ('types') with exit code 3");
    assert!(errors[1].starts_with("Failed at step 1/3 ('lint') with exit code 127: "));
}

#[test]
fn test_engine_warns_when_venv_is_missing() {
    let registry = registry_from(PROJECT);
    let ctx = context().with_venv_path(PathBuf::from("/project/.venv"));
    let runner = RecordingRunner::new();
    let reporter = MemoryReporter::new();

    let code = Engine::new(&registry, &ctx, &runner, &reporter).run_task("test");

    assert_eq!(code, 0);
    let warnings: Vec<String> = reporter
        .events()
        .into_iter()
        .filter(|e| e.level == Level::Warn)
        .map(|e| format!("[{}] {}", e.phase, e.message))
        .collect();
    assert_eq!(
        warnings,
        vec!["[test] Venv not found at /project/.venv, executing without venv"]
    );
}

#[test]
fn test_engine_missing_program_exit_code() {
    let registry = registry_from(PROJECT);
    let ctx = context();
    let runner = RecordingRunner::new().failing("lint", 127);
    let reporter = MemoryReporter::new();

    let code = Engine::new(&registry, &ctx, &runner, &reporter).run_task("check");

    assert_eq!(code, 127);
    assert_eq!(runner.spawned(), vec!["lint"]);
}

#[test]
fn test_engine_spawns_nothing_when_resolution_fails() {
    let registry = registry_from(
        r#"
[tasks.first]
command = "echo"

[tasks.ci]
pipeline = ["first", "missing"]
"#,
    );
    let ctx = context();
    let runner = RecordingRunner::new();
    let reporter = MemoryReporter::new();

    let run = Engine::new(&registry, &ctx, &runner, &reporter).run("ci");

    assert_eq!(run.exit_code, 1);
    assert_eq!(run.state, RunState::ResolutionFailed);
    assert!(runner.spawned().is_empty());
    assert!(reporter.contains("Task 'missing' not found"));
}

#[test]
fn test_engine_dry_run_spawns_nothing() {
    let registry = registry_from(
        r#"
[tasks.test]
command = "pytest"
env = { CI = "1" }
"#,
    );
    let ctx = context().with_dry_run(true);
    let runner = RecordingRunner::new();
    let reporter = MemoryReporter::new();

    let code = Engine::new(&registry, &ctx, &runner, &reporter).run_task("test");

    assert_eq!(code, 0);
    assert!(runner.spawned().is_empty());
    assert!(reporter.contains("Would run: pytest (env={CI=1}, cwd=/project)"));
}

#[test]
fn test_engine_empty_pipeline_succeeds() {
    let registry = registry_from("[tasks.noop]\npipeline = []\n");
    let ctx = context();
    let runner = RecordingRunner::new();
    let reporter = MemoryReporter::new();

    let run = Engine::new(&registry, &ctx, &runner, &reporter).run("noop");

    assert_eq!(run.exit_code, 0);
    assert_eq!(run.state, RunState::Succeeded);
    assert!(runner.spawned().is_empty());
}
