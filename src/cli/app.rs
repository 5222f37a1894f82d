//! Main CLI application

use crate::config::{build_registry, find_project_root_from, load_config, ConfigSource};
use crate::error::ConfigError;
use crate::runner::{Context, Engine, ProcessRunner, TaskRegistry, VenvInfo, Verbosity};
use crate::ui::{ConsoleReporter, Reporter};
use crate::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;

/// Phase used for events that do not belong to a task
const CLI_PHASE: &str = "devflow";

/// Global flags shared by every subcommand
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalOptions {
    /// Explicit config file
    pub config_path: Option<PathBuf>,
    /// Explicit project root
    pub project_root: Option<PathBuf>,
    pub verbosity: Verbosity,
    pub dry_run: bool,
}

/// CLI application
pub struct App {
    /// Where the configuration came from
    source: ConfigSource,
    /// Validated tasks
    registry: TaskRegistry,
    /// Runtime settings handed to the engine
    ctx: Context,
}

impl App {
    /// Discover the project, load its configuration and build the registry
    pub fn load(options: &GlobalOptions) -> Result<Self> {
        let project_root = locate_project_root(options)?;
        let (config, source) = load_config(&project_root, options.config_path.as_deref())?;
        let registry = build_registry(&config)?;

        let ctx = Context::new()
            .with_project_root(project_root.clone())
            .with_venv(VenvInfo::detect(&project_root, &config.venv_dir))
            .with_venv_path(project_root.join(&config.venv_dir))
            .with_verbosity(options.verbosity)
            .with_dry_run(options.dry_run);

        Ok(App {
            source,
            registry,
            ctx,
        })
    }

    /// Run a task with real processes and return its exit code
    pub fn run_task(&self, name: &str, reporter: &dyn Reporter) -> i32 {
        match self.source.path() {
            Some(path) => reporter.debug(CLI_PHASE, &format!("Config: {}", path.display())),
            None => reporter.debug(CLI_PHASE, "Config: defaults"),
        }
        match &self.ctx.venv {
            Some(venv) => reporter.debug(CLI_PHASE, &format!("Venv: {}", venv.root.display())),
            None => reporter.debug(CLI_PHASE, "Venv: none"),
        }

        Engine::new(&self.registry, &self.ctx, &ProcessRunner, reporter).run_task(name)
    }

    /// Print the task list
    pub fn list_tasks(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.registry.is_empty() {
            writeln!(out, "No tasks defined in configuration.")?;
            writeln!(
                out,
                "Define tasks in the [tool.devflow.tasks] section of pyproject.toml or in devflow.toml."
            )?;
            return Ok(());
        }

        let width = self.registry.names().map(str::len).max().unwrap_or(0);
        writeln!(out, "Available tasks:")?;
        for (name, task) in self.registry.iter() {
            writeln!(
                out,
                "  {:<width$}  {:<8}  {}",
                name,
                task.kind(),
                task.summary(),
                width = width
            )?;
        }
        Ok(())
    }
}

/// Explicit root, else the nearest marked directory, else the config file's
/// directory
fn locate_project_root(options: &GlobalOptions) -> Result<PathBuf> {
    if let Some(root) = &options.project_root {
        if !root.is_dir() {
            return Err(ConfigError::Invalid(format!(
                "Project root '{}' is not a directory",
                root.display()
            ))
            .into());
        }
        return Ok(root.clone());
    }

    let cwd = std::env::current_dir()?;
    match find_project_root_from(cwd) {
        Ok(root) => Ok(root),
        Err(err) => match options.config_path.as_ref().and_then(|p| p.parent()) {
            Some(parent) if parent.as_os_str().is_empty() => Ok(std::env::current_dir()?),
            Some(parent) => Ok(parent.to_path_buf()),
            None => Err(err.into()),
        },
    }
}

/// Build the clap command
pub fn build_command() -> Command {
    Command::new("devflow")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run named project tasks and pipelines")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Path to config file")
                .global(true),
        )
        .arg(
            Arg::new("project-root")
                .long("project-root")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Project root directory")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase verbosity (can be repeated)")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .help("Show what would be run without running it")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("task")
                .about("Run a task defined in project configuration")
                .arg(
                    Arg::new("name")
                        .value_name("NAME")
                        .help("Task to run"),
                )
                .arg(
                    Arg::new("list")
                        .short('l')
                        .long("list")
                        .help("List available tasks")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("completion")
                .about("Print a shell completion script")
                .arg(
                    Arg::new("shell")
                        .value_name("SHELL")
                        .required(true)
                        .value_parser(value_parser!(Shell)),
                ),
        )
}

/// Collect global flags. They may appear before or after the subcommand, so
/// every level of matches is consulted.
fn global_options(levels: &[&ArgMatches]) -> GlobalOptions {
    let verbose = levels.iter().map(|m| m.get_count("verbose")).max().unwrap_or(0);
    let quiet = levels.iter().any(|m| m.get_flag("quiet"));

    GlobalOptions {
        config_path: levels
            .iter()
            .rev()
            .find_map(|m| m.get_one::<PathBuf>("config").cloned()),
        project_root: levels
            .iter()
            .rev()
            .find_map(|m| m.get_one::<PathBuf>("project-root").cloned()),
        verbosity: Verbosity::from_flags(verbose, quiet),
        dry_run: levels.iter().any(|m| m.get_flag("dry-run")),
    }
}

/// Run the CLI application with the process arguments
pub fn run() -> i32 {
    run_from(std::env::args_os())
}

/// Run the CLI application with explicit arguments and return the exit code
pub fn run_from<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = match build_command().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(e) => {
            let _ = e.print();
            return e.exit_code();
        }
    };

    match matches.subcommand() {
        Some(("task", sub)) => {
            let options = global_options(&[&matches, sub]);
            run_task_command(&options, sub)
        }
        Some(("completion", sub)) => {
            if let Some(shell) = sub.get_one::<Shell>("shell").copied() {
                clap_complete::generate(shell, &mut build_command(), "devflow", &mut io::stdout());
            }
            0
        }
        _ => {
            let _ = build_command().print_help();
            println!();
            0
        }
    }
}

fn run_task_command(options: &GlobalOptions, matches: &ArgMatches) -> i32 {
    let app = match App::load(options) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {}", e);
            return e.exit_code();
        }
    };

    match matches.get_one::<String>("name") {
        Some(name) if !matches.get_flag("list") => {
            let reporter = ConsoleReporter::new(options.verbosity);
            app.run_task(name, &reporter)
        }
        _ => match app.list_tasks(&mut io::stdout().lock()) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
    }
}
