//! Execution context for task running
//!
//! The context carries the runtime flags resolved by the CLI before the
//! engine is invoked: project root, venv, verbosity and dry-run.

use crate::runner::{EnvMap, VenvInfo};
use crate::ui::Level;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

/// Settings shared by resolution and execution
#[derive(Debug, Clone)]
pub struct Context {
    /// Project root; step working directories are relative to it
    pub project_root: PathBuf,

    /// Project virtual environment, if one exists
    pub venv: Option<VenvInfo>,

    /// Where the project venv is expected, whether or not it exists
    pub venv_path: Option<PathBuf>,

    /// Environment of the invoking process, captured once
    pub ambient_env: EnvMap,

    /// Verbosity level
    pub verbosity: Verbosity,

    /// Log steps instead of spawning them
    pub dry_run: bool,
}

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Quiet = 0,
    #[default]
    Normal = 1,
    Verbose = 2,
    Debug = 3,
}

impl Verbosity {
    /// Map `-q` and the number of `-v` flags to a level. Quiet wins.
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, 0) => Verbosity::Normal,
            (false, 1) => Verbosity::Verbose,
            (false, _) => Verbosity::Debug,
        }
    }

    /// Whether an event at `level` is shown at this verbosity
    pub fn allows(self, level: Level) -> bool {
        match self {
            Verbosity::Quiet => level <= Level::Error,
            Verbosity::Normal => level <= Level::Info,
            Verbosity::Verbose => level <= Level::Verbose,
            Verbosity::Debug => true,
        }
    }
}

impl Context {
    /// Create a context rooted at the current directory with the ambient
    /// environment of this process
    pub fn new() -> Self {
        Context {
            project_root: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            venv: None,
            venv_path: None,
            ambient_env: capture_ambient_env(),
            verbosity: Verbosity::Normal,
            dry_run: false,
        }
    }

    /// Set the project root
    pub fn with_project_root(mut self, root: PathBuf) -> Self {
        self.project_root = root;
        self
    }

    /// Set the virtual environment
    pub fn with_venv(mut self, venv: Option<VenvInfo>) -> Self {
        self.venv = venv;
        self
    }

    /// Set the expected venv location, used to report a missing venv
    pub fn with_venv_path(mut self, path: PathBuf) -> Self {
        self.venv_path = Some(path);
        self
    }

    /// Replace the ambient environment
    pub fn with_ambient_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        self.ambient_env = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Enable or disable dry-run
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of this process's environment, byte for byte
pub fn capture_ambient_env() -> EnvMap {
    env::vars_os().collect()
}
