//! Environment composition for command steps
//!
//! Builds the exact environment and working directory a step's process gets.
//! Nothing here touches the environment of the running process. Names and
//! values are kept as OS strings so variables that are not valid Unicode
//! still reach the child.

use crate::runner::CommandTask;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// A complete process environment
pub type EnvMap = BTreeMap<OsString, OsString>;

/// Variable that holds the executable search path
pub const PATH_VAR: &str = "PATH";

/// Variable that marks an active virtual environment
pub const VENV_MARKER_VAR: &str = "VIRTUAL_ENV";

/// Variable removed when a venv is active; it breaks interpreter lookup
pub const PYTHONHOME_VAR: &str = "PYTHONHOME";

/// Interpreter names that stand in for each other inside a venv
const PYTHON_NAMES: &[&str] = &["python", "python3"];

#[cfg(windows)]
const PATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const PATH_SEPARATOR: &str = ":";

#[cfg(windows)]
const VENV_BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
const VENV_BIN_DIR: &str = "bin";

/// Location of a project virtual environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenvInfo {
    /// Venv root directory
    pub root: PathBuf,

    /// Directory holding the venv's executables
    pub bin_dir: PathBuf,
}

impl VenvInfo {
    /// Venv rooted at `root`, with the platform's executable directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let bin_dir = root.join(VENV_BIN_DIR);
        VenvInfo { root, bin_dir }
    }

    /// The venv at `project_root/venv_dir`, if that directory exists
    pub fn detect(project_root: &Path, venv_dir: &str) -> Option<Self> {
        let root = project_root.join(venv_dir);
        root.is_dir().then(|| VenvInfo::new(root))
    }

    /// Full path of `program` inside the venv, if it is installed there.
    ///
    /// `python` and `python3` fall back to each other, since a venv does not
    /// always provide both (Windows venvs only ship `python.exe`).
    pub fn find_executable(&self, program: &str) -> Option<PathBuf> {
        // Only bare names are looked up; explicit paths are used as written.
        if program.is_empty() || Path::new(program).components().count() != 1 {
            return None;
        }

        let mut names = vec![program];
        if PYTHON_NAMES.contains(&program) {
            names.extend(PYTHON_NAMES.iter().copied().filter(|n| *n != program));
        }

        names
            .into_iter()
            .flat_map(executable_candidates)
            .map(|name| self.bin_dir.join(name))
            .find(|path| path.is_file())
    }
}

#[cfg(windows)]
fn executable_candidates(program: &str) -> Vec<String> {
    vec![
        format!("{}.exe", program),
        format!("{}.cmd", program),
        program.to_string(),
    ]
}

#[cfg(not(windows))]
fn executable_candidates(program: &str) -> Vec<String> {
    vec![program.to_string()]
}

/// Key under which `name` is stored in `env`. Variable names are
/// case-insensitive on Windows, so an inherited `Path` is found for `PATH`.
#[cfg(windows)]
pub fn env_key(env: &EnvMap, name: &str) -> OsString {
    env.keys()
        .find(|key| key.to_str().is_some_and(|k| k.eq_ignore_ascii_case(name)))
        .cloned()
        .unwrap_or_else(|| OsString::from(name))
}

/// Key under which `name` is stored in `env`
#[cfg(not(windows))]
pub fn env_key(_env: &EnvMap, name: &str) -> OsString {
    OsString::from(name)
}

/// Value of `name` in `env`
pub fn lookup<'a>(env: &'a EnvMap, name: &str) -> Option<&'a OsStr> {
    env.get(&env_key(env, name)).map(OsString::as_os_str)
}

/// Final environment and working directory of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedEnv {
    pub env: EnvMap,
    pub cwd: PathBuf,
}

/// Compose a step's environment.
///
/// Precedence, lowest first: `ambient`, the venv overlay (when the task uses
/// the venv and one exists), then the task's own `env`.
pub fn compose(
    task: &CommandTask,
    project_root: &Path,
    venv: Option<&VenvInfo>,
    ambient: &EnvMap,
) -> ComposedEnv {
    let mut env = ambient.clone();

    if let (true, Some(venv)) = (task.use_venv, venv) {
        apply_venv_overlay(&mut env, venv);
    }

    for (name, value) in &task.env {
        let key = env_key(&env, name);
        env.insert(key, OsString::from(value));
    }

    let cwd = match &task.working_dir {
        Some(dir) => project_root.join(dir),
        None => project_root.to_path_buf(),
    };

    ComposedEnv { env, cwd }
}

/// Activate `venv` in `env`: prepend its executable directory to the search
/// path and set the venv marker
pub fn apply_venv_overlay(env: &mut EnvMap, venv: &VenvInfo) {
    let path_key = env_key(env, PATH_VAR);
    let mut path = venv.bin_dir.clone().into_os_string();
    if let Some(existing) = env.get(&path_key).filter(|p| !p.is_empty()) {
        path.push(PATH_SEPARATOR);
        path.push(existing);
    }
    env.insert(path_key, path);

    let marker_key = env_key(env, VENV_MARKER_VAR);
    env.insert(marker_key, venv.root.clone().into_os_string());

    let home_key = env_key(env, PYTHONHOME_VAR);
    env.remove(&home_key);
}

/// Argument vector actually spawned for a task.
///
/// Venv-aware tasks whose program is installed in the venv get the absolute
/// path to it; everything else is left untouched.
pub fn resolve_argv(task: &CommandTask, venv: Option<&VenvInfo>) -> Vec<String> {
    let mut argv = task.argv.clone();
    if !task.use_venv {
        return argv;
    }
    if let Some(first) = argv.first_mut() {
        if let Some(path) = venv.and_then(|v| v.find_executable(first)) {
            *first = path.display().to_string();
        }
    }
    argv
}
