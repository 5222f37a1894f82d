//! Configuration file discovery and parsing

use crate::config::types::DevflowConfig;
use crate::error::{ConfigError, ConfigResult};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// File names that mark a project root
pub const PROJECT_MARKERS: &[&str] = &["pyproject.toml", "devflow.toml"];

/// Python project metadata file
pub const PYPROJECT_FILE: &str = "pyproject.toml";

/// Standalone devflow configuration file
pub const DEVFLOW_FILE: &str = "devflow.toml";

/// Where the configuration was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A file named on the command line
    Explicit(PathBuf),
    /// `[tool.devflow]` in `pyproject.toml`
    PyProject(PathBuf),
    /// `devflow.toml`
    DevflowToml(PathBuf),
    /// No file found; built-in defaults
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Explicit(p) | ConfigSource::PyProject(p) | ConfigSource::DevflowToml(p) => {
                Some(p)
            }
            ConfigSource::Defaults => None,
        }
    }
}

/// Find the project root by searching the current and parent directories
pub fn find_project_root() -> ConfigResult<PathBuf> {
    find_project_root_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the project root starting from a specific directory
pub fn find_project_root_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let start_dir = start_dir.canonicalize().unwrap_or(start_dir);
    let mut current_dir = start_dir.clone();

    loop {
        if PROJECT_MARKERS
            .iter()
            .any(|marker| current_dir.join(marker).is_file())
        {
            return Ok(current_dir);
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::ProjectRootNotFound(start_dir)),
        }
    }
}

/// Load configuration for `project_root`.
///
/// Discovery order: `explicit` file; `[tool.devflow]` in `pyproject.toml`;
/// `devflow.toml`; built-in defaults.
pub fn load_config(
    project_root: &Path,
    explicit: Option<&Path>,
) -> ConfigResult<(DevflowConfig, ConfigSource)> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let config = parse_config_file(path)?;
        return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
    }

    let pyproject = project_root.join(PYPROJECT_FILE);
    if pyproject.is_file() {
        let table = read_table(&pyproject)?;
        if let Some(section) = tool_section(&table) {
            let config = config_from_table(section.clone(), &pyproject)?;
            return Ok((config, ConfigSource::PyProject(pyproject)));
        }
    }

    let devflow_toml = project_root.join(DEVFLOW_FILE);
    if devflow_toml.is_file() {
        let config = parse_config_file(&devflow_toml)?;
        return Ok((config, ConfigSource::DevflowToml(devflow_toml)));
    }

    Ok((DevflowConfig::default(), ConfigSource::Defaults))
}

/// Parse a configuration file from a path.
///
/// Accepts a `[tool.devflow]` table, a `[devflow]` table, or root-level keys.
pub fn parse_config_file(path: &Path) -> ConfigResult<DevflowConfig> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    parse_config(&contents, path)
}

/// Parse configuration from a string; `path` is only used in error messages
pub fn parse_config(contents: &str, path: &Path) -> ConfigResult<DevflowConfig> {
    let table: toml::Table = toml::from_str(contents).map_err(|e| parse_error(path, e))?;

    let section = tool_section(&table)
        .or_else(|| table.get("devflow").and_then(toml::Value::as_table))
        .cloned()
        .unwrap_or(table);

    config_from_table(section, path)
}

fn read_table(path: &Path) -> ConfigResult<toml::Table> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    toml::from_str(&contents).map_err(|e| parse_error(path, e))
}

fn tool_section(table: &toml::Table) -> Option<&toml::Table> {
    table
        .get("tool")
        .and_then(|tool| tool.get("devflow"))
        .and_then(toml::Value::as_table)
}

fn config_from_table(table: toml::Table, path: &Path) -> ConfigResult<DevflowConfig> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|e| parse_error(path, e))
}

fn parse_error(path: &Path, error: impl std::fmt::Display) -> ConfigError {
    ConfigError::Parse {
        path: path.to_path_buf(),
        error: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandLine;
    use tempfile::TempDir;

    const TASKS: &str = r#"
[tasks.lint]
command = "ruff"
args = ["check", "."]
"#;

    #[test]
    fn test_parse_root_level_config() {
        let config = parse_config(TASKS, Path::new("devflow.toml")).unwrap();
        assert_eq!(config.tasks.len(), 1);
        assert!(config.tasks.contains_key("lint"));
    }

    #[test]
    fn test_parse_tool_devflow_section() {
        let toml = r#"
[project]
name = "demo"

[tool.devflow]
venv_dir = "venv"

[tool.devflow.tasks.test]
command = "pytest"
"#;
        let config = parse_config(toml, Path::new("pyproject.toml")).unwrap();
        assert_eq!(config.venv_dir, "venv");
        assert_eq!(
            config.tasks["test"].command,
            Some(CommandLine::Program("pytest".to_string()))
        );
    }

    #[test]
    fn test_parse_devflow_section() {
        let toml = r#"
[devflow.tasks.test]
command = "pytest"
"#;
        let config = parse_config(toml, Path::new("devflow.toml")).unwrap();
        assert!(config.tasks.contains_key("test"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = parse_config("tasks = [", Path::new("broken.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_find_project_root_in_current_dir() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("devflow.toml"), TASKS).unwrap();

        let root = find_project_root_from(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(root, temp_dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_find_project_root_in_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("pyproject.toml"), "[project]\nname = \"x\"\n").unwrap();
        let sub_dir = temp_dir.path().join("src").join("pkg");
        fs::create_dir_all(&sub_dir).unwrap();

        let root = find_project_root_from(sub_dir).unwrap();
        assert_eq!(root, temp_dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_load_prefers_pyproject_section() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("pyproject.toml"),
            "[tool.devflow.tasks.test]\ncommand = \"pytest\"\n",
        )
        .unwrap();
        fs::write(temp_dir.path().join("devflow.toml"), TASKS).unwrap();

        let (config, source) = load_config(temp_dir.path(), None).unwrap();
        assert!(config.tasks.contains_key("test"));
        assert!(matches!(source, ConfigSource::PyProject(_)));
    }

    #[test]
    fn test_load_falls_back_to_devflow_toml() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("pyproject.toml"), "[project]\nname = \"x\"\n").unwrap();
        fs::write(temp_dir.path().join("devflow.toml"), TASKS).unwrap();

        let (config, source) = load_config(temp_dir.path(), None).unwrap();
        assert!(config.tasks.contains_key("lint"));
        assert_eq!(
            source.path(),
            Some(temp_dir.path().join("devflow.toml").as_path())
        );
    }

    #[test]
    fn test_load_defaults_without_files() {
        let temp_dir = TempDir::new().unwrap();
        let (config, source) = load_config(temp_dir.path(), None).unwrap();
        assert_eq!(config, DevflowConfig::default());
        assert_eq!(source, ConfigSource::Defaults);
    }

    #[test]
    fn test_load_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ci.toml");
        fs::write(&path, TASKS).unwrap();

        let (config, source) = load_config(temp_dir.path(), Some(&path)).unwrap();
        assert!(config.tasks.contains_key("lint"));
        assert_eq!(source, ConfigSource::Explicit(path));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.toml");
        let result = load_config(temp_dir.path(), Some(&path));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
