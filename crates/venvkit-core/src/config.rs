use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::constants::*;
use crate::index::IndexOptions;
use crate::tool::ToolRunner;

/// Usage errors raised while turning options into a [`Config`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("a virtualenv is already active ({0}); deactivate it first")]
    AlreadyActive(String),
    #[error("project path must not be empty")]
    EmptyProject,
    #[error("project path must not be the filesystem root")]
    RootProject,
    #[error("project path '{0}' is not an existing directory")]
    NotADirectory(PathBuf),
    #[error("environment name must not be empty")]
    EmptyName,
    #[error("environment name '{0}' must not contain a path separator")]
    NameHasSeparator(String),
    #[error("interpreter '{0}' not found")]
    InterpreterNotFound(String),
    #[error("virtualenv executable '{0}' not found")]
    VirtualenvNotFound(String),
    #[error("virtualenvwrapper script '{0}' does not exist")]
    WrapperNotFound(PathBuf),
}

/// Snapshot of the calling environment, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnv {
    pub cwd: PathBuf,
    /// Value of `VIRTUAL_ENV` when a sandbox is active in the calling shell.
    pub virtual_env: Option<String>,
    pub workon_home: PathBuf,
    /// Whether the shell has been initialised by pyenv.
    pub pyenv_shell: bool,
    /// Lowercased kernel name, as used in `<os>-requirements.txt`.
    pub os_name: String,
    pub settings_path: Option<PathBuf>,
}

impl HostEnv {
    pub fn capture() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to read current directory")?;
        let workon_home = match std::env::var_os("WORKON_HOME").filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .context("cannot determine home directory for WORKON_HOME")?
                .join(DEFAULT_WORKON_DIR),
        };
        let settings_path = std::env::var_os(SETTINGS_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|d| d.join(SETTINGS_DIR).join(SETTINGS_FILE)));

        Ok(Self {
            cwd,
            virtual_env: std::env::var("VIRTUAL_ENV").ok().filter(|v| !v.is_empty()),
            workon_home,
            pyenv_shell: std::env::var_os("PYENV_SHELL").is_some(),
            os_name: os_name(),
            settings_path,
        })
    }
}

/// Lowercased kernel name of the running system.
pub fn os_name() -> String {
    match std::env::consts::OS {
        "macos" => "darwin".to_string(),
        other => other.to_lowercase(),
    }
}

/// Defaults read from the optional settings file.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub environment: EnvironmentSettings,
    #[serde(default)]
    pub index: IndexOptions,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnvironmentSettings {
    pub python: Option<String>,
    pub virtualenv: Option<String>,
    pub virtualenvwrapper: Option<PathBuf>,
    #[serde(default)]
    pub system_site_packages: bool,
}

impl Settings {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file: {}", path.display()))?;
        let settings = toml::from_str::<Self>(&text)
            .with_context(|| format!("failed to parse TOML settings: {}", path.display()))?;
        Ok(settings)
    }

    /// Loads settings from `path`, treating an absent file as empty settings.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.is_file() => Self::load_from_file(path),
            Some(path) => {
                debug!("no settings file at {}", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }
}

/// Unvalidated option values as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct RawOptions {
    pub project: Option<PathBuf>,
    pub extra_projects: Vec<PathBuf>,
    pub name: Option<String>,
    pub force: bool,
    pub python: Option<String>,
    pub virtualenv: Option<String>,
    pub virtualenvwrapper: Option<PathBuf>,
    pub system_site_packages: bool,
    pub index: IndexOptions,
}

impl RawOptions {
    /// Fills unset options from `settings`; explicit options win.
    pub fn with_settings(self, settings: &Settings) -> Self {
        let env = &settings.environment;
        Self {
            python: self.python.or_else(|| env.python.clone()),
            virtualenv: self.virtualenv.or_else(|| env.virtualenv.clone()),
            virtualenvwrapper: self
                .virtualenvwrapper
                .or_else(|| env.virtualenvwrapper.clone()),
            system_site_packages: self.system_site_packages || env.system_site_packages,
            index: settings.index.merged_with(&self.index),
            ..self
        }
    }
}

/// Validated, immutable run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub project: PathBuf,
    pub name: String,
    pub extra_projects: Vec<PathBuf>,
    pub python: PathBuf,
    pub virtualenv: Option<PathBuf>,
    pub virtualenvwrapper: Option<PathBuf>,
    pub force: bool,
    pub system_site_packages: bool,
    pub index: IndexOptions,
    pub host: HostEnv,
}

impl Config {
    pub fn resolve(
        raw: RawOptions,
        host: HostEnv,
        runner: &dyn ToolRunner,
    ) -> Result<Self, ConfigError> {
        if let Some(active) = &host.virtual_env {
            return Err(ConfigError::AlreadyActive(active.clone()));
        }

        let project = resolve_project_dir(raw.project.as_deref().unwrap_or(&host.cwd), &host.cwd)?;

        let name = match raw.name {
            Some(name) => name,
            None => project
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        validate_name(&name)?;

        let extra_projects = raw
            .extra_projects
            .iter()
            .map(|path| resolve_project_dir(path, &host.cwd))
            .collect::<Result<Vec<_>, _>>()?;

        let python_text = raw.python.as_deref().unwrap_or(DEFAULT_PYTHON);
        let python = resolve_program(python_text, &host.cwd, runner)
            .ok_or_else(|| ConfigError::InterpreterNotFound(python_text.to_string()))?;

        let virtualenv = match raw.virtualenv.as_deref() {
            Some(text) => Some(
                resolve_program(text, &host.cwd, runner)
                    .ok_or_else(|| ConfigError::VirtualenvNotFound(text.to_string()))?,
            ),
            None => None,
        };

        let virtualenvwrapper = match raw.virtualenvwrapper {
            Some(path) => {
                let path = host.cwd.join(path);
                if !path.is_file() {
                    return Err(ConfigError::WrapperNotFound(path));
                }
                Some(path)
            }
            None => None,
        };

        debug!("resolved project {} as environment '{}'", project.display(), name);

        Ok(Self {
            project,
            name,
            extra_projects,
            python,
            virtualenv,
            virtualenvwrapper,
            force: raw.force,
            system_site_packages: raw.system_site_packages,
            index: raw.index,
            host,
        })
    }

    /// Directory the sandbox lives in once created.
    pub fn sandbox_root(&self) -> PathBuf {
        self.host.workon_home.join(&self.name)
    }
}

fn resolve_project_dir(path: &Path, cwd: &Path) -> Result<PathBuf, ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::EmptyProject);
    }
    let joined = cwd.join(path);
    if !joined.is_dir() {
        return Err(ConfigError::NotADirectory(path.to_path_buf()));
    }
    let canonical = joined
        .canonicalize()
        .map_err(|_| ConfigError::NotADirectory(path.to_path_buf()))?;
    if canonical.parent().is_none() {
        return Err(ConfigError::RootProject);
    }
    Ok(canonical)
}

fn validate_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::EmptyName);
    }
    if name.contains('/') || name.contains(MAIN_SEPARATOR) {
        return Err(ConfigError::NameHasSeparator(name.to_string()));
    }
    Ok(())
}

// Values containing a separator are paths; bare names are looked up on PATH.
fn resolve_program(text: &str, cwd: &Path, runner: &dyn ToolRunner) -> Option<PathBuf> {
    if text.is_empty() {
        return None;
    }
    if text.contains('/') || text.contains(MAIN_SEPARATOR) {
        let path = cwd.join(text);
        return path.is_file().then_some(path);
    }
    runner.locate(text)
}
