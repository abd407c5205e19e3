use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tracing::debug;

use crate::config::Config;
use crate::constants::{WRAPPER_FALLBACK, WRAPPER_SCRIPT};
use crate::provision::ProvisionError;
use crate::tool::{Invocation, ToolRunner};

/// The facility that provides the `mkvirtualenv` family of shell functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvManager {
    /// pyenv with its virtualenvwrapper plugin.
    Pyenv { pyenv: PathBuf },
    /// A sourced `virtualenvwrapper.sh`.
    Script { script: PathBuf },
}

impl EnvManager {
    /// Picks the environment manager for this run.
    ///
    /// An explicit wrapper script wins, then an active pyenv shell, then
    /// `virtualenvwrapper.sh` on PATH and finally the distribution fallback
    /// location outside macOS.
    pub fn detect(config: &Config, runner: &dyn ToolRunner) -> Result<Self, ProvisionError> {
        let fallback = (config.host.os_name != "darwin").then(|| PathBuf::from(WRAPPER_FALLBACK));
        Self::detect_with_fallback(config, runner, fallback.as_deref())
    }

    fn detect_with_fallback(
        config: &Config,
        runner: &dyn ToolRunner,
        fallback: Option<&Path>,
    ) -> Result<Self, ProvisionError> {
        if let Some(script) = &config.virtualenvwrapper {
            return Ok(Self::Script {
                script: script.clone(),
            });
        }

        if config.host.pyenv_shell {
            if let Some(pyenv) = runner.locate("pyenv") {
                debug!("using pyenv virtualenvwrapper plugin via {}", pyenv.display());
                return Ok(Self::Pyenv { pyenv });
            }
            debug!("PYENV_SHELL is set but pyenv is not on PATH");
        }

        if let Some(script) = runner.locate(WRAPPER_SCRIPT) {
            return Ok(Self::Script { script });
        }

        match fallback {
            Some(path) if path.is_file() => Ok(Self::Script {
                script: path.to_path_buf(),
            }),
            _ => Err(ProvisionError::WrapperMissing),
        }
    }

    fn prelude(&self) -> Result<String> {
        Ok(match self {
            Self::Pyenv { pyenv } => {
                let pyenv = quote(&pyenv.to_string_lossy())?;
                // The plugin is an `sh-` subcommand, only reachable through the
                // `pyenv` shell function that `init -` defines.
                format!("eval \"$({pyenv} init -)\" && pyenv virtualenvwrapper")
            }
            Self::Script { script } => format!("source {}", quote(&script.to_string_lossy())?),
        })
    }
}

/// Builds shell invocations that run wrapper functions with explicit settings.
#[derive(Debug, Clone)]
pub struct WrapperSession {
    manager: EnvManager,
    env: BTreeMap<String, String>,
}

impl WrapperSession {
    pub fn new(manager: EnvManager, config: &Config) -> Self {
        let mut env = BTreeMap::new();
        env.insert(
            "WORKON_HOME".to_string(),
            config.host.workon_home.to_string_lossy().into_owned(),
        );
        if let Some(virtualenv) = &config.virtualenv {
            env.insert(
                "VIRTUALENVWRAPPER_VIRTUALENV".to_string(),
                virtualenv.to_string_lossy().into_owned(),
            );
        }
        Self { manager, env }
    }

    /// A `bash -c` invocation that loads the wrapper and calls `function`.
    pub fn invocation(&self, function: &str, args: &[String]) -> Result<Invocation> {
        let mut script = self.manager.prelude()?;
        script.push_str(" && ");
        script.push_str(function);
        for arg in args {
            script.push(' ');
            script.push_str(&quote(arg)?);
        }

        let mut invocation = Invocation::new("bash").args(["-c".to_string(), script]);
        for (key, value) in &self.env {
            invocation = invocation.env(key.clone(), value.clone());
        }
        Ok(invocation)
    }
}

fn quote(value: &str) -> Result<String> {
    shlex::try_quote(value)
        .map(|q| q.into_owned())
        .map_err(|e| anyhow!("cannot quote shell argument {value:?}: {e}"))
}
