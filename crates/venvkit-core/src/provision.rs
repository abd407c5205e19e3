use anyhow::Result;
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::Config;
use crate::sandbox::Sandbox;
use crate::tool::ToolRunner;
use crate::wrapper::{EnvManager, WrapperSession};

/// Environment errors raised while preparing the sandbox.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("virtualenvwrapper not found; install it or pass --virtualenvwrapper")]
    WrapperMissing,
    #[error("virtualenv '{0}' already exists; pass --force to replace it")]
    AlreadyExists(String),
    #[error("failed to list virtualenvs: {0}")]
    ListFailed(String),
    #[error("failed to remove virtualenv '{name}': {detail}")]
    RemoveFailed { name: String, detail: String },
    #[error("failed to create virtualenv '{name}': {detail}")]
    CreateFailed { name: String, detail: String },
}

/// Creates the sandbox through the environment manager's shell functions.
#[derive(Debug)]
pub struct Provisioner<'a> {
    config: &'a Config,
    runner: &'a dyn ToolRunner,
    session: WrapperSession,
}

impl<'a> Provisioner<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn ToolRunner) -> Result<Self> {
        let manager = EnvManager::detect(config, runner)?;
        Ok(Self::with_manager(config, runner, manager))
    }

    pub fn with_manager(
        config: &'a Config,
        runner: &'a dyn ToolRunner,
        manager: EnvManager,
    ) -> Self {
        Self {
            config,
            runner,
            session: WrapperSession::new(manager, config),
        }
    }

    /// Produces a freshly created sandbox named after the configuration.
    ///
    /// # Errors
    /// Fails if a same-named sandbox exists and `force` is not set, or if
    /// listing, removal or creation fails.
    #[instrument(skip(self), fields(name = %self.config.name))]
    pub fn provision(&self) -> Result<Sandbox> {
        let name = &self.config.name;
        if self.list()?.iter().any(|existing| existing == name) {
            if !self.config.force {
                return Err(ProvisionError::AlreadyExists(name.clone()).into());
            }
            info!(target: "venvkit", "removing existing virtualenv '{}'", name);
            self.remove(name)?;
        }

        info!(target: "venvkit", "creating virtualenv '{}' with {}", name, self.config.python.display());
        self.create()?;
        Sandbox::open(self.runner, name, &self.config.sandbox_root())
    }

    /// Names of the sandboxes the environment manager knows about.
    pub fn list(&self) -> Result<Vec<String>> {
        let invocation = self.session.invocation("lsvirtualenv", &["-b".to_string()])?;
        let output = self.runner.run(&invocation)?;
        if !output.success {
            return Err(ProvisionError::ListFailed(output.stderr.trim().to_string()).into());
        }
        Ok(output.lines().map(ToOwned::to_owned).collect())
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let invocation = self.session.invocation("rmvirtualenv", &[name.to_string()])?;
        let output = self.runner.run(&invocation)?;
        if !output.success {
            return Err(ProvisionError::RemoveFailed {
                name: name.to_string(),
                detail: output.stderr.trim().to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn create(&self) -> Result<()> {
        let invocation = self
            .session
            .invocation("mkvirtualenv", &self.creation_args())?;
        let output = self.runner.run(&invocation)?;
        if !output.success {
            return Err(ProvisionError::CreateFailed {
                name: self.config.name.clone(),
                detail: output.stderr.trim().to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn creation_args(&self) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.config.python.to_string_lossy().into_owned(),
        ];
        if self.config.system_site_packages {
            args.push("--system-site-packages".to_string());
        }
        if self.config.index.no_index {
            args.push("--never-download".to_string());
        }
        args.push(self.config.name.clone());
        args
    }
}
