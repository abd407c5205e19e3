use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::debug;

#[cfg(test)]
pub mod fake;
pub mod system;

pub use system::SystemRunner;

/// A single external program execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The executable program (e.g., "bash", "/env/bin/python").
    pub program: String,
    /// The arguments to pass to the program.
    pub args: Vec<String>,
    /// Environment variables set for this execution only.
    pub env: BTreeMap<String, String>,
    /// Working directory, inherited when `None`.
    pub cwd: Option<PathBuf>,
    /// Stream output to the terminal instead of capturing it.
    pub stream: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
            stream: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn cwd(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn streamed(mut self) -> Self {
        self.stream = true;
        self
    }

    /// Human readable command line, used in logs and error messages.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Result of running an [`Invocation`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Non-empty trimmed stdout lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// Capability interface over the external tools the workflow drives.
pub trait ToolRunner: std::fmt::Debug {
    /// Resolves a bare tool name to an executable path.
    fn locate(&self, tool: &str) -> Option<PathBuf>;

    /// Runs the invocation. Errors only when the program cannot be started;
    /// a non-zero exit is reported through [`ToolOutput::success`].
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput>;

    /// Runs the invocation and fails on a non-zero exit status.
    fn run_checked(&self, invocation: &Invocation) -> Result<ToolOutput> {
        let output = self.run(invocation)?;
        if !output.success {
            let detail = output.stderr.trim();
            debug!("command failed: {}", invocation.display());
            match output.code {
                Some(code) if detail.is_empty() => {
                    bail!("command exited with status {code}: {}", invocation.display())
                }
                Some(code) => bail!(
                    "command exited with status {code}: {}: {detail}",
                    invocation.display()
                ),
                None => bail!("command terminated by signal: {}", invocation.display()),
            }
        }
        Ok(output)
    }
}
