use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tracing::debug;

use crate::tool::{Invocation, ToolOutput, ToolRunner};

/// Runs tools as child processes of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        match which::which(tool) {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("'{}' not found on PATH: {}", tool, e);
                None
            }
        }
    }

    fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        debug!("running: {}", invocation.display());

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args).envs(&invocation.env);
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }

        if invocation.stream {
            let status = command
                .stdin(Stdio::null())
                .status()
                .with_context(|| format!("failed to start command '{}'", invocation.display()))?;
            return Ok(ToolOutput {
                success: status.success(),
                code: status.code(),
                ..Default::default()
            });
        }

        let output = command
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to start command '{}'", invocation.display()))?;

        Ok(ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_and_status() {
        let out = SystemRunner
            .run(&Invocation::new("sh").args(["-c", "echo hello; echo oops >&2; exit 3"]))
            .expect("sh should start");
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[test]
    fn passes_explicit_environment_and_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let out = SystemRunner
            .run(
                &Invocation::new("sh")
                    .args(["-c", "printf '%s %s' \"$VENVKIT_PROBE\" \"$(pwd)\""])
                    .env("VENVKIT_PROBE", "set")
                    .cwd(dir.path()),
            )
            .unwrap();
        let canonical = dir.path().canonicalize().unwrap();
        assert_eq!(out.stdout, format!("set {}", canonical.display()));
    }

    #[test]
    fn run_checked_reports_stderr() {
        let err = SystemRunner
            .run_checked(&Invocation::new("sh").args(["-c", "echo broken >&2; exit 1"]))
            .expect_err("must fail");
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn missing_program_is_an_error() {
        assert!(SystemRunner
            .run(&Invocation::new("venvkit-definitely-missing-tool"))
            .is_err());
        assert!(SystemRunner.locate("venvkit-definitely-missing-tool").is_none());
        assert!(SystemRunner.locate("sh").is_some());
    }
}
