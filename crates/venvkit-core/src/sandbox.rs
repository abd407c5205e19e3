use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::constants::{LEGACY_CONFIG_FILE, PATH_EXTENSIONS_FILE, SETUP_SCRIPT};
use crate::index::IndexOptions;
use crate::tool::{Invocation, ToolRunner};

const INTROSPECT: &str = r#"import json, os, sysconfig
try:
    import distutils
    distutils_dir = os.path.dirname(distutils.__file__)
except Exception:
    distutils_dir = None
print(json.dumps({"purelib": sysconfig.get_paths()["purelib"], "distutils_dir": distutils_dir}))
"#;

#[derive(Debug, Deserialize)]
struct InterpreterPaths {
    purelib: PathBuf,
    distutils_dir: Option<PathBuf>,
}

/// A created virtualenv and the interpreter paths it exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    pub name: String,
    pub root: PathBuf,
    pub python: PathBuf,
    /// Site-packages directory holding the import-path extension file.
    pub purelib: PathBuf,
    /// Directory of the interpreter's `distutils` package, if it has one.
    pub distutils_dir: Option<PathBuf>,
}

impl Sandbox {
    /// Opens the virtualenv at `root` by introspecting its interpreter.
    pub fn open(runner: &dyn ToolRunner, name: &str, root: &Path) -> Result<Self> {
        let python = root.join("bin").join("python");
        let output = runner
            .run_checked(
                &Invocation::new(python.to_string_lossy()).args(["-c", INTROSPECT]),
            )
            .with_context(|| format!("failed to introspect interpreter of '{name}'"))?;

        let Some(json) = output.lines().last() else {
            bail!("interpreter of '{name}' reported no paths");
        };
        let paths: InterpreterPaths = serde_json::from_str(json)
            .with_context(|| format!("failed to parse interpreter paths of '{name}'"))?;
        debug!("sandbox '{}' purelib={}", name, paths.purelib.display());

        Ok(Self {
            name: name.to_string(),
            root: root.to_path_buf(),
            python,
            purelib: paths.purelib,
            distutils_dir: paths.distutils_dir,
        })
    }

    pub fn path_extensions_file(&self) -> PathBuf {
        self.purelib.join(PATH_EXTENSIONS_FILE)
    }

    pub fn legacy_config_path(&self) -> Option<PathBuf> {
        self.distutils_dir
            .as_ref()
            .map(|dir| dir.join(LEGACY_CONFIG_FILE))
    }

    /// Adds `path` to the sandbox's import path. Returns `false` if it was
    /// already present.
    pub fn inject_path(&self, path: &Path) -> Result<bool> {
        if self.injected_paths()?.iter().any(|p| p == path) {
            debug!("{} already on import path of '{}'", path.display(), self.name);
            return Ok(false);
        }

        let file = self.path_extensions_file();
        fs::create_dir_all(&self.purelib)
            .with_context(|| format!("failed to create '{}'", self.purelib.display()))?;
        let mut handle = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file)
            .with_context(|| format!("failed to open '{}'", file.display()))?;
        writeln!(handle, "{}", path.display())
            .with_context(|| format!("failed to write '{}'", file.display()))?;

        info!(target: "venvkit", "added {} to import path", path.display());
        Ok(true)
    }

    pub fn injected_paths(&self) -> Result<Vec<PathBuf>> {
        let file = self.path_extensions_file();
        if !file.is_file() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&file)
            .with_context(|| format!("failed to read '{}'", file.display()))?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with("import "))
            .map(PathBuf::from)
            .collect())
    }

    /// Installs the given requirement files in one installer run.
    pub fn pip_install(
        &self,
        runner: &dyn ToolRunner,
        index: &IndexOptions,
        files: &[PathBuf],
    ) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }

        let mut invocation = Invocation::new(self.python.to_string_lossy())
            .args(["-m", "pip", "install"])
            .args(index.installer_args())
            .streamed();
        for file in files {
            invocation = invocation.arg("-r").arg(file.to_string_lossy());
        }

        runner
            .run_checked(&invocation)
            .with_context(|| format!("installing requirements into '{}' failed", self.name))?;
        Ok(())
    }

    /// Asks the project's `setup.py` for its distribution name.
    pub fn project_name(&self, runner: &dyn ToolRunner, project: &Path) -> Result<Option<String>> {
        if !project.join(SETUP_SCRIPT).is_file() {
            return Ok(None);
        }
        let output = runner
            .run_checked(
                &Invocation::new(self.python.to_string_lossy())
                    .args([SETUP_SCRIPT, "--name"])
                    .cwd(project),
            )
            .with_context(|| format!("failed to query {} for its name", project.display()))?;
        Ok(output.lines().last().map(ToOwned::to_owned))
    }
}
