use std::path::{Path, PathBuf};

use anyhow::Result;
use thiserror::Error;
use tracing::{info, instrument};

use crate::constants::*;
use crate::index::IndexOptions;
use crate::local::{LocalManifest, LocalPackages};
use crate::sandbox::Sandbox;
use crate::scratch::{Origin, RequirementSet, Scratch};
use crate::tool::ToolRunner;

/// Project configuration errors.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("{}: local package '{package}' has no directory in the project", .manifest.display())]
    MissingLocalPackage { manifest: PathBuf, package: String },
    #[error("legacy installer config {} does not exist", .0.display())]
    MissingLegacyConfig(PathBuf),
    #[error("interpreter of '{0}' has no legacy installer config to forward index options to")]
    NoLegacyInstaller(String),
}

/// What configuring one project did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectReport {
    pub project: PathBuf,
    pub package_files: usize,
    pub project_files: usize,
    /// Requirement lines dropped because a local package provides them.
    pub filtered: usize,
    /// Paths added to the import path, in order.
    pub injected: Vec<PathBuf>,
}

/// Installs a project's requirements into the sandbox, honouring local
/// package overrides.
#[derive(Debug)]
pub struct ProjectConfigurer<'a> {
    sandbox: &'a Sandbox,
    runner: &'a dyn ToolRunner,
    scratch: &'a Scratch,
    index: &'a IndexOptions,
    os_name: &'a str,
}

impl<'a> ProjectConfigurer<'a> {
    pub fn new(
        sandbox: &'a Sandbox,
        runner: &'a dyn ToolRunner,
        scratch: &'a Scratch,
        index: &'a IndexOptions,
        os_name: &'a str,
    ) -> Self {
        Self {
            sandbox,
            runner,
            scratch,
            index,
            os_name,
        }
    }

    /// Stages, filters and installs the requirements of `project`, then adds
    /// the project root to the import path. `local` is extended with the
    /// project's manifest entries.
    #[instrument(skip(self, project, local), fields(project = %project.display()))]
    pub fn configure(&self, project: &Path, local: &mut LocalPackages) -> Result<ProjectReport> {
        self.scratch.clear()?;

        let mut set = RequirementSet::default();
        for (origin, file) in self.conventional_files() {
            let source = project.join(&file);
            if source.is_file() {
                set.push(self.scratch.stage(origin, &source)?);
            }
        }

        let mut injected = Vec::new();
        if let Some(manifest) = LocalManifest::read(project)? {
            for package in &manifest.packages {
                self.sandbox.inject_path(&package.import_path)?;
                injected.push(package.import_path.clone());
                if let Some(requirements) = &package.requirements {
                    set.push(
                        self.scratch
                            .stage(Origin::Package(package.name.clone()), requirements)?,
                    );
                }
                local.insert(&package.name);
            }
        }

        let filtered = set.filter(local)?;

        let package_files = set.package_files();
        let project_files = set.project_files();
        self.sandbox
            .pip_install(self.runner, self.index, &package_files)?;
        self.sandbox
            .pip_install(self.runner, self.index, &project_files)?;

        self.sandbox.inject_path(project)?;
        injected.push(project.to_path_buf());

        info!(target: "venvkit",
            "configured {} ({} package file(s), {} project file(s), {} local override(s))",
            project.display(),
            package_files.len(),
            project_files.len(),
            filtered
        );

        Ok(ProjectReport {
            project: project.to_path_buf(),
            package_files: package_files.len(),
            project_files: project_files.len(),
            filtered,
            injected,
        })
    }

    fn conventional_files(&self) -> [(Origin, String); 4] {
        [
            (Origin::Project, REQUIREMENTS_FILE.to_string()),
            (
                Origin::Os(self.os_name.to_string()),
                format!("{}{}", self.os_name, OS_REQUIREMENTS_SUFFIX),
            ),
            (Origin::Dev, DEV_REQUIREMENTS_FILE.to_string()),
            (Origin::Test, TEST_REQUIREMENTS_FILE.to_string()),
        ]
    }
}
