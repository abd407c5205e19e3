use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::legacy::LegacyConfigPatch;
use crate::local::{LocalManifest, LocalPackages};
use crate::project::{ProjectConfigurer, ProjectError, ProjectReport};
use crate::provision::Provisioner;
use crate::sandbox::Sandbox;
use crate::scratch::Scratch;
use crate::tool::ToolRunner;

/// Outcome of a full bootstrap run.
#[derive(Debug)]
pub struct BootstrapReport {
    pub sandbox: Sandbox,
    /// One entry per configured project, extra projects first.
    pub projects: Vec<ProjectReport>,
    /// Every package treated as locally provided.
    pub local: Vec<String>,
}

/// Creates the sandbox and configures every project into it.
#[instrument(skip_all, fields(name = %config.name))]
pub fn bootstrap(
    config: &Config,
    runner: &dyn ToolRunner,
    scratch: &Scratch,
) -> Result<BootstrapReport> {
    let sandbox = Provisioner::new(config, runner)?.provision()?;
    configure_projects(config, runner, scratch, sandbox)
}

/// Configures extra projects in order, then the primary project, so the
/// primary project's requirements are installed last.
pub fn configure_projects(
    config: &Config,
    runner: &dyn ToolRunner,
    scratch: &Scratch,
    sandbox: Sandbox,
) -> Result<BootstrapReport> {
    let projects: Vec<&Path> = config
        .extra_projects
        .iter()
        .map(|p| p.as_path())
        .chain(std::iter::once(config.project.as_path()))
        .collect();

    let mut local = collect_local_packages(&sandbox, runner, &projects)?;
    debug!("locally provided packages: {:?}", local.names());

    let patch = match (config.index.legacy_config_text(), sandbox.legacy_config_path()) {
        (Some(text), Some(path)) => Some(LegacyConfigPatch::apply(&path, &text)?),
        (Some(_), None) => return Err(ProjectError::NoLegacyInstaller(sandbox.name).into()),
        (None, _) => None,
    };

    let configurer = ProjectConfigurer::new(
        &sandbox,
        runner,
        scratch,
        &config.index,
        &config.host.os_name,
    );
    let mut reports = Vec::with_capacity(projects.len());
    for project in &projects {
        reports.push(configurer.configure(project, &mut local)?);
    }

    if let Some(patch) = patch {
        patch.restore()?;
    }

    info!(target: "venvkit",
        "virtualenv '{}' ready at {} ({} project(s))",
        sandbox.name,
        sandbox.root.display(),
        reports.len()
    );

    Ok(BootstrapReport {
        local: local.names().to_vec(),
        sandbox,
        projects: reports,
    })
}

// Every project's manifest entries and distribution name count as local for
// all projects, whichever project declares them.
fn collect_local_packages(
    sandbox: &Sandbox,
    runner: &dyn ToolRunner,
    projects: &[&Path],
) -> Result<LocalPackages> {
    let mut local = LocalPackages::default();
    for project in projects {
        if let Some(name) = sandbox.project_name(runner, project)? {
            local.insert(&name);
        }
        if let Some(manifest) = LocalManifest::read(project)? {
            for name in manifest.names() {
                local.insert(name);
            }
        }
    }
    Ok(local)
}
