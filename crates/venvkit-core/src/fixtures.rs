use std::path::{Path, PathBuf};

use crate::config::{Config, HostEnv};
use crate::index::IndexOptions;
use crate::tool::fake::FakeRunner;

/// A configuration for project `<base>/proj` with sandboxes under `<base>/envs`.
pub fn config(base: &Path) -> Config {
    Config {
        project: base.join("proj"),
        name: "proj".to_string(),
        extra_projects: Vec::new(),
        python: PathBuf::from("/usr/bin/python3"),
        virtualenv: None,
        virtualenvwrapper: None,
        force: false,
        system_site_packages: false,
        index: IndexOptions::default(),
        host: HostEnv {
            cwd: base.to_path_buf(),
            virtual_env: None,
            workon_home: base.join("envs"),
            pyenv_shell: false,
            os_name: "linux".to_string(),
            settings_path: None,
        },
    }
}

/// Answers sandbox interpreter introspection with the given directories.
pub fn respond_introspection(runner: &FakeRunner, purelib: &Path) {
    runner.respond(
        "import json",
        &format!(
            "{{\"purelib\": \"{}\", \"distutils_dir\": null}}\n",
            purelib.display()
        ),
    );
}

pub fn respond_introspection_with_distutils(runner: &FakeRunner, purelib: &Path, distutils: &Path) {
    runner.respond(
        "import json",
        &format!(
            "{{\"purelib\": \"{}\", \"distutils_dir\": \"{}\"}}\n",
            purelib.display(),
            distutils.display()
        ),
    );
}
