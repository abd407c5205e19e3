use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::constants::{LOCAL_MANIFEST_FILE, REQUIREMENTS_FILE};
use crate::project::ProjectError;
use crate::requirement::normalize_name;

/// Names of packages provided by path injection rather than installation.
///
/// Lookups compare normalised names, so `Foo_Bar` and `foo-bar` are the same
/// package.
#[derive(Debug, Default, Clone)]
pub struct LocalPackages {
    names: Vec<String>,
    normalized: Vec<String>,
}

impl LocalPackages {
    /// Adds `name`, returning `false` if it was already present.
    pub fn insert(&mut self, name: &str) -> bool {
        let key = normalize_name(name);
        if key.is_empty() || self.normalized.contains(&key) {
            return false;
        }
        self.names.push(name.to_string());
        self.normalized.push(key);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.normalized.contains(&normalize_name(name))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// A package checked out inside a project and listed in its manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPackage {
    pub name: String,
    /// `<package dir>/src` when present, otherwise the package directory.
    pub import_path: PathBuf,
    /// The package's own requirements file, if it ships one.
    pub requirements: Option<PathBuf>,
}

/// The parsed `local-requirements.txt` of a project.
#[derive(Debug, Clone)]
pub struct LocalManifest {
    pub path: PathBuf,
    pub packages: Vec<LocalPackage>,
}

impl LocalManifest {
    /// Reads the manifest in `project`, if there is one.
    ///
    /// # Errors
    /// Fails when an entry has no same-named directory under `project`.
    pub fn read(project: &Path) -> Result<Option<Self>> {
        let path = project.join(LOCAL_MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        let mut packages = Vec::new();
        for entry in manifest_entries(&text) {
            let dir = project.join(entry);
            if !dir.is_dir() {
                return Err(ProjectError::MissingLocalPackage {
                    manifest: path,
                    package: entry.to_string(),
                }
                .into());
            }

            let src = dir.join("src");
            let import_path = if src.is_dir() { src } else { dir.clone() };
            let requirements = Some(dir.join(REQUIREMENTS_FILE)).filter(|p| p.is_file());
            debug!("local package '{}' imports from {}", entry, import_path.display());

            packages.push(LocalPackage {
                name: entry.to_string(),
                import_path,
                requirements,
            });
        }

        Ok(Some(Self { path, packages }))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(|p| p.name.as_str())
    }
}

// Whitespace-separated entries; `#` starts a comment.
fn manifest_entries(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .flat_map(str::split_whitespace)
}
