use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use tracing::debug;

use crate::constants::SCRATCH_PREFIX;
use crate::local::LocalPackages;
use crate::requirement::RequirementDecl;

/// Where a staged requirements file came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Project,
    Os(String),
    Dev,
    Test,
    /// A local package's own requirements.
    Package(String),
}

impl Origin {
    fn tag(&self) -> String {
        match self {
            Self::Project => "project".to_string(),
            Self::Os(os) => format!("os-{os}"),
            Self::Dev => "dev".to_string(),
            Self::Test => "test".to_string(),
            Self::Package(name) => format!("pkg-{}", name.replace(['/', '\\'], "_")),
        }
    }

    pub fn is_package(&self) -> bool {
        matches!(self, Self::Package(_))
    }
}

/// A requirements file copied into the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementFile {
    pub origin: Origin,
    pub path: PathBuf,
}

/// Process-owned directory for staged requirements files, removed on drop.
#[derive(Debug)]
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir()
            .context("failed to create scratch directory")?;
        debug!("scratch directory at {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn create_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(parent)
            .with_context(|| format!("failed to create scratch directory in {}", parent.display()))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Removes everything staged so far.
    pub fn clear(&self) -> Result<()> {
        let entries = fs::read_dir(self.path())
            .with_context(|| format!("failed to list {}", self.path().display()))?;
        for entry in entries {
            let path = entry?.path();
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            removed.with_context(|| format!("failed to remove {}", path.display()))?;
        }
        Ok(())
    }

    /// Copies `source` into the scratch directory tagged with `origin`.
    pub fn stage(&self, origin: Origin, source: &Path) -> Result<RequirementFile> {
        let path = self.path().join(format!("{}-requirements.txt", origin.tag()));
        fs::copy(source, &path).with_context(|| {
            format!("failed to copy {} to {}", source.display(), path.display())
        })?;
        debug!("staged {} as {}", source.display(), path.display());
        Ok(RequirementFile { origin, path })
    }
}

/// The requirements files staged for one project, in staging order.
#[derive(Debug, Default, Clone)]
pub struct RequirementSet {
    files: Vec<RequirementFile>,
}

impl RequirementSet {
    pub fn push(&mut self, file: RequirementFile) {
        self.files.push(file);
    }

    pub fn files(&self) -> &[RequirementFile] {
        &self.files
    }

    /// Removes every declaration of a locally provided package from the
    /// staged files. Returns the number of lines removed.
    pub fn filter(&self, local: &LocalPackages) -> Result<usize> {
        let mut removed = 0;
        for file in &self.files {
            let text = fs::read_to_string(&file.path)
                .with_context(|| format!("failed to read {}", file.path.display()))?;
            let (kept, dropped) = filter_text(&text, |name| local.contains(name));
            if dropped > 0 {
                fs::write(&file.path, kept)
                    .with_context(|| format!("failed to write {}", file.path.display()))?;
                debug!("dropped {} local requirement(s) from {:?}", dropped, file.origin);
            }
            removed += dropped;
        }
        Ok(removed)
    }

    pub fn package_files(&self) -> Vec<PathBuf> {
        self.paths(|origin| origin.is_package())
    }

    pub fn project_files(&self) -> Vec<PathBuf> {
        self.paths(|origin| !origin.is_package())
    }

    fn paths(&self, select: impl Fn(&Origin) -> bool) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|f| select(&f.origin))
            .map(|f| f.path.clone())
            .collect()
    }
}

/// Drops lines declaring a package for which `is_local` holds. Returns the
/// remaining text and the number of dropped lines.
pub fn filter_text(text: &str, is_local: impl Fn(&str) -> bool) -> (String, usize) {
    let mut kept = String::with_capacity(text.len());
    let mut dropped = 0;
    for line in text.split_inclusive('\n') {
        match RequirementDecl::from_line(line) {
            Some(decl) if is_local(&decl.name) => dropped += 1,
            _ => kept.push_str(line),
        }
    }
    (kept, dropped)
}
