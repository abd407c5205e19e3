use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use crate::constants::LEGACY_CONFIG_BACKUP_SUFFIX;
use crate::project::ProjectError;

/// Temporarily replaces the legacy installer's configuration file.
///
/// The original file is moved aside while the patch is active and put back
/// by [`LegacyConfigPatch::restore`] or, failing that, on drop.
#[derive(Debug)]
pub struct LegacyConfigPatch {
    target: PathBuf,
    backup: PathBuf,
    active: bool,
}

impl LegacyConfigPatch {
    /// # Errors
    /// Fails with [`ProjectError::MissingLegacyConfig`] when `target` does not
    /// exist, and when a backup from an earlier run is still in place.
    pub fn apply(target: &Path, text: &str) -> Result<Self> {
        if !target.is_file() {
            return Err(ProjectError::MissingLegacyConfig(target.to_path_buf()).into());
        }
        let backup = backup_path(target);
        if backup.exists() {
            bail!(
                "stale legacy installer backup at {}; restore or remove it first",
                backup.display()
            );
        }

        fs::rename(target, &backup)
            .with_context(|| format!("failed to move {} aside", target.display()))?;

        // Dropping the guard on a failed write puts the original back.
        let patch = Self {
            target: target.to_path_buf(),
            backup,
            active: true,
        };
        fs::write(target, text).with_context(|| format!("failed to write {}", target.display()))?;
        debug!("patched legacy installer config {}", target.display());
        Ok(patch)
    }

    /// Puts the original configuration back.
    pub fn restore(mut self) -> Result<()> {
        self.restore_inner()
    }

    fn restore_inner(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        if self.target.exists() {
            fs::remove_file(&self.target)
                .with_context(|| format!("failed to remove {}", self.target.display()))?;
        }
        fs::rename(&self.backup, &self.target).with_context(|| {
            format!(
                "failed to restore {} from {}",
                self.target.display(),
                self.backup.display()
            )
        })?;
        debug!("restored legacy installer config {}", self.target.display());
        Ok(())
    }
}

impl Drop for LegacyConfigPatch {
    fn drop(&mut self) {
        if let Err(e) = self.restore_inner() {
            warn!("failed to restore legacy installer config: {e:#}");
        }
    }
}

fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(LEGACY_CONFIG_BACKUP_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn restores_existing_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("distutils.cfg");
        fs::write(&target, "[install]\nprefix = /x\n").unwrap();

        let patch = LegacyConfigPatch::apply(&target, "[easy_install]\n").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "[easy_install]\n");
        assert!(backup_path(&target).exists());

        patch.restore().unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "[install]\nprefix = /x\n");
        assert!(!backup_path(&target).exists());
    }

    #[test]
    fn restores_on_drop() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("distutils.cfg");
        fs::write(&target, "").unwrap();
        {
            let _patch = LegacyConfigPatch::apply(&target, "[easy_install]\n").unwrap();
            assert_eq!(fs::read_to_string(&target).unwrap(), "[easy_install]\n");
        }
        assert_eq!(fs::read_to_string(&target).unwrap(), "");
        assert!(!backup_path(&target).exists());
    }

    #[test]
    fn missing_config_file_is_fatal() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("distutils.cfg");

        let err = LegacyConfigPatch::apply(&target, "[easy_install]\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProjectError>(),
            Some(ProjectError::MissingLegacyConfig(path)) if path == &target
        ));
        assert!(!target.exists());
        assert!(!backup_path(&target).exists());
    }

    #[test]
    fn restores_when_caller_fails_midway() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("distutils.cfg");
        fs::write(&target, "original").unwrap();

        let run = || -> Result<()> {
            let _patch = LegacyConfigPatch::apply(&target, "patched")?;
            bail!("installer exploded");
        };
        assert!(run().is_err());
        assert_eq!(fs::read_to_string(&target).unwrap(), "original");
    }

    #[test]
    fn refuses_stale_backup() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("distutils.cfg");
        fs::write(&target, "original").unwrap();
        fs::write(backup_path(&target), "older").unwrap();

        assert!(LegacyConfigPatch::apply(&target, "patched").is_err());
        assert_eq!(fs::read_to_string(&target).unwrap(), "original");
    }
}
