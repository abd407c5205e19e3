use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

/// Removes the scratch directory and exits with status 1 on SIGINT or SIGTERM.
pub fn cleanup_on_termination(scratch: &Path) -> Result<()> {
    let path: PathBuf = scratch.to_path_buf();
    ctrlc::set_handler(move || {
        warn!("interrupted, removing {}", path.display());
        remove_scratch(&path);
        std::process::exit(1);
    })
    .context("failed to install termination handler")
}

fn remove_scratch(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = std::fs::remove_dir_all(path) {
        warn!("failed to remove {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_scratch_tree() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("venvkit-scratch");
        std::fs::create_dir_all(scratch.join("nested")).unwrap();
        std::fs::write(scratch.join("nested/requirements.txt"), "foo\n").unwrap();

        remove_scratch(&scratch);
        assert!(!scratch.exists());

        // Already gone is fine.
        remove_scratch(&scratch);
    }
}
