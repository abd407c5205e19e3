//! Constants used across the venvkit workspace.

/// Generic requirements file read from a project root.
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

/// Suffix of the OS-specific requirements file, prefixed with the OS name.
pub const OS_REQUIREMENTS_SUFFIX: &str = "-requirements.txt";

/// Development-only requirements file.
pub const DEV_REQUIREMENTS_FILE: &str = "dev-requirements.txt";

/// Test-only requirements file.
pub const TEST_REQUIREMENTS_FILE: &str = "test-requirements.txt";

/// Manifest listing packages checked out next to the project.
pub const LOCAL_MANIFEST_FILE: &str = "local-requirements.txt";

/// Build script queried for the project's distribution name.
pub const SETUP_SCRIPT: &str = "setup.py";

/// Import-path extension file maintained inside the sandbox's site-packages.
pub const PATH_EXTENSIONS_FILE: &str = "_virtualenv_path_extensions.pth";

/// Legacy installer configuration file, relative to the distutils package.
pub const LEGACY_CONFIG_FILE: &str = "distutils.cfg";
pub const LEGACY_CONFIG_BACKUP_SUFFIX: &str = ".venvkit-orig";

/// Wrapper script name looked up on PATH.
pub const WRAPPER_SCRIPT: &str = "virtualenvwrapper.sh";

/// Distribution-packaged wrapper location used outside macOS.
pub const WRAPPER_FALLBACK: &str = "/usr/share/virtualenvwrapper/virtualenvwrapper.sh";

/// Default sandbox home when `WORKON_HOME` is unset, relative to `$HOME`.
pub const DEFAULT_WORKON_DIR: &str = ".virtualenvs";

/// Interpreter used when none is given.
pub const DEFAULT_PYTHON: &str = "python3";

/// Settings file override and default location under the user config dir.
pub const SETTINGS_ENV: &str = "VENVKIT_CONFIG";
pub const SETTINGS_DIR: &str = "venvkit";
pub const SETTINGS_FILE: &str = "config.toml";

/// Prefix of the scratch directory created under the system temp dir.
pub const SCRATCH_PREFIX: &str = "venvkit-";
