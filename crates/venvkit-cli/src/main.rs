use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::error::ErrorKind;
use clap::Parser;

use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use venvkit_core::tool::SystemRunner;
use venvkit_core::{bootstrap, Config, HostEnv, IndexOptions, RawOptions, Scratch, Settings};

mod signals;
mod styles;

use styles as s;

/// The command-line interface for venvkit.
#[derive(Debug, Parser)]
#[command(name = "venvkit")]
#[command(version)]
#[command(styles = s::get_clap_styles())]
#[command(
    help_template = "{bin} {version}\n\n{about-with-newline}{usage-heading} {usage}\n\n{all-args}{after-help}"
)]
#[command(about = "Bootstrap a project's development virtualenv")]
#[command(
    long_about = "venvkit creates a named virtualenv through virtualenvwrapper, binds it to the
chosen interpreter and installs the requirements declared by the project.
Packages listed in local-requirements.txt are put on the import path
instead of being installed, and their pins are dropped from every
requirements file."
)]
#[command(
    after_help = "\x1b[1;32mExamples:\x1b[0m\n  \x1b[36mvenvkit -a ~/src/app\x1b[0m                 \x1b[2m# Environment named 'app'\x1b[0m\n  \x1b[36mvenvkit -a app -A lib --force\x1b[0m        \x1b[2m# Replace 'app', configure lib first\x1b[0m\n  \x1b[36mvenvkit -p python3.11 --no-index -f /srv/wheels\x1b[0m \x1b[2m# Offline install\x1b[0m"
)]
pub(crate) struct Cli {
    /// Project directory (defaults to the current directory).
    #[arg(short = 'a', long = "project", value_name = "PATH")]
    project: Option<PathBuf>,
    /// Additional project configured before the main one (repeatable).
    #[arg(short = 'A', long = "extra-project", value_name = "PATH")]
    extra_projects: Vec<PathBuf>,
    /// Virtualenv name (defaults to the project directory's name).
    #[arg(short = 'n', long, value_name = "NAME")]
    name: Option<String>,
    /// Replace an existing virtualenv with the same name.
    #[arg(long, default_value_t = false)]
    force: bool,
    /// Interpreter to bind the virtualenv to.
    #[arg(short = 'p', long, value_name = "PATH")]
    python: Option<String>,
    /// virtualenv executable used by the wrapper.
    #[arg(short = 'v', long, value_name = "PATH")]
    virtualenv: Option<String>,
    /// virtualenvwrapper.sh to source.
    #[arg(short = 'w', long, value_name = "PATH")]
    virtualenvwrapper: Option<PathBuf>,
    /// Give the virtualenv access to the global site-packages.
    #[arg(short = 's', long, default_value_t = false)]
    system_site_packages: bool,
    /// Package index URL, forwarded to pip and the legacy installer (repeatable).
    #[arg(short = 'i', long = "index-url", value_name = "URL")]
    index_urls: Vec<String>,
    /// Extra location to search for packages (repeatable).
    #[arg(short = 'f', long = "find-links", value_name = "URL")]
    find_links: Vec<String>,
    /// Ignore the package index.
    #[arg(long, default_value_t = false)]
    no_index: bool,
    /// Disable the installer cache.
    #[arg(long, default_value_t = false)]
    no_cache_dir: bool,
}

impl Cli {
    fn into_options(self) -> RawOptions {
        RawOptions {
            project: self.project,
            extra_projects: self.extra_projects,
            name: self.name,
            force: self.force,
            python: self.python,
            virtualenv: self.virtualenv,
            virtualenvwrapper: self.virtualenvwrapper,
            system_site_packages: self.system_site_packages,
            index: IndexOptions {
                index_urls: self.index_urls,
                find_links: self.find_links,
                no_index: self.no_index,
                no_cache_dir: self.no_cache_dir,
            },
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", diagnostic(&e));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = parse_cli(std::env::args_os())?;
    debug!("parsed cli arguments: {:?}", cli);
    let Some(cli) = cli else {
        return Ok(());
    };

    let host = HostEnv::capture()?;
    let settings = Settings::load(host.settings_path.as_deref())?;
    let runner = SystemRunner;
    let config = Config::resolve(cli.into_options().with_settings(&settings), host, &runner)?;

    let scratch = Scratch::create()?;
    signals::cleanup_on_termination(scratch.path())?;

    let report = bootstrap(&config, &runner, &scratch)?;
    println!("next: run 'workon {}'", report.sandbox.name);
    Ok(())
}

/// Parses arguments, returning `None` once help or version has been printed.
fn parse_cli<I, T>(args: I) -> Result<Option<Cli>>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            Ok(None)
        }
        Err(e) => bail!("{}", usage_message(&e)),
    }
}

// First line of clap's report, without the usage block that follows it.
fn usage_message(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .trim_start_matches("error: ")
        .to_string()
}

/// The whole error chain on a single line.
fn diagnostic(err: &anyhow::Error) -> String {
    format!("{err:#}")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> Result<Option<Cli>> {
        parse_cli(std::iter::once("venvkit").chain(args.iter().copied()))
    }

    #[test]
    fn parses_short_and_long_forms() {
        let cli = parse(&[
            "-a", "/src/app", "-A", "/src/lib1", "--extra-project", "/src/lib2", "-n", "app-dev",
            "--force", "-p", "python3.11", "-s", "-i", "https://a/simple", "--find-links",
            "/wheels", "--no-index", "--no-cache-dir",
        ])
        .unwrap()
        .expect("not help");

        let opts = cli.into_options();
        assert_eq!(opts.project, Some(PathBuf::from("/src/app")));
        assert_eq!(
            opts.extra_projects,
            vec![PathBuf::from("/src/lib1"), PathBuf::from("/src/lib2")]
        );
        assert_eq!(opts.name.as_deref(), Some("app-dev"));
        assert!(opts.force && opts.system_site_packages);
        assert_eq!(opts.python.as_deref(), Some("python3.11"));
        assert_eq!(opts.index.index_urls, vec!["https://a/simple"]);
        assert_eq!(opts.index.find_links, vec!["/wheels"]);
        assert!(opts.index.no_index && opts.index.no_cache_dir);
    }

    #[test]
    fn help_is_not_an_error() {
        assert!(parse(&["--help"]).unwrap().is_none());
        assert!(parse(&["-h"]).unwrap().is_none());
    }

    #[test]
    fn missing_value_is_a_usage_error() {
        let err = parse(&["-n"]).unwrap_err();
        assert!(err.to_string().contains("--name"));
        assert!(!err.to_string().starts_with("error:"));
        assert_eq!(err.to_string().lines().count(), 1);
        assert!(!err.to_string().contains("Usage"));
    }

    #[test]
    fn diagnostic_folds_error_chain_onto_one_line() {
        let err = anyhow::anyhow!("mkvirtualenv exited with status 1:\nERROR: no python\n")
            .context("failed to create virtualenv 'app'");
        let line = diagnostic(&err);
        assert_eq!(
            line,
            "failed to create virtualenv 'app': mkvirtualenv exited with status 1: ERROR: no python"
        );
    }

    #[test]
    fn trailing_positional_is_rejected() {
        assert!(parse(&["-a", "/src/app", "extra"]).is_err());
    }

    #[test]
    fn root_project_rejected_through_cli() {
        let dir = tempdir().unwrap();
        let python = dir.path().join("python3");
        fs::write(&python, "").unwrap();
        let python_arg = python.to_string_lossy().into_owned();

        for extra in [&[][..], &["--force"][..], &["-s", "--no-index"][..]] {
            let mut args = vec!["-a", "/", "-p", python_arg.as_str()];
            args.extend_from_slice(extra);
            let cli = parse(&args).unwrap().unwrap();
            let host = HostEnv {
                cwd: dir.path().to_path_buf(),
                virtual_env: None,
                workon_home: dir.path().join("envs"),
                pyenv_shell: false,
                os_name: "linux".to_string(),
                settings_path: None,
            };
            let err = Config::resolve(cli.into_options(), host, &SystemRunner).unwrap_err();
            assert_eq!(err, venvkit_core::ConfigError::RootProject);
        }
    }

    #[test]
    fn explicit_name_with_separator_rejected() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("app");
        fs::create_dir(&project).unwrap();
        let python = dir.path().join("python3");
        fs::write(&python, "").unwrap();

        let cli = parse(&[
            "-a",
            project.to_str().unwrap(),
            "-n",
            "team/app",
            "-p",
            python.to_str().unwrap(),
        ])
        .unwrap()
        .unwrap();
        let host = HostEnv {
            cwd: dir.path().to_path_buf(),
            virtual_env: None,
            workon_home: dir.path().join("envs"),
            pyenv_shell: false,
            os_name: "linux".to_string(),
            settings_path: None,
        };
        assert!(matches!(
            Config::resolve(cli.into_options(), host, &SystemRunner),
            Err(venvkit_core::ConfigError::NameHasSeparator(_))
        ));
    }
}
