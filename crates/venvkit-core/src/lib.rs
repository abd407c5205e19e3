//! Core logic for bootstrapping a project's development virtualenv.
//!
//! This crate holds the validated configuration, the external tool
//! abstraction, sandbox provisioning, requirement staging and filtering,
//! and the workflow that ties them together.

pub mod bootstrap;
pub mod config;
pub mod constants;
#[cfg(test)]
mod fixtures;
pub mod index;
pub mod legacy;
pub mod local;
pub mod project;
pub mod provision;
pub mod requirement;
pub mod sandbox;
pub mod scratch;
pub mod tool;
pub mod wrapper;

pub use bootstrap::{bootstrap, BootstrapReport};
pub use config::{Config, ConfigError, HostEnv, RawOptions, Settings};
pub use index::IndexOptions;
pub use requirement::RequirementDecl;
pub use sandbox::Sandbox;
pub use scratch::Scratch;
pub use tool::{Invocation, ToolOutput, ToolRunner};
