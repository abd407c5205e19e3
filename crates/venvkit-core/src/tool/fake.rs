use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::tool::{Invocation, ToolOutput, ToolRunner};

/// Records invocations and answers them from scripted responses.
///
/// A response applies to the first recorded rule whose needle occurs in the
/// invocation's command line; anything unmatched succeeds with empty output.
/// Requirement files passed to an installer and watched files are read at
/// call time, since staged files are gone once the workflow finishes.
#[derive(Debug, Default)]
pub struct FakeRunner {
    tools: HashMap<String, PathBuf>,
    rules: RefCell<Vec<(String, ToolOutput)>>,
    calls: RefCell<Vec<Invocation>>,
    installs: RefCell<Vec<Vec<String>>>,
    watched: RefCell<Vec<PathBuf>>,
    snapshots: RefCell<Vec<Option<String>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.tools.insert(name.to_string(), path.into());
        self
    }

    pub fn respond(&self, needle: &str, stdout: &str) {
        self.rules.borrow_mut().push((
            needle.to_string(),
            ToolOutput {
                success: true,
                code: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        ));
    }

    pub fn fail(&self, needle: &str, stderr: &str) {
        self.rules.borrow_mut().push((
            needle.to_string(),
            ToolOutput {
                success: false,
                code: Some(1),
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        ));
    }

    /// Snapshot `path` on every installer call.
    pub fn watch(&self, path: impl Into<PathBuf>) {
        self.watched.borrow_mut().push(path.into());
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Command lines of every recorded call containing `needle`.
    pub fn lines_matching(&self, needle: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(Invocation::display)
            .filter(|line| line.contains(needle))
            .collect()
    }

    /// Contents of the `-r` files of each installer call, one entry per file.
    pub fn installs(&self) -> Vec<Vec<String>> {
        self.installs.borrow().clone()
    }

    /// Watched file contents at each installer call.
    pub fn snapshots(&self) -> Vec<Option<String>> {
        self.snapshots.borrow().clone()
    }

    fn record_install(&self, invocation: &Invocation) {
        let files = invocation
            .args
            .windows(2)
            .filter(|pair| pair[0] == "-r")
            .map(|pair| fs::read_to_string(&pair[1]).unwrap_or_default())
            .collect();
        self.installs.borrow_mut().push(files);
        for path in self.watched.borrow().iter() {
            self.snapshots
                .borrow_mut()
                .push(fs::read_to_string(path).ok());
        }
    }
}

impl ToolRunner for FakeRunner {
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        self.tools.get(tool).cloned()
    }

    fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        self.calls.borrow_mut().push(invocation.clone());
        if invocation.args.iter().any(|a| a == "pip") {
            self.record_install(invocation);
        }
        let line = invocation.display();
        let rules = self.rules.borrow();
        let matched = rules
            .iter()
            .find(|(needle, _)| line.contains(needle.as_str()))
            .map(|(_, output)| output.clone());
        Ok(matched.unwrap_or(ToolOutput {
            success: true,
            code: Some(0),
            ..Default::default()
        }))
    }
}
