// src/command/mod.rs

//! Command descriptors: the normalized output of the front end.
//!
//! A [`CommandSpec`] is pure data. It says which program to run, with which
//! arguments and working directory, where its standard streams go, and how
//! it should be scheduled (`sync`, `every`, `times`). It is immutable once
//! produced and shared by reference with the supervising [`Process`].
//!
//! [`Process`]: crate::process::Process

pub mod stream;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub use stream::{StreamTarget, resolve_path};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// `None` means inherit the runtime's working directory.
    pub working_dir: Option<PathBuf>,
    /// Optional label used in diagnostics.
    pub name: Option<String>,
    pub stdin: StreamTarget,
    pub stdout: StreamTarget,
    pub stderr: StreamTarget,
    pub sync: bool,
    /// Repeat interval; zero means "not periodic".
    pub every: Duration,
    /// Bounded repeat count; zero means unbounded (periodic) or once.
    pub times: u32,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Label used in logs and errors: the name if set, else `program args…`.
    pub fn label(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        let mut s = self.program.clone();
        for arg in &self.args {
            s.push(' ');
            s.push_str(arg);
        }
        s
    }

    /// Resolve a redirect path for this command.
    pub fn resolve(&self, path: &str) -> PathBuf {
        resolve_path(self.working_dir.as_deref(), path)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
