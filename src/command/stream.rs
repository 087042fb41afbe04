// src/command/stream.rs

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::types::StdStream;

/// Where one of a command's standard streams is connected.
///
/// Replaces the `!stdin` / `!stdout` / `!stderr` magic strings of command
/// files with a tagged value, so a literal file called `!stdout` is simply
/// `Path("./!stdout")`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StreamTarget {
    /// Not redirected: the child gets the null device.
    #[default]
    None,
    /// Inherit the runtime's own corresponding stream.
    Inherit(StdStream),
    /// A filesystem path, relative to the command's working directory.
    Path(String),
}

impl StreamTarget {
    /// Parse the command-file spelling: empty, a sentinel, or a path.
    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return StreamTarget::None;
        }
        match StdStream::from_sentinel(s) {
            Some(stream) => StreamTarget::Inherit(stream),
            None => StreamTarget::Path(s.to_string()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, StreamTarget::None)
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            StreamTarget::Path(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Display for StreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamTarget::None => f.write_str("(none)"),
            StreamTarget::Inherit(s) => f.write_str(s.sentinel()),
            StreamTarget::Path(p) => f.write_str(p),
        }
    }
}

/// Resolve a redirect path against an optional working directory.
///
/// Absolute paths are kept; relative ones are joined onto `dir` (or left
/// relative to the runtime's own cwd when `dir` is unset). `.` components
/// are dropped so `./out.log` and `out.log` name the same registry entry.
/// `..` is kept as written.
pub fn resolve_path(dir: Option<&Path>, path: &str) -> PathBuf {
    let p = Path::new(path);
    let joined = match dir {
        Some(dir) if p.is_relative() => dir.join(p),
        _ => p.to_path_buf(),
    };

    let normalized: PathBuf = joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}
