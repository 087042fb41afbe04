use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// What the orchestrator does when a command cannot be turned into a
/// supervised process (missing input file, unwritable output, ...).
///
/// - `Abort`: kill everything launched so far and fail the whole run
///   (default).
/// - `Skip`: log the error, count the command as completed and keep going
///   with the rest of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConstructionErrorPolicy {
    #[default]
    Abort,
    Skip,
}

impl FromStr for ConstructionErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(ConstructionErrorPolicy::Abort),
            "skip" => Ok(ConstructionErrorPolicy::Skip),
            other => Err(format!(
                "invalid on_construction_error: {other} (expected \"abort\" or \"skip\")"
            )),
        }
    }
}

/// One of the runtime's own standard streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StdStream {
    Stdin,
    Stdout,
    Stderr,
}

impl StdStream {
    /// The sentinel spelling used in command files (`!stdout`, ...).
    pub fn sentinel(self) -> &'static str {
        match self {
            StdStream::Stdin => "!stdin",
            StdStream::Stdout => "!stdout",
            StdStream::Stderr => "!stderr",
        }
    }

    pub fn from_sentinel(s: &str) -> Option<Self> {
        match s {
            "!stdin" => Some(StdStream::Stdin),
            "!stdout" => Some(StdStream::Stdout),
            "!stderr" => Some(StdStream::Stderr),
            _ => None,
        }
    }

    pub fn is_output(self) -> bool {
        !matches!(self, StdStream::Stdin)
    }
}

impl fmt::Display for StdStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StdStream::Stdin => "stdin",
            StdStream::Stdout => "stdout",
            StdStream::Stderr => "stderr",
        };
        f.write_str(s)
    }
}
