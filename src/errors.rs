// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Every error that concerns a single command carries the command's label
//! (its `name`, or `program args…` when unnamed) so the operator can locate
//! it in the command file.

use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InscriptError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Creating the supervised process failed, e.g. an input file is missing.
    #[error("command {command}: {source}")]
    Construction {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A stream target that cannot be applied to the stream it was given for.
    #[error("command {command}: invalid redirect: {reason}")]
    InvalidRedirect { command: String, reason: String },

    /// The OS refused to start the program.
    #[error("command {command}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but did not exit successfully.
    #[error("command {command}: {status}")]
    ExitFailure { command: String, status: ExitStatus },

    #[error("{0} command(s) failed")]
    CommandsFailed(usize),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl InscriptError {
    /// Label of the command this error is about, if any.
    pub fn command(&self) -> Option<&str> {
        match self {
            InscriptError::Construction { command, .. }
            | InscriptError::InvalidRedirect { command, .. }
            | InscriptError::Launch { command, .. }
            | InscriptError::ExitFailure { command, .. } => Some(command),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, InscriptError>;
