// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::ConstructionErrorPolicy;

/// Command-line arguments for `inscript`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "inscript",
    version,
    about = "Run and supervise the commands listed in a command file.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the command file (TOML).
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `INSCRIPT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// What to do when a command cannot be set up (abort or skip).
    ///
    /// Overrides `[config].on_construction_error`.
    #[arg(long, value_name = "POLICY")]
    pub on_construction_error: Option<ConstructionErrorPolicy>,

    /// Parse + validate, print the commands and their run modes, but don't
    /// execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
