// src/lib.rs

pub mod cli;
pub mod command;
pub mod config;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod process;
pub mod resources;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::command::CommandSpec;
use crate::config::loader::load_and_validate;
use crate::config::model::ScriptFile;
use crate::engine::{Orchestrator, RunOptions, RunReport, Shutdown};
use crate::errors::InscriptError;
use crate::process::{OsProcessFactory, Schedule};
use crate::resources::FileRegistry;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - command file loading and descriptor production
/// - the shared file registry and the OS process factory
/// - the orchestrator
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let script = load_and_validate(&args.script)?;

    // A malformed entry stops descriptor production; nothing is launched.
    let commands = script
        .commands()
        .collect::<std::result::Result<Vec<CommandSpec>, InscriptError>>()?;

    if args.dry_run {
        print_dry_run(&script, &commands);
        return Ok(());
    }

    let options = RunOptions {
        stagger: Duration::from_millis(script.config().stagger_ms),
        on_construction_error: args
            .on_construction_error
            .unwrap_or(script.config().on_construction_error),
    };

    // Ctrl-C → interrupt broadcast.
    let shutdown = Shutdown::new();
    let _ctrl_c = shutdown.listen_for_ctrl_c();

    let registry = Arc::new(FileRegistry::new());
    let orchestrator = Orchestrator::new(OsProcessFactory::new(Arc::clone(&registry)), options);

    info!(script = %args.script.display(), commands = commands.len(), "starting");
    let report = orchestrator.run(commands, &shutdown).await?;

    if !registry.is_empty() && !report.interrupted {
        warn!(open = registry.len(), "redirect files still open after all commands completed");
    }

    finish(report)
}

/// Turn a finished run into the process outcome.
fn finish(report: RunReport) -> Result<()> {
    if report.interrupted {
        info!(completed = report.completed, total = report.total, "run interrupted");
        return Ok(());
    }
    if report.failures.is_empty() {
        return Ok(());
    }
    for failure in &report.failures {
        debug!(index = failure.index, command = %failure.command, "failed");
    }
    Err(InscriptError::CommandsFailed(report.failures.len()).into())
}

/// Simple dry-run output: print each command and how it would be scheduled.
fn print_dry_run(script: &ScriptFile, commands: &[CommandSpec]) {
    println!("inscript dry-run");
    println!(
        "  config.on_construction_error = {:?}",
        script.config().on_construction_error
    );
    println!("  config.stagger_ms = {}", script.config().stagger_ms);
    println!();

    println!("commands ({}):", commands.len());
    for spec in commands {
        let schedule = Schedule::of(spec);
        println!("  - {}", spec.label());
        println!("      program: {}", spec.program);
        if !spec.args.is_empty() {
            println!("      args: {:?}", spec.args);
        }
        if let Some(ref dir) = spec.working_dir {
            println!("      dir: {}", dir.display());
        }
        println!(
            "      mode: {:?} ({})",
            schedule.mode,
            if schedule.asynchronous { "background" } else { "waited for" }
        );
        if !spec.every.is_zero() {
            println!("      every: {:?}", spec.every);
        }
        if spec.times > 0 {
            println!("      times: {}", spec.times);
        }
        for (stream, target) in [
            ("stdin", &spec.stdin),
            ("stdout", &spec.stdout),
            ("stderr", &spec.stderr),
        ] {
            if !target.is_none() {
                println!("      {stream}: {target}");
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
