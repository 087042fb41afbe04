// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the [`Orchestrator`], which turns descriptors into supervised processes
//!   and decides synchronous vs. background launch
//! - the completion channel every command reports on exactly once
//! - the [`Shutdown`] broadcast that an interrupt (Ctrl-C) flows through

pub mod orchestrator;
pub mod shutdown;

use std::time::Duration;

use crate::errors::InscriptError;
use crate::types::ConstructionErrorPolicy;

pub use orchestrator::Orchestrator;
pub use shutdown::{Shutdown, ShutdownListener};

/// Default delay between two launches, to avoid a thundering herd on shared
/// redirect files.
pub const DEFAULT_STAGGER: Duration = Duration::from_millis(10);

/// Options used by the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Delay inserted before every launch after the first.
    pub stagger: Duration,
    pub on_construction_error: ConstructionErrorPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            stagger: DEFAULT_STAGGER,
            on_construction_error: ConstructionErrorPolicy::default(),
        }
    }
}

/// Sent once per command when its run (or skipped construction) is over.
#[derive(Debug)]
pub struct Completion {
    /// Position of the command in the batch.
    pub index: usize,
    pub label: String,
    pub result: crate::errors::Result<()>,
}

/// One command that did not succeed.
#[derive(Debug)]
pub struct CommandFailure {
    pub index: usize,
    pub command: String,
    pub error: InscriptError,
}

/// Outcome of one orchestrator run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub total: usize,
    /// Completion signals received (successful or not).
    pub completed: usize,
    /// Commands dropped by the `skip` construction-error policy.
    pub skipped: usize,
    pub failures: Vec<CommandFailure>,
    /// Whether the run ended because of an interrupt.
    pub interrupted: bool,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        !self.interrupted && self.failures.is_empty() && self.completed == self.total
    }
}
