// src/process/mode.rs

use crate::command::CommandSpec;

/// How a supervised command is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Run once; the orchestrator waits for it.
    RunOnce,
    /// Run once in the background.
    RunAsync,
    /// Run `times` times back-to-back.
    Bounded,
    /// Run forever, sleeping `every` between runs, until a run fails.
    Periodic,
    /// Run `times` times, sleeping `every` between runs.
    PeriodicBounded,
}

/// Run mode plus whether the orchestrator launches it in the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub mode: RunMode,
    pub asynchronous: bool,
}

impl Schedule {
    /// Derive the schedule of a descriptor. Evaluated once per process, in
    /// this precedence: `every` and `times` → `PeriodicBounded`; `times` →
    /// `Bounded`; `every` → `Periodic` (always async); otherwise `RunOnce`
    /// or `RunAsync` depending on `sync`.
    pub fn of(spec: &CommandSpec) -> Self {
        let periodic = !spec.every.is_zero();
        let bounded = spec.times > 0;

        let (mode, asynchronous) = match (periodic, bounded) {
            (true, true) => (RunMode::PeriodicBounded, !spec.sync),
            (false, true) => (RunMode::Bounded, !spec.sync),
            (true, false) => (RunMode::Periodic, true),
            (false, false) if spec.sync => (RunMode::RunOnce, false),
            (false, false) => (RunMode::RunAsync, true),
        };

        Self { mode, asynchronous }
    }
}

impl RunMode {
    pub fn repeats(self) -> bool {
        matches!(
            self,
            RunMode::Bounded | RunMode::Periodic | RunMode::PeriodicBounded
        )
    }
}
