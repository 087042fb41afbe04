// src/process/supervisor.rs

//! The supervised process: one command descriptor plus the OS process
//! instances that execute it over its scheduled lifetime.

use std::fmt;
use std::future::pending;
use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::command::CommandSpec;
use crate::errors::{InscriptError, Result};
use crate::process::mode::{RunMode, Schedule};
use crate::process::signal;
use crate::process::streams::Streams;
use crate::resources::{FileRegistry, ResourceKey};
use crate::types::StdStream;

/// How one execution of the command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Finished,
    Cancelled,
}

/// The current execution handle: a prepared command and, while it runs,
/// the pid of the live OS process. Swapped as a whole by `refresh`.
struct Execution {
    generation: u64,
    command: Command,
    pid: Option<u32>,
    /// Whether the live instance was already sent an interrupt.
    interrupted: bool,
}

/// Supervisor of one command descriptor.
///
/// Owns exactly one execution handle at a time and the registry leases of
/// its redirected streams. `kill` is idempotent and is the only place the
/// leases are released.
pub struct Process {
    spec: Arc<CommandSpec>,
    label: String,
    schedule: Schedule,
    registry: Arc<FileRegistry>,
    streams: Mutex<Streams>,
    execution: Mutex<Execution>,
    killed: AtomicBool,
    cancel: watch::Sender<bool>,
    invocations: AtomicU32,
}

impl Process {
    /// Resolve the descriptor's redirects and prepare the first execution.
    ///
    /// Fails when an input file is missing or an output file cannot be
    /// opened; in that case nothing stays acquired in the registry.
    pub fn create(spec: Arc<CommandSpec>, registry: Arc<FileRegistry>) -> Result<Self> {
        let label = spec.label();
        let schedule = Schedule::of(&spec);
        let mut streams = Streams::bind(&spec, &registry)?;

        let command = match build_command(&spec, &streams) {
            Ok(c) => c,
            Err(err) => {
                streams.release(&registry);
                return Err(err);
            }
        };

        debug!(
            command = %label,
            mode = ?schedule.mode,
            asynchronous = schedule.asynchronous,
            "process created"
        );

        let (cancel, _) = watch::channel(false);

        Ok(Self {
            spec,
            label,
            schedule,
            registry,
            streams: Mutex::new(streams),
            execution: Mutex::new(Execution {
                generation: 0,
                command,
                pid: None,
                interrupted: false,
            }),
            killed: AtomicBool::new(false),
            cancel,
            invocations: AtomicU32::new(0),
        })
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn mode(&self) -> RunMode {
        self.schedule.mode
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }

    /// How many OS process instances have been started so far.
    pub fn invocations(&self) -> u32 {
        self.invocations.load(Ordering::Acquire)
    }

    /// Generation of the current execution handle; bumped by every refresh.
    pub fn generation(&self) -> u64 {
        self.execution.lock().generation
    }

    /// Registry keys this process still holds.
    pub fn resource_keys(&self) -> Vec<ResourceKey> {
        self.streams.lock().keys()
    }

    /// Execute the command according to its run mode, then kill.
    ///
    /// - `RunOnce` / `RunAsync`: one execution; its failure is returned.
    /// - `Bounded`: up to `times` executions back-to-back, stopping at the
    ///   first failure, which is returned.
    /// - `PeriodicBounded`: like `Bounded` with `every` between executions.
    /// - `Periodic`: executions separated by `every` until one fails; the
    ///   failure is logged and ends the schedule, it is not returned.
    pub async fn run(&self) -> Result<()> {
        info!(command = %self.label, mode = ?self.schedule.mode, "starting command");

        let result = match self.schedule.mode {
            RunMode::RunOnce | RunMode::RunAsync => self.execute().await.map(|_| ()),
            RunMode::Bounded => self.run_bounded(None).await,
            RunMode::PeriodicBounded => self.run_bounded(Some(self.spec.every)).await,
            RunMode::Periodic => {
                self.run_periodic().await;
                Ok(())
            }
        };

        self.kill();
        result
    }

    async fn run_bounded(&self, interval: Option<Duration>) -> Result<()> {
        let times = self.spec.times;

        for iteration in 1..=times {
            if iteration > 1 {
                if let Some(every) = interval {
                    if self.pause(every).await == Exit::Cancelled {
                        return Ok(());
                    }
                }
                // Streams are gone once killed; nothing left to refresh.
                if self.is_killed() {
                    debug!(command = %self.label, iteration, "killed between iterations");
                    return Ok(());
                }
                self.refresh()?;
            }

            debug!(command = %self.label, iteration, times, "bounded iteration");
            if self.execute().await? == Exit::Cancelled {
                return Ok(());
            }
        }

        Ok(())
    }

    async fn run_periodic(&self) {
        let every = self.spec.every;
        let mut iteration: u64 = 0;

        loop {
            iteration += 1;
            debug!(command = %self.label, iteration, "periodic iteration");

            match self.execute().await {
                Ok(Exit::Finished) => {}
                Ok(Exit::Cancelled) => return,
                Err(err) => {
                    error!(
                        command = %self.label,
                        iteration,
                        error = %err,
                        "periodic command failed; schedule stopped"
                    );
                    return;
                }
            }

            if self.is_killed() {
                debug!(command = %self.label, iteration, "killed between iterations");
                return;
            }

            if let Err(err) = self.refresh() {
                error!(command = %self.label, error = %err, "could not prepare next periodic run");
                return;
            }

            if self.pause(every).await == Exit::Cancelled {
                return;
            }
        }
    }

    /// Replace the current execution handle with a fresh one.
    ///
    /// The new handle runs the same program, arguments and working
    /// directory and reuses the already leased stream descriptors; no new
    /// registry references are taken. A still-running previous instance is
    /// interrupted first.
    pub fn refresh(&self) -> Result<()> {
        let command = {
            let streams = self.streams.lock();
            build_command(&self.spec, &streams)?
        };

        let mut exec = self.execution.lock();
        exec.interrupted = false;
        if let Some(pid) = exec.pid.take() {
            debug!(command = %self.label, pid, "interrupting previous instance on refresh");
            if let Err(e) = signal::interrupt_pid(pid) {
                warn!(command = %self.label, pid, error = %e, "failed to interrupt previous instance");
            }
        }
        exec.command = command;
        exec.generation += 1;

        debug!(command = %self.label, generation = exec.generation, "execution refreshed");
        Ok(())
    }

    /// Tear the process down. Only the first call has any effect.
    ///
    /// Background processes get their live OS process interrupted and any
    /// pending sleep or wait cancelled. Every registry lease is released
    /// exactly once.
    pub fn kill(&self) {
        if self
            .killed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        if self.schedule.asynchronous {
            {
                let mut exec = self.execution.lock();
                if let Some(pid) = exec.pid {
                    debug!(command = %self.label, pid, "interrupting background process");
                    match signal::interrupt_pid(pid) {
                        Ok(()) => exec.interrupted = true,
                        Err(e) => {
                            debug!(command = %self.label, pid, error = %e, "interrupt by pid unavailable")
                        }
                    }
                }
            }
            self.cancel.send_replace(true);
        }

        self.streams.lock().release(&self.registry);
        debug!(command = %self.label, "process killed");
    }

    /// Start the current execution handle and wait for it.
    async fn execute(&self) -> Result<Exit> {
        let mut cancel = self.cancel.subscribe();
        if *cancel.borrow_and_update() {
            return Ok(Exit::Cancelled);
        }

        let (mut child, generation) = self.spawn()?;

        let waited = tokio::select! {
            status = child.wait() => status.map(Some),
            _ = cancelled(&mut cancel) => {
                info!(command = %self.label, "cancelling running instance");
                self.interrupt_live(&mut child, generation);
                child.wait().await.map(|_| None)
            }
        };

        self.clear_pid(generation);

        match waited {
            // Exited from our own interrupt before the cancel branch won.
            Ok(Some(status)) if !status.success() && self.is_killed() => Ok(Exit::Cancelled),
            Ok(Some(status)) => self.check_status(status).map(|_| Exit::Finished),
            Ok(None) => Ok(Exit::Cancelled),
            Err(source) => Err(InscriptError::Launch {
                command: self.label.clone(),
                source,
            }),
        }
    }

    fn spawn(&self) -> Result<(Child, u64)> {
        let mut exec = self.execution.lock();
        let child = exec.command.spawn().map_err(|source| InscriptError::Launch {
            command: self.label.clone(),
            source,
        })?;
        exec.pid = child.id();
        exec.interrupted = false;
        let n = self.invocations.fetch_add(1, Ordering::AcqRel) + 1;

        debug!(
            command = %self.label,
            pid = ?exec.pid,
            generation = exec.generation,
            invocation = n,
            "spawned process"
        );
        Ok((child, exec.generation))
    }

    /// Interrupt `child` unless `kill` already did so by pid.
    fn interrupt_live(&self, child: &mut Child, generation: u64) {
        let already = {
            let exec = self.execution.lock();
            exec.generation == generation && exec.interrupted
        };
        if already {
            return;
        }
        if let Err(e) = signal::interrupt(child) {
            warn!(command = %self.label, error = %e, "failed to interrupt cancelled instance");
        }
    }

    fn clear_pid(&self, generation: u64) {
        let mut exec = self.execution.lock();
        if exec.generation == generation {
            exec.pid = None;
        }
    }

    fn check_status(&self, status: ExitStatus) -> Result<()> {
        info!(
            command = %self.label,
            exit_code = status.code().unwrap_or(-1),
            success = status.success(),
            "process exited"
        );
        if status.success() {
            Ok(())
        } else {
            Err(InscriptError::ExitFailure {
                command: self.label.clone(),
                status,
            })
        }
    }

    /// Sleep for `every`, returning early if the process is killed.
    async fn pause(&self, every: Duration) -> Exit {
        let mut cancel = self.cancel.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(every) => Exit::Finished,
            _ = cancelled(&mut cancel) => Exit::Cancelled,
        }
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("label", &self.label)
            .field("schedule", &self.schedule)
            .field("killed", &self.is_killed())
            .finish_non_exhaustive()
    }
}

/// Resolves once the cancel flag is set.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: the process itself was dropped, nothing can
            // cancel us any more.
            pending::<()>().await;
        }
    }
}

fn build_command(spec: &CommandSpec, streams: &Streams) -> Result<Command> {
    let stdio = |stream: StdStream| {
        streams
            .stdio(stream)
            .map_err(|source| InscriptError::Construction {
                command: spec.label(),
                source,
            })
    };

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);
    if let Some(dir) = &spec.working_dir {
        cmd.current_dir(dir);
    }
    cmd.stdin(stdio(StdStream::Stdin)?)
        .stdout(stdio(StdStream::Stdout)?)
        .stderr(stdio(StdStream::Stderr)?);

    Ok(cmd)
}
