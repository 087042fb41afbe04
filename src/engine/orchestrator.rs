// src/engine/orchestrator.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::command::CommandSpec;
use crate::errors::Result;
use crate::process::{ProcessFactory, Supervised};
use crate::types::ConstructionErrorPolicy;

use super::shutdown::{Shutdown, ShutdownListener};
use super::{CommandFailure, Completion, RunOptions, RunReport};

/// Top-level driver: one supervised process per descriptor, launched in
/// descriptor order.
///
/// Synchronous commands run inline and block the launch loop; asynchronous
/// ones run on their own Tokio task. Every command, whichever way it ran,
/// reports exactly one [`Completion`] on a channel sized to the batch, so
/// the final wait always terminates unless an interrupt arrives first.
pub struct Orchestrator<F: ProcessFactory> {
    factory: F,
    options: RunOptions,
}

impl<F: ProcessFactory> fmt::Debug for Orchestrator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Why the launch or wait phase stopped early.
enum Stop {
    Interrupted,
}

impl<F: ProcessFactory> Orchestrator<F> {
    pub fn new(factory: F, options: RunOptions) -> Self {
        Self { factory, options }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Run the whole batch.
    ///
    /// Returns when every command has completed, or as soon as `shutdown`
    /// fires. On interrupt every created process is killed but background
    /// ones are not joined. Under [`ConstructionErrorPolicy::Abort`] a
    /// construction error kills everything launched so far and is returned.
    pub async fn run(&self, commands: Vec<CommandSpec>, shutdown: &Shutdown) -> Result<RunReport> {
        let total = commands.len();
        let mut report = RunReport {
            total,
            ..RunReport::default()
        };
        if total == 0 {
            info!("no commands to run");
            return Ok(report);
        }

        let mut signal = shutdown.subscribe();
        let (done_tx, mut done_rx) = mpsc::channel::<Completion>(total);
        let mut launched: Vec<Arc<F::Process>> = Vec::with_capacity(total);

        info!(commands = total, "launching commands");

        for (index, spec) in commands.into_iter().enumerate() {
            if index > 0 && !self.options.stagger.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.options.stagger) => {}
                    _ = signal.triggered() => {
                        return Ok(self.interrupted(report, &launched));
                    }
                }
            }
            if shutdown.is_triggered() {
                return Ok(self.interrupted(report, &launched));
            }

            let spec = Arc::new(spec);
            let label = spec.label();

            let process = match self.factory.create(Arc::clone(&spec)) {
                Ok(p) => p,
                Err(err) => match self.options.on_construction_error {
                    ConstructionErrorPolicy::Abort => {
                        error!(command = %label, error = %err, "could not create command; aborting");
                        kill_all(&launched);
                        return Err(err);
                    }
                    ConstructionErrorPolicy::Skip => {
                        warn!(command = %label, error = %err, "could not create command; skipping");
                        report.skipped += 1;
                        send_completion(&done_tx, Completion {
                            index,
                            label,
                            result: Err(err),
                        });
                        continue;
                    }
                },
            };

            launched.push(Arc::clone(&process));
            let schedule = process.schedule();
            debug!(command = %process.label(), index, mode = ?schedule.mode, asynchronous = schedule.asynchronous, "launching");

            if schedule.asynchronous {
                let tx = done_tx.clone();
                tokio::spawn(async move {
                    let result = process.run().await;
                    let _ = tx.send(Completion { index, label, result }).await;
                });
                continue;
            }

            let run = Arc::clone(&process).run();
            match run_inline(run, &mut signal).await {
                Ok(result) => send_completion(&done_tx, Completion { index, label, result }),
                Err(Stop::Interrupted) => {
                    return Ok(self.interrupted(report, &launched));
                }
            }
        }

        // Only background tasks hold senders from here on.
        drop(done_tx);

        for _ in 0..total {
            tokio::select! {
                completion = done_rx.recv() => match completion {
                    Some(c) => record(&mut report, c),
                    None => {
                        warn!(
                            completed = report.completed,
                            total,
                            "completion channel closed early; a command task ended without reporting"
                        );
                        break;
                    }
                },
                _ = signal.triggered() => {
                    return Ok(self.interrupted(report, &launched));
                }
            }
        }

        info!(
            completed = report.completed,
            failed = report.failures.len(),
            skipped = report.skipped,
            "all commands completed"
        );
        Ok(report)
    }

    fn interrupted(&self, mut report: RunReport, launched: &[Arc<F::Process>]) -> RunReport {
        info!(
            launched = launched.len(),
            completed = report.completed,
            "interrupted; killing processes"
        );
        kill_all(launched);
        report.interrupted = true;
        report
    }
}

/// Run a synchronous command, giving up on it if shutdown fires first.
async fn run_inline(
    run: crate::process::BoxFuture<Result<()>>,
    signal: &mut ShutdownListener,
) -> std::result::Result<Result<()>, Stop> {
    tokio::select! {
        result = run => Ok(result),
        _ = signal.triggered() => Err(Stop::Interrupted),
    }
}

fn kill_all<P: Supervised>(launched: &[Arc<P>]) {
    for process in launched {
        debug!(command = %process.label(), "killing");
        process.kill();
    }
}

/// The channel has one slot per command and each command reports once, so
/// this never has to wait.
fn send_completion(tx: &mpsc::Sender<Completion>, completion: Completion) {
    if let Err(e) = tx.try_send(completion) {
        unreachable!("completion channel full or closed: {e}");
    }
}

fn record(report: &mut RunReport, completion: Completion) {
    report.completed += 1;
    match completion.result {
        Ok(()) => debug!(command = %completion.label, "command completed"),
        Err(err) => {
            error!(command = %completion.label, error = %err, "command failed");
            report.failures.push(CommandFailure {
                index: completion.index,
                command: completion.label,
                error: err,
            });
        }
    }
}
