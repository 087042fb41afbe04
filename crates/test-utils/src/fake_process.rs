use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tracing::debug;

use inscript::command::CommandSpec;
use inscript::errors::{InscriptError, Result};
use inscript::process::{BoxFuture, ProcessFactory, Schedule, Supervised};

/// What a fake command does when run.
#[derive(Clone, Debug)]
pub enum Behaviour {
    /// Complete successfully right away.
    Succeed,
    /// Complete with an error right away.
    Fail,
    /// Complete successfully after the given delay.
    Delay(Duration),
    /// Wait until the notify fires (or the process is killed).
    Gate(Arc<Notify>),
    /// Never complete on its own; only `kill` ends it.
    Hang,
}

/// Shared record of what the fakes did, in the order it happened.
#[derive(Debug, Default)]
pub struct FakeLog {
    pub created: Mutex<Vec<String>>,
    pub started: Mutex<Vec<String>>,
    pub finished: Mutex<Vec<String>>,
    pub killed: Mutex<Vec<String>>,
}

impl FakeLog {
    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }

    pub fn killed(&self) -> Vec<String> {
        self.killed.lock().unwrap().clone()
    }
}

/// A fake factory that:
/// - records which commands were created, started, finished and killed
/// - fails construction for chosen labels
/// - runs each command according to a per-label [`Behaviour`]
///   (default: [`Behaviour::Succeed`]).
#[derive(Default)]
pub struct FakeFactory {
    log: Arc<FakeLog>,
    behaviours: HashMap<String, Behaviour>,
    fail_construction: Vec<String>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Arc<FakeLog> {
        Arc::clone(&self.log)
    }

    pub fn behave(mut self, label: &str, behaviour: Behaviour) -> Self {
        self.behaviours.insert(label.to_string(), behaviour);
        self
    }

    pub fn fail_construction(mut self, label: &str) -> Self {
        self.fail_construction.push(label.to_string());
        self
    }
}

impl ProcessFactory for FakeFactory {
    type Process = FakeProcess;

    fn create(&self, spec: Arc<CommandSpec>) -> Result<Arc<FakeProcess>> {
        let label = spec.label();
        if self.fail_construction.contains(&label) {
            return Err(InscriptError::Construction {
                command: label,
                source: io::Error::new(io::ErrorKind::NotFound, "fake construction failure"),
            });
        }

        self.log.created.lock().unwrap().push(label.clone());
        let (cancel, _) = watch::channel(false);

        Ok(Arc::new(FakeProcess {
            schedule: Schedule::of(&spec),
            behaviour: self
                .behaviours
                .get(&label)
                .cloned()
                .unwrap_or(Behaviour::Succeed),
            label,
            log: Arc::clone(&self.log),
            killed: AtomicBool::new(false),
            cancel,
        }))
    }
}

/// A supervised command that never touches the OS.
pub struct FakeProcess {
    label: String,
    schedule: Schedule,
    behaviour: Behaviour,
    log: Arc<FakeLog>,
    killed: AtomicBool,
    cancel: watch::Sender<bool>,
}

impl FakeProcess {
    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }

    async fn until_killed(&self) {
        let mut rx = self.cancel.subscribe();
        // The sender lives in `self`, so `wait_for` cannot fail here.
        let _ = rx.wait_for(|killed| *killed).await;
    }
}

impl Supervised for FakeProcess {
    fn label(&self) -> &str {
        &self.label
    }

    fn schedule(&self) -> Schedule {
        self.schedule
    }

    fn run(self: Arc<Self>) -> BoxFuture<Result<()>> {
        Box::pin(async move {
            self.log.started.lock().unwrap().push(self.label.clone());
            debug!(command = %self.label, behaviour = ?self.behaviour, "fake run");

            let result = match &self.behaviour {
                Behaviour::Succeed => Ok(()),
                Behaviour::Fail => Err(InscriptError::Other(anyhow::anyhow!(
                    "fake failure in {}",
                    self.label
                ))),
                Behaviour::Delay(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(())
                }
                Behaviour::Gate(gate) => {
                    tokio::select! {
                        _ = gate.notified() => {}
                        _ = self.until_killed() => {}
                    }
                    Ok(())
                }
                Behaviour::Hang => {
                    self.until_killed().await;
                    Ok(())
                }
            };

            self.log.finished.lock().unwrap().push(self.label.clone());
            self.kill();
            result
        })
    }

    fn kill(&self) {
        if self
            .killed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.log.killed.lock().unwrap().push(self.label.clone());
        self.cancel.send_replace(true);
    }
}
