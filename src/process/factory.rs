// src/process/factory.rs

//! Pluggable process construction.
//!
//! The orchestrator talks to a [`ProcessFactory`] instead of building
//! [`Process`]es directly, so tests can swap in fakes that never touch the
//! OS while production uses [`OsProcessFactory`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::command::CommandSpec;
use crate::errors::Result;
use crate::process::mode::Schedule;
use crate::process::supervisor::Process;
use crate::resources::FileRegistry;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// What the orchestrator needs from a supervised command.
pub trait Supervised: Send + Sync + 'static {
    fn label(&self) -> &str;

    fn schedule(&self) -> Schedule;

    /// Run the command's whole schedule. Implementations release their
    /// resources before the future resolves.
    fn run(self: Arc<Self>) -> BoxFuture<Result<()>>;

    /// Idempotent teardown.
    fn kill(&self);
}

/// Turns descriptors into supervised processes.
pub trait ProcessFactory: Send + Sync {
    type Process: Supervised;

    fn create(&self, spec: Arc<CommandSpec>) -> Result<Arc<Self::Process>>;
}

impl Supervised for Process {
    fn label(&self) -> &str {
        Process::label(self)
    }

    fn schedule(&self) -> Schedule {
        Process::schedule(self)
    }

    fn run(self: Arc<Self>) -> BoxFuture<Result<()>> {
        Box::pin(async move { Process::run(&self).await })
    }

    fn kill(&self) {
        Process::kill(self)
    }
}

/// Production factory: real OS processes sharing one [`FileRegistry`].
#[derive(Debug, Clone, Default)]
pub struct OsProcessFactory {
    registry: Arc<FileRegistry>,
}

impl OsProcessFactory {
    pub fn new(registry: Arc<FileRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<FileRegistry> {
        &self.registry
    }
}

impl ProcessFactory for OsProcessFactory {
    type Process = Process;

    fn create(&self, spec: Arc<CommandSpec>) -> Result<Arc<Process>> {
        Process::create(spec, Arc::clone(&self.registry)).map(Arc::new)
    }
}
