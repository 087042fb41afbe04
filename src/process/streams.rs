// src/process/streams.rs

//! Binding of a command's three standard streams.
//!
//! Redirect files are leased from the [`FileRegistry`] once, when the
//! process is constructed, and reused by every refresh of that process.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use tracing::debug;

use crate::command::{CommandSpec, StreamTarget};
use crate::errors::{InscriptError, Result};
use crate::resources::{FileRegistry, ResourceKey, SharedFile};
use crate::types::StdStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Null,
    Inherit(StdStream),
    /// Index into `Streams::leases`.
    Lease(usize),
}

/// The resolved stdin/stdout/stderr of one process and the registry leases
/// backing them.
#[derive(Debug)]
pub struct Streams {
    stdin: Binding,
    stdout: Binding,
    stderr: Binding,
    leases: Vec<SharedFile>,
    released: bool,
}

impl Streams {
    /// Resolve the descriptor's stream targets, acquiring registry entries
    /// for file redirects.
    ///
    /// When stdout and stderr name the same file, stderr reuses stdout's
    /// lease instead of acquiring a second reference. If any step fails, the
    /// leases taken so far are released before returning the error.
    pub fn bind(spec: &CommandSpec, registry: &FileRegistry) -> Result<Self> {
        let mut streams = Streams {
            stdin: Binding::Null,
            stdout: Binding::Null,
            stderr: Binding::Null,
            leases: Vec::new(),
            released: false,
        };

        if let Err(err) = streams.bind_all(spec, registry) {
            streams.release(registry);
            return Err(err);
        }

        Ok(streams)
    }

    fn bind_all(&mut self, spec: &CommandSpec, registry: &FileRegistry) -> Result<()> {
        check_direction(spec, StdStream::Stdin, &spec.stdin)?;
        check_direction(spec, StdStream::Stdout, &spec.stdout)?;
        check_direction(spec, StdStream::Stderr, &spec.stderr)?;

        let stdout_path = spec.stdout.path().map(|p| spec.resolve(p));
        let stderr_path = spec.stderr.path().map(|p| spec.resolve(p));
        let stdin_path = spec.stdin.path().map(|p| spec.resolve(p));

        if let Some(input) = &stdin_path {
            if Some(input) == stdout_path.as_ref() || Some(input) == stderr_path.as_ref() {
                return Err(InscriptError::InvalidRedirect {
                    command: spec.label(),
                    reason: format!(
                        "stdin {} is also used as an output of the same command",
                        input.display()
                    ),
                });
            }
        }

        self.stdout = self.bind_one(spec, registry, &spec.stdout, stdout_path.as_ref(), false)?;

        self.stderr = if stderr_path.is_some() && stderr_path == stdout_path {
            debug!(command = %spec.label(), "stderr shares stdout's redirect");
            self.stdout
        } else {
            self.bind_one(spec, registry, &spec.stderr, stderr_path.as_ref(), false)?
        };

        self.stdin = self.bind_one(spec, registry, &spec.stdin, stdin_path.as_ref(), true)?;

        Ok(())
    }

    fn bind_one(
        &mut self,
        spec: &CommandSpec,
        registry: &FileRegistry,
        target: &StreamTarget,
        path: Option<&PathBuf>,
        input: bool,
    ) -> Result<Binding> {
        match (target, path) {
            (StreamTarget::None, _) => Ok(Binding::Null),
            (StreamTarget::Inherit(s), _) => Ok(Binding::Inherit(*s)),
            (StreamTarget::Path(_), Some(path)) => {
                let key = if input {
                    ResourceKey::read(path)
                } else {
                    ResourceKey::write(path)
                };
                let lease = registry
                    .acquire(&key)
                    .map_err(|source| InscriptError::Construction {
                        command: spec.label(),
                        source: io::Error::new(
                            source.kind(),
                            format!("{}: {}", path.display(), source),
                        ),
                    })?;
                self.leases.push(lease);
                Ok(Binding::Lease(self.leases.len() - 1))
            }
            (StreamTarget::Path(_), None) => {
                unreachable!("path target without a resolved path")
            }
        }
    }

    /// Build a fresh `Stdio` for `stream`. File redirects hand the child a
    /// duplicate of the shared descriptor.
    pub fn stdio(&self, stream: StdStream) -> io::Result<Stdio> {
        let binding = match stream {
            StdStream::Stdin => self.stdin,
            StdStream::Stdout => self.stdout,
            StdStream::Stderr => self.stderr,
        };

        match binding {
            Binding::Null => Ok(Stdio::null()),
            Binding::Inherit(source) if source == stream => Ok(Stdio::inherit()),
            Binding::Inherit(StdStream::Stdout) => Ok(Stdio::from(io::stdout())),
            Binding::Inherit(StdStream::Stderr) => Ok(Stdio::from(io::stderr())),
            Binding::Inherit(StdStream::Stdin) => Ok(Stdio::inherit()),
            Binding::Lease(i) => match self.leases.get(i) {
                Some(lease) if !self.released => Ok(Stdio::from(lease.try_clone_file()?)),
                _ => Err(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "redirect target already released",
                )),
            },
        }
    }

    /// Keys of the registry entries this process holds.
    pub fn keys(&self) -> Vec<ResourceKey> {
        self.leases.iter().map(|l| l.key().clone()).collect()
    }

    /// Give every lease back to the registry. Later calls do nothing.
    pub fn release(&mut self, registry: &FileRegistry) {
        if self.released {
            return;
        }
        self.released = true;
        for lease in self.leases.drain(..) {
            registry.release(lease);
        }
    }
}

fn check_direction(spec: &CommandSpec, stream: StdStream, target: &StreamTarget) -> Result<()> {
    let StreamTarget::Inherit(source) = target else {
        return Ok(());
    };
    if source.is_output() == stream.is_output() {
        return Ok(());
    }
    Err(InscriptError::InvalidRedirect {
        command: spec.label(),
        reason: format!("{stream} cannot inherit the runtime's {source}"),
    })
}
