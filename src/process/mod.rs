// src/process/mod.rs

//! Process supervision layer.
//!
//! - [`mode`] derives a command's run mode (once, background, bounded,
//!   periodic, periodic-bounded).
//! - [`streams`] binds stdin/stdout/stderr, leasing redirect files from the
//!   shared registry.
//! - [`signal`] delivers interrupts in a platform-appropriate way.
//! - [`supervisor`] holds [`Process`] with its `run` / `refresh` / `kill`
//!   operations.
//! - [`factory`] provides the `ProcessFactory` seam the orchestrator uses.

pub mod factory;
pub mod mode;
pub mod signal;
pub mod streams;
pub mod supervisor;

pub use factory::{BoxFuture, OsProcessFactory, ProcessFactory, Supervised};
pub use mode::{RunMode, Schedule};
pub use streams::Streams;
pub use supervisor::Process;
