// src/resources/mod.rs

//! Shared file resources used for stream redirection.
//!
//! Several commands may redirect to the same file. The [`FileRegistry`]
//! keeps one open descriptor per resolved path and access mode and hands
//! out counted [`SharedFile`] leases; the descriptor is closed once the last
//! lease is released.
//!
//! The registry is an explicit object owned by the orchestrator and passed
//! to every process at construction, not ambient global state.

pub mod registry;

pub use registry::{Access, FileRegistry, ResourceKey, SharedFile};
