// src/config/mod.rs

//! Front end: command files.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a command file from disk (`loader.rs`).
//! - Validate it and turn entries into descriptors (`validate.rs`).
//! - Parse interval strings (`duration.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::{MIN_INTERVAL, parse_duration, parse_interval};
pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{CommandEntry, ConfigSection, DefaultSection, RawScriptFile, ScriptFile};
pub use validate::to_spec;
