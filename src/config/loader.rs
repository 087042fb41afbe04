// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{RawScriptFile, ScriptFile};
use crate::errors::Result;

/// Load a command file from a given path and return the raw `RawScriptFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawScriptFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    load_from_str(&contents)
}

pub fn load_from_str(contents: &str) -> Result<RawScriptFile> {
    let script: RawScriptFile = toml::from_str(contents)?;
    Ok(script)
}

/// Load a command file from path and run basic validation.
///
/// Per-command conversion into descriptors happens lazily through
/// [`ScriptFile::commands`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ScriptFile> {
    let raw = load_from_path(&path)?;
    ScriptFile::try_from(raw)
}
