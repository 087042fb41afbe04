// src/config/validate.rs

use std::path::PathBuf;

use crate::command::{CommandSpec, StreamTarget};
use crate::config::duration::parse_interval;
use crate::config::model::{CommandEntry, DefaultSection, RawScriptFile, ScriptFile};
use crate::errors::{InscriptError, Result};
use crate::types::StdStream;

impl TryFrom<RawScriptFile> for ScriptFile {
    type Error = InscriptError;

    fn try_from(raw: RawScriptFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_script(&raw)?;
        Ok(ScriptFile::new_unchecked(raw.config, raw.default, raw.command))
    }
}

fn validate_raw_script(raw: &RawScriptFile) -> Result<()> {
    ensure_has_commands(raw)?;
    validate_defaults(&raw.default)?;
    Ok(())
}

fn ensure_has_commands(raw: &RawScriptFile) -> Result<()> {
    if raw.command.is_empty() {
        return Err(InscriptError::ConfigError(
            "command file must contain at least one [[command]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_defaults(default: &DefaultSection) -> Result<()> {
    let ctx = "[default]";
    if let Some(s) = &default.stdin {
        stream_target(ctx, StdStream::Stdin, s)?;
    }
    if let Some(s) = &default.stdout {
        stream_target(ctx, StdStream::Stdout, s)?;
    }
    if let Some(s) = &default.stderr {
        stream_target(ctx, StdStream::Stderr, s)?;
    }
    Ok(())
}

impl ScriptFile {
    /// Descriptors in file order, produced lazily.
    ///
    /// Iteration ends with `None`; a malformed entry yields `Some(Err(_))`,
    /// after which callers should stop consuming.
    pub fn commands(&self) -> impl Iterator<Item = Result<CommandSpec>> + '_ {
        self.entries()
            .iter()
            .enumerate()
            .map(|(index, entry)| to_spec(index, entry, self.defaults()))
    }
}

/// Turn one entry into a descriptor, applying `[default]` and the front-end
/// guarantees: `every` is 0 or ≥ 30s, negative `times` becomes 0, stream
/// targets are valid for the stream they are given for.
pub fn to_spec(index: usize, entry: &CommandEntry, default: &DefaultSection) -> Result<CommandSpec> {
    let ctx = format!("command '{}'", entry.display_name(index));

    let program = entry.program.trim();
    if program.is_empty() {
        return Err(InscriptError::ConfigError(format!(
            "{ctx}: `program` must not be empty"
        )));
    }

    let every = parse_interval(entry.every.as_deref().unwrap_or(""))
        .map_err(|e| InscriptError::ConfigError(format!("{ctx}: {e}")))?;

    let times = match entry.times {
        None => 0,
        Some(n) if n < 0 => 0,
        Some(n) => u32::try_from(n).map_err(|_| {
            InscriptError::ConfigError(format!("{ctx}: `times` = {n} is too large"))
        })?,
    };

    let dir = entry
        .dir
        .as_ref()
        .or(default.dir.as_ref())
        .filter(|d| !d.is_empty())
        .map(PathBuf::from);

    let pick = |own: &Option<String>, fallback: &Option<String>| {
        own.as_ref().or(fallback.as_ref()).cloned().unwrap_or_default()
    };

    Ok(CommandSpec {
        program: program.to_string(),
        args: entry.args.clone(),
        working_dir: dir,
        name: entry.name.clone().filter(|n| !n.is_empty()),
        stdin: stream_target(&ctx, StdStream::Stdin, &pick(&entry.stdin, &default.stdin))?,
        stdout: stream_target(&ctx, StdStream::Stdout, &pick(&entry.stdout, &default.stdout))?,
        stderr: stream_target(&ctx, StdStream::Stderr, &pick(&entry.stderr, &default.stderr))?,
        sync: entry.sync.or(default.sync).unwrap_or(false),
        every,
        times,
    })
}

/// Parse a stream target and check it makes sense for `stream`: `!stdin`
/// only for stdin, `!stdout` / `!stderr` only for output streams.
fn stream_target(ctx: &str, stream: StdStream, raw: &str) -> Result<StreamTarget> {
    let target = StreamTarget::parse(raw);
    if let StreamTarget::Inherit(source) = target {
        if source.is_output() != stream.is_output() {
            return Err(InscriptError::ConfigError(format!(
                "{ctx}: {stream} = \"{raw}\" is not a valid {stream} target"
            )));
        }
    }
    Ok(target)
}
