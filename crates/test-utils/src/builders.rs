#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use inscript::command::{CommandSpec, StreamTarget};
use inscript::config::{
    CommandEntry, ConfigSection, DefaultSection, RawScriptFile, ScriptFile,
};
use inscript::types::{ConstructionErrorPolicy, StdStream};

/// Builder for `CommandSpec` to simplify test setup.
pub struct CommandSpecBuilder {
    spec: CommandSpec,
}

impl CommandSpecBuilder {
    pub fn new(program: &str) -> Self {
        Self {
            spec: CommandSpec::new(program),
        }
    }

    /// `sh -c <script>`, handy for commands that append to files.
    pub fn shell(script: &str) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.spec.args.push(arg.to_string());
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.spec.name = Some(name.to_string());
        self
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spec.working_dir = Some(dir.into());
        self
    }

    pub fn sync(mut self, val: bool) -> Self {
        self.spec.sync = val;
        self
    }

    pub fn stdin_path(mut self, path: &str) -> Self {
        self.spec.stdin = StreamTarget::Path(path.to_string());
        self
    }

    pub fn stdout_path(mut self, path: &str) -> Self {
        self.spec.stdout = StreamTarget::Path(path.to_string());
        self
    }

    pub fn stderr_path(mut self, path: &str) -> Self {
        self.spec.stderr = StreamTarget::Path(path.to_string());
        self
    }

    pub fn stdout_inherit(mut self, stream: StdStream) -> Self {
        self.spec.stdout = StreamTarget::Inherit(stream);
        self
    }

    pub fn stderr_inherit(mut self, stream: StdStream) -> Self {
        self.spec.stderr = StreamTarget::Inherit(stream);
        self
    }

    pub fn every(mut self, every: Duration) -> Self {
        self.spec.every = every;
        self
    }

    pub fn times(mut self, times: u32) -> Self {
        self.spec.times = times;
        self
    }

    pub fn build(self) -> CommandSpec {
        self.spec
    }
}

/// Builder for `ScriptFile`.
pub struct ScriptFileBuilder {
    script: RawScriptFile,
}

impl ScriptFileBuilder {
    pub fn new() -> Self {
        Self {
            script: RawScriptFile {
                config: ConfigSection::default(),
                default: DefaultSection::default(),
                command: vec![],
            },
        }
    }

    pub fn with_command(mut self, entry: CommandEntry) -> Self {
        self.script.command.push(entry);
        self
    }

    pub fn on_construction_error(mut self, policy: ConstructionErrorPolicy) -> Self {
        self.script.config.on_construction_error = policy;
        self
    }

    pub fn with_default_dir(mut self, dir: &str) -> Self {
        self.script.default.dir = Some(dir.to_string());
        self
    }

    pub fn with_default_stdout(mut self, target: &str) -> Self {
        self.script.default.stdout = Some(target.to_string());
        self
    }

    pub fn with_default_sync(mut self, val: bool) -> Self {
        self.script.default.sync = Some(val);
        self
    }

    pub fn build_raw(self) -> RawScriptFile {
        self.script
    }

    pub fn build(self) -> ScriptFile {
        ScriptFile::try_from(self.script).expect("Failed to build valid script from builder")
    }
}

impl Default for ScriptFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A `[[command]]` entry running `program` with nothing else set.
pub fn entry(program: &str) -> CommandEntry {
    CommandEntry {
        program: program.to_string(),
        ..CommandEntry::default()
    }
}
