// src/config/model.rs

use serde::Deserialize;

use crate::types::ConstructionErrorPolicy;

/// Top-level command file as read from TOML.
///
/// ```toml
/// [config]
/// on_construction_error = "abort"
/// stagger_ms = 10
///
/// [default]
/// stdout = "!stdout"
///
/// [[command]]
/// name = "greet"
/// program = "echo"
/// args = ["hi"]
/// sync = true
/// ```
///
/// This is the raw form; it becomes a [`ScriptFile`] after validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawScriptFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub default: DefaultSection,

    /// `[[command]]` entries, in launch order.
    #[serde(default)]
    pub command: Vec<CommandEntry>,
}

/// Validated command file.
///
/// Fields are private to ensure this struct can only be created via
/// `TryFrom<RawScriptFile>`, which performs validation.
#[derive(Debug, Clone)]
pub struct ScriptFile {
    config: ConfigSection,
    default: DefaultSection,
    command: Vec<CommandEntry>,
}

impl ScriptFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        default: DefaultSection,
        command: Vec<CommandEntry>,
    ) -> Self {
        Self {
            config,
            default,
            command,
        }
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn defaults(&self) -> &DefaultSection {
        &self.default
    }

    pub fn entries(&self) -> &[CommandEntry] {
        &self.command
    }
}

/// `[config]` section: runtime behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// `"abort"` (default) or `"skip"`.
    #[serde(default)]
    pub on_construction_error: ConstructionErrorPolicy,

    /// Delay between two launches, in milliseconds.
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,
}

fn default_stagger_ms() -> u64 {
    10
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            on_construction_error: ConstructionErrorPolicy::default(),
            stagger_ms: default_stagger_ms(),
        }
    }
}

/// `[default]` section: values applied to every command that does not set
/// the field itself.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultSection {
    #[serde(default, alias = "working_directory")]
    pub dir: Option<String>,

    #[serde(default)]
    pub sync: Option<bool>,

    #[serde(default)]
    pub stdin: Option<String>,

    #[serde(default)]
    pub stdout: Option<String>,

    #[serde(default)]
    pub stderr: Option<String>,
}

/// One `[[command]]` entry.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CommandEntry {
    /// Optional label for diagnostics.
    #[serde(default)]
    pub name: Option<String>,

    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory; empty or absent inherits the runtime's.
    #[serde(default, alias = "working_directory")]
    pub dir: Option<String>,

    /// Whether the orchestrator waits for this command.
    #[serde(default)]
    pub sync: Option<bool>,

    /// `""`, `"!stdin"` or a path.
    #[serde(default)]
    pub stdin: Option<String>,

    /// `""`, `"!stdout"`, `"!stderr"` or a path.
    #[serde(default)]
    pub stdout: Option<String>,

    /// `""`, `"!stdout"`, `"!stderr"` or a path.
    #[serde(default)]
    pub stderr: Option<String>,

    /// Repeat interval such as `"30s"`, `"5m"` or `"1h"`; at least 30s.
    #[serde(default)]
    pub every: Option<String>,

    /// Repeat count; negative values mean 0.
    #[serde(default)]
    pub times: Option<i64>,
}

impl CommandEntry {
    /// Name if set, otherwise the program, for validation messages.
    pub fn display_name(&self, index: usize) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ if !self.program.trim().is_empty() => self.program.clone(),
            _ => format!("#{}", index + 1),
        }
    }
}
