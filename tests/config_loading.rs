// tests/config_loading.rs

use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;

use inscript::command::{StreamTarget, resolve_path};
use inscript::config::{load_and_validate, load_from_str, parse_duration, parse_interval};
use inscript::config::model::ScriptFile;
use inscript::errors::InscriptError;
use inscript::types::{ConstructionErrorPolicy, StdStream};
use inscript_test_utils::builders::{ScriptFileBuilder, entry};

type TestResult = Result<(), Box<dyn Error>>;

fn script_from(toml: &str) -> Result<ScriptFile, InscriptError> {
    ScriptFile::try_from(load_from_str(toml)?)
}

#[test]
fn full_command_file_is_loaded() -> TestResult {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
[config]
on_construction_error = "skip"
stagger_ms = 0

[default]
stdout = "!stdout"
stderr = "!stderr"

[[command]]
name = "greet"
program = "echo"
args = ["hi"]
sync = true

[[command]]
program = "tail"
args = ["-n", "1"]
working_directory = "/var/log"
stdin = "syslog"
stdout = "last.log"
every = "1h"
times = 3
"#
    )?;

    let script = load_and_validate(file.path())?;
    assert_eq!(script.config().on_construction_error, ConstructionErrorPolicy::Skip);
    assert_eq!(script.config().stagger_ms, 0);

    let specs = script.commands().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(specs.len(), 2);

    let greet = &specs[0];
    assert_eq!(greet.label(), "greet");
    assert!(greet.sync);
    assert_eq!(greet.stdin, StreamTarget::None);
    assert_eq!(greet.stdout, StreamTarget::Inherit(StdStream::Stdout));
    assert_eq!(greet.stderr, StreamTarget::Inherit(StdStream::Stderr));

    let tail = &specs[1];
    assert_eq!(tail.label(), "tail -n 1");
    assert!(!tail.sync);
    assert_eq!(tail.working_dir, Some(PathBuf::from("/var/log")));
    assert_eq!(tail.stdin, StreamTarget::Path("syslog".to_string()));
    assert_eq!(tail.stdout, StreamTarget::Path("last.log".to_string()));
    assert_eq!(tail.every, Duration::from_secs(3600));
    assert_eq!(tail.times, 3);
    assert_eq!(tail.resolve("last.log"), PathBuf::from("/var/log/last.log"));
    Ok(())
}

#[test]
fn config_section_is_optional() -> TestResult {
    let script = script_from(
        r#"
[[command]]
program = "true"
"#,
    )?;
    assert_eq!(script.config().on_construction_error, ConstructionErrorPolicy::Abort);
    assert_eq!(script.config().stagger_ms, 10);
    Ok(())
}

#[test]
fn file_without_commands_is_rejected() {
    match script_from("[config]\nstagger_ms = 5\n") {
        Err(InscriptError::ConfigError(msg)) => assert!(msg.contains("at least one")),
        Err(e) => panic!("Expected ConfigError, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_keys_are_rejected() {
    let result = script_from(
        r#"
[[command]]
program = "echo"
cmd = "echo hi"
"#,
    );
    assert!(matches!(result, Err(InscriptError::TomlError(_))));
}

#[test]
fn interval_shorter_than_thirty_seconds_is_rejected() -> TestResult {
    let script = script_from(
        r#"
[[command]]
name = "too-often"
program = "date"
every = "10s"
"#,
    )?;

    let err = script
        .commands()
        .next()
        .expect("one entry")
        .expect_err("10s is below the floor");
    match err {
        InscriptError::ConfigError(msg) => {
            assert!(msg.contains("too-often"));
            assert!(msg.contains("can't be shorter than 30 seconds"));
        }
        other => panic!("Expected ConfigError, got: {other:?}"),
    }
    Ok(())
}

#[test]
fn negative_times_becomes_zero() -> TestResult {
    let script = script_from(
        r#"
[[command]]
program = "date"
times = -4
"#,
    )?;
    let spec = script.commands().next().expect("one entry")?;
    assert_eq!(spec.times, 0);
    Ok(())
}

#[test]
fn empty_program_is_rejected() -> TestResult {
    let script = ScriptFileBuilder::new().with_command(entry("  ")).build();
    let result = script.commands().next().expect("one entry");
    assert!(matches!(result, Err(InscriptError::ConfigError(_))));
    Ok(())
}

#[test]
fn stdin_sentinel_is_not_an_output_target() -> TestResult {
    let script = script_from(
        r#"
[[command]]
program = "echo"
stdout = "!stdin"
"#,
    )?;
    match script.commands().next().expect("one entry") {
        Err(InscriptError::ConfigError(msg)) => assert!(msg.contains("not a valid stdout target")),
        other => panic!("Expected ConfigError, got: {other:?}"),
    }
    Ok(())
}

#[test]
fn invalid_default_target_is_rejected_up_front() {
    let result = script_from(
        r#"
[default]
stdin = "!stdout"

[[command]]
program = "cat"
"#,
    );
    assert!(matches!(result, Err(InscriptError::ConfigError(_))));
}

#[test]
fn defaults_apply_unless_overridden() -> TestResult {
    let mut own = entry("echo");
    own.stdout = Some("own.log".to_string());
    own.sync = Some(false);
    own.dir = Some(String::new());

    let script = ScriptFileBuilder::new()
        .with_default_dir("build")
        .with_default_stdout("shared.log")
        .with_default_sync(true)
        .with_command(entry("make"))
        .with_command(own)
        .build();
    let specs = script.commands().collect::<Result<Vec<_>, _>>()?;

    assert_eq!(specs[0].working_dir, Some(PathBuf::from("build")));
    assert_eq!(specs[0].stdout, StreamTarget::Path("shared.log".to_string()));
    assert!(specs[0].sync);

    assert_eq!(specs[1].working_dir, None);
    assert_eq!(specs[1].stdout, StreamTarget::Path("own.log".to_string()));
    assert!(!specs[1].sync);
    Ok(())
}

#[test]
fn bad_entry_surfaces_mid_stream() -> TestResult {
    let script = script_from(
        r#"
[[command]]
program = "echo"

[[command]]
program = "date"
every = "5s"

[[command]]
program = "true"
"#,
    )?;

    let mut commands = script.commands();
    assert!(commands.next().expect("first entry").is_ok());
    assert!(commands.next().expect("second entry").is_err());
    assert!(commands.next().expect("third entry").is_ok());
    assert!(commands.next().is_none());
    Ok(())
}

#[test]
fn literal_sentinel_file_is_written_as_a_path() {
    assert_eq!(
        StreamTarget::parse("./!stdout"),
        StreamTarget::Path("./!stdout".to_string())
    );
    assert_eq!(StreamTarget::parse("!stdout"), StreamTarget::Inherit(StdStream::Stdout));
    assert_eq!(StreamTarget::parse(""), StreamTarget::None);
}

#[test]
fn durations_parse_with_units() -> TestResult {
    assert_eq!(parse_duration("250ms")?, Duration::from_millis(250));
    assert_eq!(parse_duration("45s")?, Duration::from_secs(45));
    assert_eq!(parse_duration("5m")?, Duration::from_secs(300));
    assert_eq!(parse_duration("1h30m")?, Duration::from_secs(5400));
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("3d").is_err());
    assert!(parse_duration("m").is_err());
    Ok(())
}

#[test]
fn intervals_respect_the_floor() -> TestResult {
    assert_eq!(parse_interval("")?, Duration::ZERO);
    assert_eq!(parse_interval("0s")?, Duration::ZERO);
    assert_eq!(parse_interval("30s")?, Duration::from_secs(30));
    assert!(parse_interval("29s").is_err());
    assert!(parse_interval("500ms").is_err());
    Ok(())
}

#[test]
fn multibyte_unit_is_an_error_not_a_crash() {
    assert!(parse_duration("30€0s").is_err());
    assert!(parse_duration("5µs").is_err());
}

#[test]
fn oversized_durations_are_errors() {
    assert!(parse_interval("18446744073709551615h").is_err());
    assert!(parse_interval("18446744073709551615m").is_err());
    assert!(parse_interval("18446744073709551615s18446744073709551615s").is_err());
    assert!(parse_interval("99999999999999999999999s").is_err());
}

#[test]
fn unparseable_every_surfaces_as_config_error() -> TestResult {
    let script = script_from(
        r#"
[[command]]
name = "odd"
program = "date"
every = "30€0s"
"#,
    )?;
    match script.commands().next().expect("one entry") {
        Err(InscriptError::ConfigError(msg)) => assert!(msg.contains("odd")),
        other => panic!("Expected ConfigError, got: {other:?}"),
    }
    Ok(())
}

#[test]
fn redirect_paths_are_joined_and_dot_free() {
    assert_eq!(resolve_path(None, "./out.log"), PathBuf::from("out.log"));
    assert_eq!(
        resolve_path(Some(Path::new("/srv/app")), "./logs/./out.log"),
        PathBuf::from("/srv/app/logs/out.log")
    );
    assert_eq!(
        resolve_path(Some(Path::new("/srv/app")), "/var/log/out.log"),
        PathBuf::from("/var/log/out.log")
    );
    assert_eq!(
        resolve_path(Some(Path::new("build")), "../out.log"),
        PathBuf::from("build/../out.log")
    );
    assert_eq!(resolve_path(None, "."), PathBuf::from("."));
}
