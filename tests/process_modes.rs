// tests/process_modes.rs

#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::tempdir;

use inscript::errors::InscriptError;
use inscript::process::{Process, RunMode};
use inscript::resources::{FileRegistry, ResourceKey};
use inscript::types::StdStream;
use inscript_test_utils::builders::CommandSpecBuilder;
use inscript_test_utils::{capture_logs, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn create(spec: inscript::command::CommandSpec, registry: &Arc<FileRegistry>) -> Process {
    Process::create(Arc::new(spec), Arc::clone(registry)).expect("process should be created")
}

async fn wait_for_invocations(process: &Process, n: u32) {
    while process.invocations() < n {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn run_once_writes_to_redirect_and_releases_it() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let registry = Arc::new(FileRegistry::new());

    let spec = CommandSpecBuilder::new("echo")
        .arg("hi")
        .dir(dir.path())
        .stdout_path("out.log")
        .sync(true)
        .build();
    let process = create(spec, &registry);
    assert_eq!(process.mode(), RunMode::RunOnce);
    assert_eq!(registry.len(), 1);

    with_timeout(process.run()).await?;

    assert_eq!(fs::read_to_string(dir.path().join("out.log"))?, "hi\n");
    assert!(process.is_killed());
    assert!(registry.is_empty());
    Ok(())
}

#[tokio::test]
async fn bounded_runs_the_requested_number_of_times() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let registry = Arc::new(FileRegistry::new());

    let spec = CommandSpecBuilder::new("echo")
        .arg("tick")
        .dir(dir.path())
        .stdout_path("ticks.log")
        .sync(true)
        .times(3)
        .build();
    let process = create(spec, &registry);
    assert_eq!(process.mode(), RunMode::Bounded);

    with_timeout(process.run()).await?;

    assert_eq!(process.invocations(), 3);
    assert_eq!(process.generation(), 2);
    assert_eq!(
        fs::read_to_string(dir.path().join("ticks.log"))?,
        "tick\ntick\ntick\n"
    );
    assert!(registry.is_empty());
    Ok(())
}

#[tokio::test]
async fn bounded_stops_at_first_failure() -> TestResult {
    init_tracing();
    let registry = Arc::new(FileRegistry::new());

    let spec = CommandSpecBuilder::new("false").sync(true).times(3).build();
    let process = create(spec, &registry);

    let err = with_timeout(process.run()).await.expect_err("`false` must fail");
    match err {
        InscriptError::ExitFailure { command, status } => {
            assert_eq!(command, "false");
            assert!(!status.success());
        }
        other => panic!("Expected ExitFailure, got: {other:?}"),
    }
    assert_eq!(process.invocations(), 1);
    assert!(process.is_killed());
    Ok(())
}

#[tokio::test]
async fn periodic_failure_is_logged_once_and_ends_the_schedule() -> TestResult {
    init_tracing();
    let registry = Arc::new(FileRegistry::new());

    let spec = CommandSpecBuilder::new("false")
        .every(Duration::from_millis(20))
        .build();
    let process = create(spec, &registry);
    assert_eq!(process.mode(), RunMode::Periodic);
    assert!(process.schedule().asynchronous);

    let (logs, _guard) = capture_logs();
    with_timeout(process.run()).await?;

    assert_eq!(process.invocations(), 1);
    assert!(process.is_killed());
    assert_eq!(logs.count_level("ERROR"), 1, "logs:\n{}", logs.contents());
    assert!(logs.contents().contains("periodic command failed"));
    Ok(())
}

#[tokio::test]
async fn periodic_bounded_waits_between_runs() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let registry = Arc::new(FileRegistry::new());

    let every = Duration::from_millis(100);
    let spec = CommandSpecBuilder::new("echo")
        .arg("tick")
        .dir(dir.path())
        .stdout_path("ticks.log")
        .sync(true)
        .every(every)
        .times(3)
        .build();
    let process = create(spec, &registry);
    assert_eq!(process.mode(), RunMode::PeriodicBounded);
    assert!(!process.schedule().asynchronous);

    let started = Instant::now();
    with_timeout(process.run()).await?;

    assert!(started.elapsed() >= every * 2);
    assert_eq!(process.invocations(), 3);
    assert_eq!(fs::read_to_string(dir.path().join("ticks.log"))?.lines().count(), 3);
    Ok(())
}

#[tokio::test]
async fn kill_stops_a_periodic_loop() -> TestResult {
    init_tracing();
    let registry = Arc::new(FileRegistry::new());

    let spec = CommandSpecBuilder::new("true")
        .every(Duration::from_millis(50))
        .build();
    let process = Arc::new(create(spec, &registry));

    let runner = {
        let process = Arc::clone(&process);
        tokio::spawn(async move { process.run().await })
    };

    with_timeout(wait_for_invocations(&process, 2)).await;
    process.kill();

    with_timeout(runner).await??;
    assert!(process.is_killed());
    Ok(())
}

#[tokio::test]
async fn kill_interrupts_a_running_background_process() -> TestResult {
    init_tracing();
    let registry = Arc::new(FileRegistry::new());

    let spec = CommandSpecBuilder::new("sleep").arg("30").build();
    let process = Arc::new(create(spec, &registry));
    assert_eq!(process.mode(), RunMode::RunAsync);

    let runner = {
        let process = Arc::clone(&process);
        tokio::spawn(async move { process.run().await })
    };

    with_timeout(wait_for_invocations(&process, 1)).await;
    let started = Instant::now();
    process.kill();

    with_timeout(runner).await??;
    assert!(started.elapsed() < Duration::from_secs(5));
    Ok(())
}

#[tokio::test]
async fn kill_between_bounded_iterations_ends_quietly() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let registry = Arc::new(FileRegistry::new());

    // Synchronous, so `kill` releases the streams but lets the running
    // instance finish successfully.
    let spec = CommandSpecBuilder::new("sleep")
        .arg("0.3")
        .dir(dir.path())
        .stdout_path("out.log")
        .sync(true)
        .times(3)
        .build();
    let process = Arc::new(create(spec, &registry));

    let runner = {
        let process = Arc::clone(&process);
        tokio::spawn(async move { process.run().await })
    };

    with_timeout(wait_for_invocations(&process, 1)).await;
    process.kill();
    assert!(registry.is_empty());

    with_timeout(runner).await??;
    assert_eq!(process.invocations(), 1);
    assert_eq!(process.generation(), 0);
    Ok(())
}

#[tokio::test]
async fn kill_is_idempotent() -> TestResult {
    let dir = tempdir()?;
    let registry = Arc::new(FileRegistry::new());

    let spec = CommandSpecBuilder::new("echo")
        .dir(dir.path())
        .stdout_path("out.log")
        .build();
    let process = create(spec, &registry);
    assert_eq!(registry.len(), 1);

    process.kill();
    process.kill();

    assert!(process.is_killed());
    assert!(registry.is_empty());
    assert!(process.resource_keys().is_empty());
    Ok(())
}

#[tokio::test]
async fn refresh_reuses_the_leased_streams() -> TestResult {
    let dir = tempdir()?;
    let registry = Arc::new(FileRegistry::new());

    let spec = CommandSpecBuilder::new("echo")
        .dir(dir.path())
        .stdout_path("out.log")
        .build();
    let process = create(spec, &registry);
    let key = ResourceKey::write(dir.path().join("out.log"));

    process.refresh()?;
    process.refresh()?;

    assert_eq!(process.generation(), 2);
    assert_eq!(registry.ref_count(&key), Some(1));
    process.kill();
    assert!(registry.is_empty());
    Ok(())
}

#[tokio::test]
async fn stdout_and_stderr_to_one_file_take_one_reference() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let registry = Arc::new(FileRegistry::new());

    let spec = CommandSpecBuilder::shell("echo out; echo err 1>&2")
        .dir(dir.path())
        .stdout_path("both.log")
        .stderr_path("both.log")
        .sync(true)
        .build();
    let process = create(spec, &registry);

    let key = ResourceKey::write(dir.path().join("both.log"));
    assert_eq!(process.resource_keys(), vec![key.clone()]);
    assert_eq!(registry.ref_count(&key), Some(1));

    with_timeout(process.run()).await?;

    let content = fs::read_to_string(dir.path().join("both.log"))?;
    assert!(content.contains("out\n"));
    assert!(content.contains("err\n"));
    assert!(registry.is_empty());
    Ok(())
}

#[test]
fn dot_prefixed_and_plain_paths_share_one_entry() -> TestResult {
    let dir = tempdir()?;
    let registry = Arc::new(FileRegistry::new());

    let dotted = create(
        CommandSpecBuilder::new("echo")
            .dir(dir.path())
            .stdout_path("./shared.log")
            .build(),
        &registry,
    );
    let plain = create(
        CommandSpecBuilder::new("echo")
            .dir(dir.path())
            .stdout_path("shared.log")
            .build(),
        &registry,
    );

    let key = ResourceKey::write(dir.path().join("shared.log"));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.ref_count(&key), Some(2));

    dotted.kill();
    plain.kill();
    assert!(registry.is_empty());
    Ok(())
}

#[tokio::test]
async fn absolute_redirect_ignores_working_dir() -> TestResult {
    let work = tempdir()?;
    let elsewhere = tempdir()?;
    let registry = Arc::new(FileRegistry::new());
    let target = elsewhere.path().join("abs.log");

    let spec = CommandSpecBuilder::new("echo")
        .arg("abs")
        .dir(work.path())
        .stdout_path(target.to_str().expect("utf-8 temp path"))
        .sync(true)
        .build();
    let process = create(spec, &registry);
    with_timeout(process.run()).await?;

    assert_eq!(fs::read_to_string(&target)?, "abs\n");
    assert!(!work.path().join("abs.log").exists());
    Ok(())
}

#[tokio::test]
async fn input_redirect_feeds_stdin() -> TestResult {
    let dir = tempdir()?;
    fs::write(dir.path().join("in.txt"), "from file\n")?;
    let registry = Arc::new(FileRegistry::new());

    let spec = CommandSpecBuilder::new("cat")
        .dir(dir.path())
        .stdin_path("in.txt")
        .stdout_path("out.txt")
        .sync(true)
        .build();
    let process = create(spec, &registry);
    with_timeout(process.run()).await?;

    assert_eq!(fs::read_to_string(dir.path().join("out.txt"))?, "from file\n");
    Ok(())
}

#[test]
fn missing_input_is_a_construction_error_and_leaks_nothing() -> TestResult {
    let dir = tempdir()?;
    let registry = Arc::new(FileRegistry::new());

    let spec = CommandSpecBuilder::new("cat")
        .name("reader")
        .dir(dir.path())
        .stdin_path("missing.txt")
        .stdout_path("out.log")
        .build();

    match Process::create(Arc::new(spec), Arc::clone(&registry)) {
        Err(InscriptError::Construction { command, source }) => {
            assert_eq!(command, "reader");
            assert!(source.to_string().contains("missing.txt"));
        }
        Err(e) => panic!("Expected Construction error, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
    assert!(registry.is_empty());
    Ok(())
}

#[test]
fn stdin_that_is_also_an_output_is_rejected() -> TestResult {
    let dir = tempdir()?;
    fs::write(dir.path().join("loop.txt"), "")?;
    let registry = Arc::new(FileRegistry::new());

    let spec = CommandSpecBuilder::new("cat")
        .dir(dir.path())
        .stdin_path("loop.txt")
        .stdout_path("loop.txt")
        .build();

    let result = Process::create(Arc::new(spec), Arc::clone(&registry));
    assert!(matches!(result, Err(InscriptError::InvalidRedirect { .. })));
    assert!(registry.is_empty());
    Ok(())
}

#[test]
fn output_stream_cannot_inherit_stdin() {
    let registry = Arc::new(FileRegistry::new());
    let spec = CommandSpecBuilder::new("echo")
        .stdout_inherit(StdStream::Stdin)
        .build();

    let result = Process::create(Arc::new(spec), registry);
    assert!(matches!(result, Err(InscriptError::InvalidRedirect { .. })));
}

#[tokio::test]
async fn unknown_program_is_a_launch_error() -> TestResult {
    let registry = Arc::new(FileRegistry::new());
    let spec = CommandSpecBuilder::new("inscript-definitely-not-a-program")
        .sync(true)
        .build();
    let process = create(spec, &registry);

    let err = with_timeout(process.run()).await.expect_err("spawn must fail");
    assert!(matches!(err, InscriptError::Launch { .. }));
    assert_eq!(process.invocations(), 0);
    assert!(process.is_killed());
    Ok(())
}
