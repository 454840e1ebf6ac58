use adegate::bridge::{BridgeError, ChunkKind, ExecuteOptions, OutputChunk, ProcessBridge};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

fn options(timeout: Duration) -> ExecuteOptions {
    ExecuteOptions {
        timeout: Some(timeout),
        ..ExecuteOptions::default()
    }
}

fn wait_until_running(bridge: &ProcessBridge) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !bridge.is_running() {
        assert!(Instant::now() < deadline, "bridge never started");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn raw_text_output_is_streamed_and_returned() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-echo");
    write_script(&bin, "#!/bin/sh\ncat >/dev/null\necho hi\n");

    let bridge = ProcessBridge::new(bin.display().to_string());
    let mut chunks: Vec<OutputChunk> = Vec::new();
    let output = bridge
        .execute("say hi", &options(Duration::from_secs(5)), |chunk| {
            chunks.push(chunk)
        })
        .expect("success");

    assert_eq!(output, "hi");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].kind, ChunkKind::Text);
    assert_eq!(chunks[0].content, "hi\n");
    assert!(!bridge.is_running());
}

#[test]
fn stream_json_records_become_typed_chunks() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-stream");
    write_script(
        &bin,
        r#"#!/bin/sh
cat >/dev/null
echo '{"type":"system","subtype":"init"}'
echo '{"type":"assistant","message":{"content":[{"type":"text","text":"Working on it. "},{"type":"tool_use","name":"Read","input":{"file_path":"/src/lib.rs"}}]}}'
echo '{"type":"unknown_record","payload":1}'
echo '{"type":"result","result":"Done."}'
"#,
    );

    let bridge = ProcessBridge::new(bin.display().to_string());
    let mut chunks: Vec<OutputChunk> = Vec::new();
    let output = bridge
        .execute("work", &options(Duration::from_secs(5)), |chunk| {
            chunks.push(chunk)
        })
        .expect("success");

    let kinds: Vec<ChunkKind> = chunks.iter().map(|chunk| chunk.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ChunkKind::System,
            ChunkKind::Text,
            ChunkKind::ToolUse,
            ChunkKind::Result
        ]
    );
    assert_eq!(chunks[0].content, "init");
    assert_eq!(chunks[2].content, "Reading /src/lib.rs");
    assert_eq!(chunks[2].tool_name.as_deref(), Some("Read"));
    assert_eq!(chunks[1].content, "Working on it. ");
    assert_eq!(output, "Working on it. Done.");
}

#[test]
fn prompt_goes_to_stdin_and_flags_to_argv() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-capture");
    let prompt_file = dir.path().join("prompt.txt");
    let args_file = dir.path().join("args.txt");
    write_script(
        &bin,
        &format!(
            "#!/bin/sh\ncat > '{}'\necho \"$@\" > '{}'\necho ok\n",
            prompt_file.display(),
            args_file.display()
        ),
    );

    let bridge = ProcessBridge::new(bin.display().to_string());
    let options = ExecuteOptions {
        timeout: Some(Duration::from_secs(5)),
        allowed_tools: vec!["Read".to_string(), "Bash".to_string()],
        ..ExecuteOptions::default()
    };
    let prompt = "implement story 1.2\nwith two lines";
    bridge.execute(prompt, &options, |_| {}).expect("success");

    assert_eq!(fs::read_to_string(&prompt_file).expect("prompt"), prompt);
    let args = fs::read_to_string(&args_file).expect("args");
    assert!(args.contains("--print --verbose --output-format stream-json"));
    assert!(args.contains("--dangerously-skip-permissions"));
    assert!(args.contains("--allowedTools Read,Bash"));
    assert!(!args.contains(prompt));
}

#[test]
fn working_directory_is_applied() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-pwd");
    let workdir = dir.path().join("project");
    fs::create_dir_all(&workdir).expect("create workdir");
    write_script(&bin, "#!/bin/sh\ncat >/dev/null\npwd -P\n");

    let bridge = ProcessBridge::new(bin.display().to_string());
    let options = ExecuteOptions {
        cwd: Some(workdir.clone()),
        timeout: Some(Duration::from_secs(5)),
        ..ExecuteOptions::default()
    };
    let output = bridge.execute("where", &options, |_| {}).expect("success");
    let expected = fs::canonicalize(&workdir).expect("canonicalize");
    assert_eq!(output, expected.display().to_string());
}

#[test]
fn non_zero_exit_reports_code_and_stderr() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-fail");
    write_script(&bin, "#!/bin/sh\ncat >/dev/null\necho 'boom' 1>&2\nexit 1\n");

    let bridge = ProcessBridge::new(bin.display().to_string());
    let err = bridge
        .execute("fail", &options(Duration::from_secs(5)), |_| {})
        .expect_err("expected failure");
    assert_eq!(err.to_string(), "process exited with code 1: boom");
    match err {
        BridgeError::ProcessExit { code, detail } => {
            assert_eq!(code, 1);
            assert_eq!(detail, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!bridge.is_running());
}

#[test]
fn non_zero_exit_prefers_stdout_detail() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-fail-stdout");
    write_script(
        &bin,
        "#!/bin/sh\ncat >/dev/null\necho 'partial work'\necho 'noise' 1>&2\nexit 3\n",
    );

    let bridge = ProcessBridge::new(bin.display().to_string());
    let err = bridge
        .execute("fail", &options(Duration::from_secs(5)), |_| {})
        .expect_err("expected failure");
    assert!(matches!(
        err,
        BridgeError::ProcessExit { code: 3, ref detail } if detail == "partial work"
    ));
}

#[test]
fn timeout_kills_the_process() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-slow");
    write_script(&bin, "#!/bin/sh\nexec sleep 5\n");

    let bridge = ProcessBridge::new(bin.display().to_string());
    let started = Instant::now();
    let err = bridge
        .execute("slow", &options(Duration::from_millis(200)), |_| {})
        .expect_err("expected timeout");
    assert!(matches!(err, BridgeError::Timeout { timeout_ms: 200 }));
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(!bridge.is_running());
}

#[test]
fn background_child_holding_pipes_does_not_stall_completion() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-forks");
    write_script(&bin, "#!/bin/sh\ncat >/dev/null\necho hi\nsleep 6 &\nexit 0\n");

    let bridge = ProcessBridge::new(bin.display().to_string());
    let started = Instant::now();
    let output = bridge
        .execute("fork", &options(Duration::from_secs(5)), |_| {})
        .expect("success");
    assert_eq!(output, "hi");
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(!bridge.is_running());
}

#[test]
fn background_child_does_not_stall_failure_reporting() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-forks-fail");
    write_script(
        &bin,
        "#!/bin/sh\ncat >/dev/null\necho oops 1>&2\nsleep 6 &\nexit 3\n",
    );

    let bridge = ProcessBridge::new(bin.display().to_string());
    let started = Instant::now();
    let err = bridge
        .execute("fork", &options(Duration::from_secs(5)), |_| {})
        .expect_err("expected failure");
    match err {
        BridgeError::ProcessExit { code, detail } => {
            assert_eq!(code, 3);
            assert_eq!(detail, "oops");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn kill_switch_cancels_a_running_process() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-hang");
    write_script(&bin, "#!/bin/sh\nexec sleep 5\n");

    let bridge = Arc::new(ProcessBridge::new(bin.display().to_string()));
    let kill_switch = bridge.kill_switch();
    let worker = {
        let bridge = Arc::clone(&bridge);
        thread::spawn(move || bridge.execute("hang", &options(Duration::from_secs(30)), |_| {}))
    };

    wait_until_running(&bridge);
    let started = Instant::now();
    assert!(kill_switch.kill());
    assert!(!kill_switch.is_running());
    assert!(!kill_switch.kill());

    let result = worker.join().expect("join worker");
    assert!(matches!(result, Err(BridgeError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn second_execution_is_rejected_while_running() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-hang");
    write_script(&bin, "#!/bin/sh\nexec sleep 5\n");

    let bridge = ProcessBridge::new(bin.display().to_string());
    let running = bridge
        .start("first", &options(Duration::from_secs(30)))
        .expect("start first");
    assert!(bridge.is_running());

    let err = bridge
        .execute("second", &options(Duration::from_secs(30)), |_| {})
        .expect_err("second run must be rejected");
    assert!(matches!(err, BridgeError::AlreadyRunning));

    assert!(bridge.kill());
    assert!(matches!(running.wait(|_| {}), Err(BridgeError::Cancelled)));
    assert!(!bridge.is_running());
}

#[test]
fn dropping_an_unwaited_command_reaps_it() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-hang");
    write_script(&bin, "#!/bin/sh\nexec sleep 5\n");

    let bridge = ProcessBridge::new(bin.display().to_string());
    let running = bridge
        .start("abandoned", &options(Duration::from_secs(30)))
        .expect("start");
    assert!(running.pid() > 0);
    drop(running);
    assert!(!bridge.is_running());
}

#[test]
fn available_binary_answers_version_probe() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-version");
    write_script(&bin, "#!/bin/sh\necho 'claude 1.0.0'\n");
    assert!(ProcessBridge::new(bin.display().to_string()).is_available());

    let broken = dir.path().join("claude-broken");
    write_script(&broken, "#!/bin/sh\nexit 2\n");
    assert!(!ProcessBridge::new(broken.display().to_string()).is_available());
}
