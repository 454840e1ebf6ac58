use crate::bridge::invocation::build_invocation;
use crate::bridge::stream_parse::{OutputChunk, StreamParser};
use crate::bridge::{io_error, BridgeError, ExecuteOptions, DEFAULT_BINARY};
use crate::shared::RuntimeLog;
use serde_json::json;
use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const READ_BUFFER_BYTES: usize = 8192;
/// How long pipes may stay open after the process exits. A background child
/// that inherited them must not hold the run open.
const EXIT_DRAIN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct ActiveRun {
    pid: u32,
    child: Mutex<Child>,
    cancelled: AtomicBool,
}

/// Single-flight state shared between the bridge and its kill switches.
#[derive(Debug, Default)]
enum BridgeState {
    #[default]
    Idle,
    Running(Arc<ActiveRun>),
}

enum RunOutcome {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}

/// Cloneable handle that can stop the bridge's active process but never start one.
#[derive(Debug, Clone)]
pub struct KillSwitch {
    state: Arc<Mutex<BridgeState>>,
    log: RuntimeLog,
}

impl KillSwitch {
    pub fn is_running(&self) -> bool {
        matches!(*lock(&self.state), BridgeState::Running(_))
    }

    /// Kill the active process and mark the bridge idle. Returns false when idle.
    pub fn kill(&self) -> bool {
        let previous = std::mem::take(&mut *lock(&self.state));
        let BridgeState::Running(run) = previous else {
            return false;
        };
        run.cancelled.store(true, Ordering::SeqCst);
        let _ = lock(&run.child).kill();
        self.log
            .info("bridge.killed", "process killed", json!({ "pid": run.pid }));
        true
    }
}

#[derive(Debug)]
pub struct ProcessBridge {
    binary: String,
    state: Arc<Mutex<BridgeState>>,
    log: RuntimeLog,
}

impl Default for ProcessBridge {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}

impl ProcessBridge {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            state: Arc::new(Mutex::new(BridgeState::Idle)),
            log: RuntimeLog::disabled(),
        }
    }

    pub fn with_log(mut self, log: RuntimeLog) -> Self {
        self.log = log;
        self
    }

    pub fn is_running(&self) -> bool {
        matches!(*lock(&self.state), BridgeState::Running(_))
    }

    pub fn kill_switch(&self) -> KillSwitch {
        KillSwitch {
            state: Arc::clone(&self.state),
            log: self.log.clone(),
        }
    }

    pub fn kill(&self) -> bool {
        self.kill_switch().kill()
    }

    /// Probe the binary with `--version`. Any failure reads as unavailable.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Run one prompt to completion, handing each parsed chunk to `on_chunk`
    /// on the calling thread as soon as its line is complete.
    pub fn execute<F>(
        &self,
        prompt: &str,
        options: &ExecuteOptions,
        on_chunk: F,
    ) -> Result<String, BridgeError>
    where
        F: FnMut(OutputChunk),
    {
        self.start(prompt, options)?.wait(on_chunk)
    }

    /// Spawn the process and hand it the prompt without waiting for it.
    ///
    /// The bridge counts as running from the moment this returns `Ok` until the
    /// returned command is waited on, dropped, or killed.
    pub fn start(
        &self,
        prompt: &str,
        options: &ExecuteOptions,
    ) -> Result<RunningCommand, BridgeError> {
        let spec = build_invocation(&self.binary, options);
        let timeout = options.effective_timeout();

        let mut state = lock(&self.state);
        if matches!(*state, BridgeState::Running(_)) {
            return Err(BridgeError::AlreadyRunning);
        }

        let mut command = Command::new(&spec.binary);
        command
            .args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = options.cwd.as_ref() {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|source| BridgeError::Spawn {
            binary: spec.binary.clone(),
            source,
        })?;
        let pipes = (child.stdin.take(), child.stdout.take(), child.stderr.take());
        let (Some(mut stdin), Some(stdout), Some(stderr)) = pipes else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(io_error(
                &spec.binary,
                std::io::Error::other("missing stdio pipe"),
            ));
        };

        let run = Arc::new(ActiveRun {
            pid: child.id(),
            child: Mutex::new(child),
            cancelled: AtomicBool::new(false),
        });
        *state = BridgeState::Running(Arc::clone(&run));
        drop(state);

        self.log.info(
            "bridge.execute",
            "executing assistant command",
            json!({
                "pid": run.pid,
                "promptLength": prompt.chars().count(),
                "cwd": options.cwd.as_ref().map(|cwd| cwd.display().to_string()),
                "command": spec.command_form(),
                "timeoutMs": timeout.as_millis() as u64,
            }),
        );

        let prompt = prompt.to_string();
        thread::spawn(move || {
            let _ = stdin.write_all(prompt.as_bytes());
        });
        let stdout_rx = spawn_pipe_reader(stdout);
        let stderr_rx = spawn_pipe_reader(stderr);

        Ok(RunningCommand {
            run,
            state: Arc::clone(&self.state),
            binary: spec.binary,
            log: self.log.clone(),
            stdout_rx,
            stderr_rx,
            parser: StreamParser::new(),
            started: Instant::now(),
            timeout,
            finished: false,
        })
    }
}

/// A spawned process that has not been reaped yet.
#[derive(Debug)]
pub struct RunningCommand {
    run: Arc<ActiveRun>,
    state: Arc<Mutex<BridgeState>>,
    binary: String,
    log: RuntimeLog,
    stdout_rx: Receiver<Vec<u8>>,
    stderr_rx: Receiver<Vec<u8>>,
    parser: StreamParser,
    started: Instant,
    timeout: Duration,
    finished: bool,
}

impl RunningCommand {
    pub fn pid(&self) -> u32 {
        self.run.pid
    }

    /// Stream chunks into `on_chunk` until the process exits, times out, or is killed.
    pub fn wait<F>(mut self, mut on_chunk: F) -> Result<String, BridgeError>
    where
        F: FnMut(OutputChunk),
    {
        let outcome = self.supervise(&mut on_chunk);
        self.finished = true;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(source) => {
                self.reap(true);
                return Err(io_error(&self.binary, source));
            }
        };

        match outcome {
            RunOutcome::Cancelled => {
                self.reap(false);
                Err(BridgeError::Cancelled)
            }
            RunOutcome::TimedOut => {
                self.reap(true);
                let timeout_ms = self.timeout.as_millis() as u64;
                self.log.warn(
                    "bridge.timeout",
                    "assistant command timed out and was killed",
                    json!({ "pid": self.run.pid, "timeoutMs": timeout_ms }),
                );
                Err(BridgeError::Timeout { timeout_ms })
            }
            RunOutcome::Exited(status) => {
                let deadline =
                    (self.started + self.timeout).min(Instant::now() + EXIT_DRAIN_GRACE);
                let parser = &mut self.parser;
                let stdout_closed = drain_until(&self.stdout_rx, deadline, |data| {
                    for chunk in parser.push(&data) {
                        on_chunk(chunk);
                    }
                });
                for chunk in self.parser.finish() {
                    on_chunk(chunk);
                }
                let mut stderr_bytes = Vec::new();
                let stderr_closed = drain_until(&self.stderr_rx, deadline, |data| {
                    stderr_bytes.extend_from_slice(&data);
                });
                let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();
                if !(stdout_closed && stderr_closed) {
                    self.log.warn(
                        "bridge.output_abandoned",
                        "process exited but its output pipes stayed open",
                        json!({
                            "pid": self.run.pid,
                            "stdoutClosed": stdout_closed,
                            "stderrClosed": stderr_closed,
                        }),
                    );
                }
                self.release();

                if self.run.cancelled.load(Ordering::SeqCst) {
                    return Err(BridgeError::Cancelled);
                }

                let output = self.parser.output();
                if status.success() {
                    self.log.info(
                        "bridge.completed",
                        "assistant command completed",
                        json!({ "pid": self.run.pid, "outputLength": output.chars().count() }),
                    );
                    return Ok(output);
                }

                let code = status.code().unwrap_or(-1);
                self.log.error(
                    "bridge.failed",
                    "assistant command failed",
                    json!({ "pid": self.run.pid, "code": code, "stderr": stderr.trim() }),
                );
                Err(BridgeError::ProcessExit {
                    code,
                    detail: failure_detail(&output, &stderr),
                })
            }
        }
    }

    fn supervise<F>(&mut self, on_chunk: &mut F) -> std::io::Result<RunOutcome>
    where
        F: FnMut(OutputChunk),
    {
        let mut stdout_open = true;
        loop {
            if stdout_open {
                match self.stdout_rx.recv_timeout(POLL_INTERVAL) {
                    Ok(data) => {
                        for chunk in self.parser.push(&data) {
                            on_chunk(chunk);
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => stdout_open = false,
                }
            } else {
                thread::sleep(POLL_INTERVAL);
            }

            if self.run.cancelled.load(Ordering::SeqCst) {
                return Ok(RunOutcome::Cancelled);
            }
            if let Some(status) = lock(&self.run.child).try_wait()? {
                return Ok(RunOutcome::Exited(status));
            }
            if self.started.elapsed() > self.timeout {
                return Ok(RunOutcome::TimedOut);
            }
        }
    }

    fn reap(&self, kill: bool) {
        {
            let mut child = lock(&self.run.child);
            if kill {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
        self.release();
    }

    fn release(&self) {
        let mut state = lock(&self.state);
        if let BridgeState::Running(active) = &*state {
            if Arc::ptr_eq(active, &self.run) {
                *state = BridgeState::Idle;
            }
        }
    }
}

impl Drop for RunningCommand {
    fn drop(&mut self) {
        if !self.finished {
            self.reap(true);
        }
    }
}

fn spawn_pipe_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = [0_u8; READ_BUFFER_BYTES];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    });
    rx
}

/// Feed pipe data to `sink` until the reader hangs up or `deadline` passes.
/// Returns whether the pipe was fully drained.
fn drain_until<F>(rx: &Receiver<Vec<u8>>, deadline: Instant, mut sink: F) -> bool
where
    F: FnMut(Vec<u8>),
{
    loop {
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(data) => sink(data),
            Err(RecvTimeoutError::Disconnected) => return true,
            Err(RecvTimeoutError::Timeout) => return false,
        }
    }
}

fn failure_detail(output: &str, stderr: &str) -> String {
    [output.trim(), stderr.trim()]
        .into_iter()
        .find(|detail| !detail.is_empty())
        .unwrap_or("no output captured")
        .to_string()
}
