use std::path::PathBuf;
use std::time::Duration;

pub mod invocation;
pub mod runner;
pub mod stream_parse;

pub use invocation::build_invocation;
pub use runner::{KillSwitch, ProcessBridge, RunningCommand};
pub use stream_parse::{summarize_tool, ChunkKind, OutputChunk, StreamParser};

pub const DEFAULT_BINARY: &str = "claude";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("failed to spawn `{binary}`: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("a command is already running; wait for it to complete or cancel it")]
    AlreadyRunning,
    #[error("command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("process exited with code {code}: {detail}")]
    ProcessExit { code: i32, detail: String },
    #[error("process was cancelled")]
    Cancelled,
    #[error("io error while supervising `{binary}`: {source}")]
    Io {
        binary: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub allowed_tools: Vec<String>,
    pub append_system_prompt: Option<String>,
}

impl ExecuteOptions {
    pub fn effective_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSpec {
    pub binary: String,
    pub args: Vec<String>,
}

impl InvocationSpec {
    pub fn command_form(&self) -> String {
        format!("{} {}", self.binary, self.args.join(" "))
    }
}

pub(crate) fn io_error(binary: &str, source: std::io::Error) -> BridgeError {
    BridgeError::Io {
        binary: binary.to_string(),
        source,
    }
}
