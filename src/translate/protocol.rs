use crate::shared::RuntimeLog;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const BUILTIN_PROTOCOL: &str = r#"# ADE command protocol

Protocol version: 1.0

You translate chat messages into commands for the Autonomous Development
Engine (ADE). The ADE is a team of agents driven through a coding assistant
running inside the project workspace.

## Agents

- @dev: implements stories, fixes bugs, refactors code. Commands: *develop, *fix, *refactor
- @qa: runs and reviews tests, lint and type checks. Commands: *test, *review
- @sm: drafts and refines stories. Commands: *draft, *story
- @po: validates backlog items and acceptance criteria. Commands: *validate
- @architect: designs systems and documents decisions. Commands: *design
- @devops: builds, releases and pushes changes. Commands: *push, *release

## Actions

- execute: run work through an agent. rawPrompt is the full instruction sent to the ADE.
- query: ask about project state (status, files, history). rawPrompt holds the question.
- approve: confirm a pending plan or change.
- cancel: stop the running job.
- clarify: the request is ambiguous; put the question for the user in clarification.

## Rules

- Write rawPrompt in English, self-contained, and specific enough to run without the chat history.
- Pick the single most suitable agent; leave agent empty when none applies.
- confidence is between 0 and 1. Use clarify, or a confidence below 0.7, when unsure.
- Never invent file names, story ids or requirements the user did not give.
"#;

/// Lazily loaded protocol document used as the translator's system prompt.
///
/// The file at `path` is read once and cached; when it is absent or unreadable
/// the built-in document is used instead.
#[derive(Debug)]
pub struct ProtocolDoc {
    path: Option<PathBuf>,
    cached: Mutex<Option<Arc<str>>>,
    log: RuntimeLog,
}

impl ProtocolDoc {
    pub fn new(path: Option<PathBuf>, log: RuntimeLog) -> Self {
        Self {
            path,
            cached: Mutex::new(None),
            log,
        }
    }

    pub fn builtin() -> Self {
        Self::new(None, RuntimeLog::disabled())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load(&self) -> Arc<str> {
        let mut cached = self.cached.lock().unwrap_or_else(|err| err.into_inner());
        if let Some(text) = cached.as_ref() {
            return Arc::clone(text);
        }
        let text: Arc<str> = match self.path.as_deref() {
            Some(path) => match fs::read_to_string(path) {
                Ok(text) if !text.trim().is_empty() => Arc::from(text),
                Ok(_) => {
                    self.log.warn(
                        "protocol.empty",
                        "protocol document is empty, using built-in protocol",
                        json!({ "path": path.display().to_string() }),
                    );
                    Arc::from(BUILTIN_PROTOCOL)
                }
                Err(err) => {
                    self.log.warn(
                        "protocol.unreadable",
                        "protocol document could not be read, using built-in protocol",
                        json!({ "path": path.display().to_string(), "error": err.to_string() }),
                    );
                    Arc::from(BUILTIN_PROTOCOL)
                }
            },
            None => Arc::from(BUILTIN_PROTOCOL),
        };
        *cached = Some(Arc::clone(&text));
        text
    }

    /// Value of the first `Protocol version:` line, or `unknown`.
    pub fn version(&self) -> String {
        protocol_version(&self.load())
    }

    pub fn clear_cache(&self) {
        *self.cached.lock().unwrap_or_else(|err| err.into_inner()) = None;
    }
}

pub fn protocol_version(text: &str) -> String {
    text.lines()
        .find_map(|line| {
            let idx = line.find("Protocol version:")?;
            let value = line[idx + "Protocol version:".len()..].trim();
            (!value.is_empty()).then(|| value.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
