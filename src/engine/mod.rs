pub mod context;

pub use context::OwnerContext;

use crate::config::EngineSettings;
use crate::jobs::{Job, JobManager, JobProgressEvent, JobStatus};
use crate::shared::{split_message, JobId, RuntimeLog};
use crate::translate::{
    quick_reply, AdeAction, AdeCommand, ChatMessage, Translator, UNDERSTOOD_NOTHING,
};
use serde_json::json;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};

pub const DEFAULT_CLARIFICATION: &str = "Could you clarify what you want me to do?";
pub const JOB_FAILED_MESSAGE: &str = "Job failed or was cancelled.";
pub const EMPTY_OUTPUT_MESSAGE: &str = "The job finished without producing any output.";
pub const TRUNCATION_MARKER: &str = "\n\n[Output truncated]";

/// What one user message produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineResult {
    pub messages: Vec<String>,
    pub command: Option<AdeCommand>,
    pub job_id: Option<JobId>,
}

impl EngineResult {
    fn reply(messages: Vec<String>) -> Self {
        Self {
            messages,
            command: None,
            job_id: None,
        }
    }
}

/// Sequences translation, the confidence gate, execution and humanizing for
/// each incoming message.
pub struct Engine<T> {
    translator: T,
    jobs: JobManager,
    settings: EngineSettings,
    contexts: Mutex<HashMap<String, OwnerContext>>,
    log: RuntimeLog,
}

impl<T: Translator> Engine<T> {
    pub fn new(translator: T, jobs: JobManager, settings: EngineSettings, log: RuntimeLog) -> Self {
        Self {
            translator,
            jobs,
            settings,
            contexts: Mutex::new(HashMap::new()),
            log,
        }
    }

    pub fn jobs(&self) -> &JobManager {
        &self.jobs
    }

    pub fn translator(&self) -> &T {
        &self.translator
    }

    pub fn history(&self, owner: &str) -> Vec<ChatMessage> {
        self.contexts()
            .get(owner)
            .map(|context| context.history().to_vec())
            .unwrap_or_default()
    }

    pub fn active_agent(&self, owner: &str) -> Option<String> {
        self.contexts()
            .get(owner)
            .and_then(|context| context.active_agent().map(str::to_string))
    }

    pub fn clear_history(&self, owner: &str) {
        if let Some(context) = self.contexts().get_mut(owner) {
            context.clear();
        }
    }

    /// Handle one user message end to end. Blocks until any job it starts
    /// reaches a terminal state.
    ///
    /// `on_progress` sees only the events of the job this call creates; it
    /// runs on the calling thread and a panic inside it is logged and ignored.
    pub fn process_message(
        &self,
        owner: &str,
        auth_token: &str,
        text: &str,
        on_progress: Option<&dyn Fn(&JobProgressEvent)>,
    ) -> EngineResult {
        let prior_history = self.record(owner, ChatMessage::user(text));
        self.log.info(
            "engine.message",
            "processing message",
            json!({ "owner": owner, "messageLength": text.chars().count() }),
        );

        if self.settings.quick_replies {
            if let Some(reply) = quick_reply(text) {
                self.log.info(
                    "engine.quick_reply",
                    "answered locally",
                    json!({ "owner": owner }),
                );
                self.record(owner, ChatMessage::assistant(reply));
                return EngineResult::reply(self.split(reply));
            }
        }

        let command = match self
            .translator
            .translate_request(auth_token, text, &prior_history)
        {
            Ok(command) => command,
            Err(err) => {
                self.log.error(
                    "engine.translate_failed",
                    "translation request failed",
                    json!({ "owner": owner, "error": err.to_string() }),
                );
                AdeCommand::clarify(UNDERSTOOD_NOTHING)
            }
        };
        self.log.info(
            "engine.translated",
            "translation result",
            json!({
                "owner": owner,
                "action": command.action.as_str(),
                "agent": command.agent,
                "confidence": command.confidence,
            }),
        );

        if !command.agent.trim().is_empty() {
            if let Some(context) = self.contexts().get_mut(owner) {
                context.set_active_agent(command.agent.trim());
            }
        }

        if command.action == AdeAction::Clarify
            || command.confidence < self.settings.confidence_threshold
        {
            let clarification = command
                .clarification
                .clone()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CLARIFICATION.to_string());
            self.record(owner, ChatMessage::assistant(clarification.clone()));
            return EngineResult {
                messages: self.split(&clarification),
                command: Some(command),
                job_id: None,
            };
        }

        let prompt = if command.raw_prompt.trim().is_empty() {
            text
        } else {
            command.raw_prompt.as_str()
        };
        let (job_id, finished) = match on_progress {
            Some(callback) => {
                let (job, subscription) = self.jobs.create_job_subscribed(owner, prompt);
                let mut terminal = None;
                for event in subscription.iter() {
                    self.notify(callback, &event);
                    if event.kind.is_terminal() {
                        terminal = Some(event.job);
                        break;
                    }
                }
                let finished = terminal.or_else(|| self.jobs.wait_for_job(job.id.as_str(), None));
                (job.id, finished)
            }
            None => {
                let job = self.jobs.create_job(owner, prompt);
                let finished = self.jobs.wait_for_job(job.id.as_str(), None);
                (job.id, finished)
            }
        };

        let Some(job) = finished.filter(|job| job.status == JobStatus::Completed) else {
            return EngineResult {
                messages: vec![JOB_FAILED_MESSAGE.to_string()],
                command: Some(command),
                job_id: Some(job_id),
            };
        };

        let response = self.respond(auth_token, &command, &job);
        self.record(owner, ChatMessage::assistant(response.clone()));
        EngineResult {
            messages: self.split(&response),
            command: Some(command),
            job_id: Some(job.id),
        }
    }

    fn respond(&self, auth_token: &str, command: &AdeCommand, job: &Job) -> String {
        let output = job.joined_output();
        if output.trim().is_empty() {
            return EMPTY_OUTPUT_MESSAGE.to_string();
        }
        let context = format!("Agent: {}, Command: {}", command.agent, command.command);
        match self.translator.humanize(auth_token, &output, &context) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => self.fallback(&output),
            Err(err) => {
                self.log.warn(
                    "engine.humanize_failed",
                    "returning raw job output",
                    json!({ "jobId": job.id.as_str(), "error": err.to_string() }),
                );
                self.fallback(&output)
            }
        }
    }

    fn fallback(&self, output: &str) -> String {
        truncate_output(output, self.settings.fallback_output_chars)
    }

    fn notify(&self, callback: &dyn Fn(&JobProgressEvent), event: &JobProgressEvent) {
        if panic::catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
            self.log.error(
                "engine.progress_callback_panicked",
                "progress callback panicked",
                json!({ "jobId": event.job_id.as_str(), "kind": event.kind }),
            );
        }
    }

    fn split(&self, text: &str) -> Vec<String> {
        split_message(text, self.settings.max_message_chars)
    }

    /// Append to the owner's history and return the entries that preceded it.
    fn record(&self, owner: &str, message: ChatMessage) -> Vec<ChatMessage> {
        let mut contexts = self.contexts();
        let context = contexts
            .entry(owner.to_string())
            .or_insert_with(|| OwnerContext::new(self.settings.max_history));
        let prior = context.history().to_vec();
        context.push(message);
        prior
    }

    fn contexts(&self) -> MutexGuard<'_, HashMap<String, OwnerContext>> {
        self.contexts.lock().unwrap_or_else(|err| err.into_inner())
    }
}

/// `output` cut to `max_chars` characters with a truncation marker, or
/// unchanged when it already fits.
pub fn truncate_output(output: &str, max_chars: usize) -> String {
    match output.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &output[..cut]),
        None => output.to_string(),
    }
}
