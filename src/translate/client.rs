use super::{ChatMessage, TranslateError};
use crate::config::TranslationSettings;
use crate::shared::RuntimeLog;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Blocking client for an OpenAI-style `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    agent: ureq::Agent,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    log: RuntimeLog,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    total_tokens: Option<u64>,
}

impl ChatClient {
    pub fn new(settings: &TranslationSettings, log: RuntimeLog) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build();
        Self {
            agent,
            api_base: settings.api_base.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            log,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    /// Send `messages` and return the first choice's content.
    pub fn complete(&self, token: &str, messages: &[ChatMessage]) -> Result<String, TranslateError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let payload =
            serde_json::to_value(&body).map_err(|err| TranslateError::Request(err.to_string()))?;

        self.log.debug(
            "translate.request",
            "chat completion request",
            json!({ "messageCount": messages.len(), "model": self.model }),
        );

        let response = self
            .agent
            .post(&self.endpoint())
            .set("Authorization", &format!("Bearer {token}"))
            .send_json(payload)
            .map_err(|err| match err {
                ureq::Error::Status(status, response) => TranslateError::Status {
                    status,
                    body: response.into_string().unwrap_or_default(),
                },
                ureq::Error::Transport(transport) => TranslateError::Request(transport.to_string()),
            })?;

        let parsed: CompletionResponse = response
            .into_json()
            .map_err(|err| TranslateError::Parse(format!("invalid completion body: {err}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(TranslateError::EmptyResponse)?;

        self.log.debug(
            "translate.response",
            "chat completion response",
            json!({
                "tokens": parsed.usage.and_then(|usage| usage.total_tokens),
                "contentLength": content.chars().count(),
            }),
        );
        Ok(content)
    }
}
