pub mod chat;
pub mod client;
pub mod command;
pub mod markdown;
pub mod protocol;
pub mod quick_reply;

pub use chat::ChatTranslator;
pub use client::ChatClient;
pub use command::{parse_command, AdeAction, AdeCommand, UNDERSTOOD_NOTHING};
pub use markdown::sanitize_markdown;
pub use protocol::{protocol_version, ProtocolDoc, BUILTIN_PROTOCOL};
pub use quick_reply::{is_dev_message, quick_reply};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("translation request failed: {0}")]
    Request(String),
    #[error("translation service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("translation service returned an empty response")]
    EmptyResponse,
    #[error("failed to parse translation response: {0}")]
    Parse(String),
}

/// The two calls the engine makes against the language service.
///
/// `translate_request` should degrade malformed model output to a clarify
/// command rather than fail; errors are reserved for transport problems.
pub trait Translator: Send + Sync {
    fn translate_request(
        &self,
        token: &str,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<AdeCommand, TranslateError>;

    fn humanize(&self, token: &str, output: &str, context: &str) -> Result<String, TranslateError>;
}
