use super::{
    parse_command, sanitize_markdown, AdeCommand, ChatClient, ChatMessage, ProtocolDoc,
    TranslateError, Translator, UNDERSTOOD_NOTHING,
};
use crate::config::TranslationSettings;
use crate::shared::RuntimeLog;
use serde_json::json;

const COMMAND_SCHEMA_INSTRUCTIONS: &str = "\n\n---\n\nRespond ONLY with a valid JSON object matching this schema:\n\
{ \"action\": string, \"agent\": string, \"command\": string, \"args\": object, \"confidence\": number, \"rawPrompt\": string, \"clarification\": string|null }";

const HUMANIZE_INSTRUCTIONS: &str = "You are translating ADE (development engine) output into a user-friendly chat message.\n\
Rules:\n\
- Keep it concise (under 3000 chars)\n\
- Respond in the same language the user used\n\
- Use ONLY chat-compatible markdown:\n\
  * *bold* (single asterisk, NOT double)\n\
  * _italic_ (single underscore)\n\
  * `inline code` (backticks)\n\
  * ```code blocks``` (triple backticks)\n\
  * NO # headers (use *bold* instead)\n\
  * NO [links](url) (write the URL directly)\n\
  * NO > blockquotes\n\
- Summarize long outputs and focus on what was DONE and what the NEXT STEPS are\n\
- Use bullet points (•) for lists\n\
- If the ADE created files, list the key files created\n\
- If there was an error, explain it simply and suggest what to do\n\
- Mention the project workspace path so the user knows where the code is\n\
- Never expose internal errors, stack traces or API keys";

/// [`Translator`] backed by a chat-completions endpoint and the protocol document.
#[derive(Debug)]
pub struct ChatTranslator {
    client: ChatClient,
    protocol: ProtocolDoc,
    history_messages: usize,
    log: RuntimeLog,
}

impl ChatTranslator {
    pub fn new(settings: &TranslationSettings, log: RuntimeLog) -> Self {
        Self {
            client: ChatClient::new(settings, log.clone()),
            protocol: ProtocolDoc::new(settings.protocol_path.clone(), log.clone()),
            history_messages: settings.history_messages,
            log,
        }
    }

    pub fn protocol(&self) -> &ProtocolDoc {
        &self.protocol
    }

    pub fn protocol_version(&self) -> String {
        self.protocol.version()
    }

    fn request_messages(&self, message: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
        let start = history.len().saturating_sub(self.history_messages);
        let mut messages = Vec::with_capacity(history.len() - start + 2);
        messages.push(ChatMessage::system(format!(
            "{}{COMMAND_SCHEMA_INSTRUCTIONS}",
            self.protocol.load()
        )));
        messages.extend_from_slice(&history[start..]);
        messages.push(ChatMessage::user(message));
        messages
    }
}

impl Translator for ChatTranslator {
    fn translate_request(
        &self,
        token: &str,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<AdeCommand, TranslateError> {
        let messages = self.request_messages(message, history);
        self.log.debug(
            "translate.command",
            "translating user message",
            json!({ "messageLength": message.chars().count() }),
        );
        let reply = self.client.complete(token, &messages)?;
        match parse_command(&reply) {
            Ok(command) => Ok(command),
            Err(err) => {
                self.log.error(
                    "translate.parse_failed",
                    "failed to parse command from translation reply",
                    json!({ "error": err.to_string(), "replyLength": reply.chars().count() }),
                );
                Ok(AdeCommand::clarify(UNDERSTOOD_NOTHING))
            }
        }
    }

    fn humanize(&self, token: &str, output: &str, context: &str) -> Result<String, TranslateError> {
        let messages = [
            ChatMessage::system(HUMANIZE_INSTRUCTIONS),
            ChatMessage::user(format!(
                "Context: {context}\n\nADE Output:\n{output}\n\nTranslate this into a user-friendly chat message."
            )),
        ];
        self.log.debug(
            "translate.humanize",
            "humanizing job output",
            json!({ "outputLength": output.chars().count() }),
        );
        let reply = self.client.complete(token, &messages)?;
        Ok(sanitize_markdown(&reply))
    }
}
