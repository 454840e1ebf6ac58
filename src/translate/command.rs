use super::TranslateError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const UNDERSTOOD_NOTHING: &str = "I could not understand your request. Could you rephrase it?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum AdeAction {
    Execute,
    Query,
    Approve,
    Cancel,
    Clarify,
    Other,
}

impl From<String> for AdeAction {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "execute" => Self::Execute,
            "query" => Self::Query,
            "approve" => Self::Approve,
            "cancel" => Self::Cancel,
            "clarify" => Self::Clarify,
            _ => Self::Other,
        }
    }
}

impl AdeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Execute => "execute",
            Self::Query => "query",
            Self::Approve => "approve",
            Self::Cancel => "cancel",
            Self::Clarify => "clarify",
            Self::Other => "other",
        }
    }
}

/// Structured command produced by translating a user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdeCommand {
    pub action: AdeAction,
    #[serde(default, deserialize_with = "null_as_default")]
    pub agent: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub command: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub args: Map<String, Value>,
    pub confidence: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub raw_prompt: String,
    #[serde(default)]
    pub clarification: Option<String>,
}

impl AdeCommand {
    pub fn clarify(message: impl Into<String>) -> Self {
        Self {
            action: AdeAction::Clarify,
            agent: String::new(),
            command: String::new(),
            args: Map::new(),
            confidence: 0.0,
            raw_prompt: String::new(),
            clarification: Some(message.into()),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a model reply into a command. Markdown code fences around the JSON
/// are tolerated; `action` and a numeric `confidence` are required.
pub fn parse_command(reply: &str) -> Result<AdeCommand, TranslateError> {
    let body = strip_code_fences(reply);
    let value: Value =
        serde_json::from_str(&body).map_err(|err| TranslateError::Parse(err.to_string()))?;
    let Some(object) = value.as_object() else {
        return Err(TranslateError::Parse(
            "command must be a JSON object".to_string(),
        ));
    };
    match object.get("action") {
        Some(Value::String(action)) if !action.is_empty() => {}
        _ => {
            return Err(TranslateError::Parse(
                "command is missing `action`".to_string(),
            ))
        }
    }
    if !object.get("confidence").is_some_and(Value::is_number) {
        return Err(TranslateError::Parse(
            "command is missing a numeric `confidence`".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|err| TranslateError::Parse(err.to_string()))
}

fn strip_code_fences(reply: &str) -> String {
    let mut out = String::with_capacity(reply.len());
    let mut rest = reply;
    while let Some(idx) = rest.find("```") {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + 3..];
        if let Some(after) = rest.strip_prefix("json") {
            rest = after;
        }
        if let Some(after) = rest.strip_prefix('\n') {
            rest = after;
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_reply() {
        let reply = "```json\n{\"action\":\"execute\",\"agent\":\"dev\",\"command\":\"*develop\",\"args\":{\"story\":\"1.2\"},\"confidence\":0.92,\"rawPrompt\":\"implement story 1.2\",\"clarification\":null}\n```";
        let command = parse_command(reply).expect("parse");
        assert_eq!(command.action, AdeAction::Execute);
        assert_eq!(command.agent, "dev");
        assert_eq!(command.raw_prompt, "implement story 1.2");
        assert_eq!(command.args.get("story"), Some(&Value::from("1.2")));
        assert!(command.clarification.is_none());
    }

    #[test]
    fn missing_fields_default_and_nulls_are_tolerated() {
        let command =
            parse_command(r#"{"action":"query","confidence":1,"agent":null}"#).expect("parse");
        assert_eq!(command.action, AdeAction::Query);
        assert_eq!(command.agent, "");
        assert!(command.args.is_empty());
    }

    #[test]
    fn unknown_actions_parse_as_other() {
        let command = parse_command(r#"{"action":"dance","confidence":0.8}"#).expect("parse");
        assert_eq!(command.action, AdeAction::Other);
    }

    #[test]
    fn rejects_replies_without_required_fields() {
        for reply in [
            "not json at all",
            r#"["action"]"#,
            r#"{"confidence":0.9}"#,
            r#"{"action":"","confidence":0.9}"#,
            r#"{"action":"execute","confidence":"high"}"#,
        ] {
            assert!(
                matches!(parse_command(reply), Err(TranslateError::Parse(_))),
                "{reply} should fail"
            );
        }
    }

    #[test]
    fn clarify_fallback_has_zero_confidence() {
        let command = AdeCommand::clarify(UNDERSTOOD_NOTHING);
        assert_eq!(command.action, AdeAction::Clarify);
        assert_eq!(command.confidence, 0.0);
        assert_eq!(command.clarification.as_deref(), Some(UNDERSTOOD_NOTHING));
    }
}
