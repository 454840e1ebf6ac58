use crate::shared::now_millis;
use serde::Serialize;
use serde_json::{Map, Value};

const BASH_SUMMARY_CHARS: usize = 80;
const TASK_SUMMARY_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Text,
    ToolUse,
    Result,
    Error,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputChunk {
    pub kind: ChunkKind,
    pub content: String,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl OutputChunk {
    fn new(kind: ChunkKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            timestamp: now_millis(),
            tool_name: None,
        }
    }
}

/// Incremental parser for the line-delimited stream the assistant CLI writes
/// on stdout.
///
/// Bytes are buffered until a `\n` arrives, so a line split across reads is
/// parsed once it is complete. Lines that are not JSON objects pass through as
/// raw text and keep their line break; JSON objects of unknown shape are
/// dropped. The accumulated output is the plain concatenation of the parts.
#[derive(Debug, Default)]
pub struct StreamParser {
    pending: Vec<u8>,
    parts: Vec<String>,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) -> Vec<OutputChunk> {
        self.pending.extend_from_slice(data);
        let mut chunks = Vec::new();
        while let Some(pos) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.parse_line(&String::from_utf8_lossy(&line[..pos]), &mut chunks);
        }
        chunks
    }

    /// Parse whatever partial line is still buffered.
    pub fn finish(&mut self) -> Vec<OutputChunk> {
        let rest = std::mem::take(&mut self.pending);
        let mut chunks = Vec::new();
        self.parse_line(&String::from_utf8_lossy(&rest), &mut chunks);
        chunks
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn output(&self) -> String {
        self.parts.concat().trim_end().to_string()
    }

    fn parse_line(&mut self, line: &str, chunks: &mut Vec<OutputChunk>) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }

        let event = match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(event)) => event,
            _ => {
                let fragment = format!("{trimmed}\n");
                self.parts.push(fragment.clone());
                chunks.push(OutputChunk::new(ChunkKind::Text, fragment));
                return;
            }
        };

        match event.get("type").and_then(Value::as_str) {
            Some("assistant") => self.parse_assistant(&event, chunks),
            Some("result") => self.parse_result(&event, chunks),
            Some("system") => {
                let content = str_field(&event, "message")
                    .or_else(|| str_field(&event, "subtype"))
                    .unwrap_or_default();
                chunks.push(OutputChunk::new(ChunkKind::System, content));
            }
            Some("error") => {
                let content = event
                    .get("error")
                    .and_then(|error| {
                        error
                            .get("message")
                            .and_then(Value::as_str)
                            .or_else(|| error.as_str())
                    })
                    .or_else(|| str_field(&event, "message"))
                    .unwrap_or("unknown error");
                chunks.push(OutputChunk::new(ChunkKind::Error, content));
            }
            _ => {}
        }
    }

    fn parse_assistant(&mut self, event: &Map<String, Value>, chunks: &mut Vec<OutputChunk>) {
        let Some(content) = event.get("message").and_then(|message| message.get("content")) else {
            return;
        };

        if let Some(text) = content.as_str() {
            if !text.is_empty() {
                self.parts.push(text.to_string());
                chunks.push(OutputChunk::new(ChunkKind::Text, text));
            }
            return;
        }

        let Some(blocks) = content.as_array() else {
            return;
        };
        for block in blocks {
            match block.get("type").and_then(Value::as_str) {
                Some("text") => {
                    if let Some(text) = block.get("text").and_then(Value::as_str) {
                        self.parts.push(text.to_string());
                        chunks.push(OutputChunk::new(ChunkKind::Text, text));
                    }
                }
                Some("tool_use") => {
                    let tool_name = block
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown");
                    let mut chunk = OutputChunk::new(
                        ChunkKind::ToolUse,
                        summarize_tool(tool_name, block.get("input")),
                    );
                    chunk.tool_name = Some(tool_name.to_string());
                    chunks.push(chunk);
                }
                _ => {}
            }
        }
    }

    fn parse_result(&mut self, event: &Map<String, Value>, chunks: &mut Vec<OutputChunk>) {
        let result = str_field(event, "result").unwrap_or_default();
        let streamed = result.trim().is_empty() || self.parts.concat().contains(result.trim());
        if !streamed {
            self.parts.push(result.to_string());
        }
        let kind = if event.get("is_error").and_then(Value::as_bool) == Some(true) {
            ChunkKind::Error
        } else {
            ChunkKind::Result
        };
        chunks.push(OutputChunk::new(kind, result));
    }
}

fn str_field<'a>(event: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    event.get(key).and_then(Value::as_str)
}

/// Short human-readable description of a tool invocation.
pub fn summarize_tool(tool_name: &str, input: Option<&Value>) -> String {
    let field = |key: &str| {
        input
            .and_then(|input| input.get(key))
            .and_then(Value::as_str)
    };
    match tool_name {
        "Read" => format!("Reading {}", field("file_path").unwrap_or("file")),
        "Write" => format!("Writing {}", field("file_path").unwrap_or("file")),
        "Edit" => format!("Editing {}", field("file_path").unwrap_or("file")),
        "Bash" => format!(
            "Running: {}",
            truncate_chars(field("command").unwrap_or_default(), BASH_SUMMARY_CHARS)
        ),
        "Glob" => format!("Searching files: {}", field("pattern").unwrap_or_default()),
        "Grep" => format!("Searching code: {}", field("pattern").unwrap_or_default()),
        "Task" => format!(
            "Running subtask: {}",
            truncate_chars(field("description").unwrap_or_default(), TASK_SUMMARY_CHARS)
        ),
        other => format!("Using tool: {other}"),
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_all(input: &str) -> (Vec<OutputChunk>, StreamParser) {
        let mut parser = StreamParser::new();
        let mut chunks = parser.push(input.as_bytes());
        chunks.extend(parser.finish());
        (chunks, parser)
    }

    #[test]
    fn raw_lines_pass_through_as_text() {
        let (chunks, parser) = parse_all("hi\nthere");
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|chunk| chunk.kind == ChunkKind::Text));
        assert_eq!(parser.parts(), ["hi\n".to_string(), "there\n".to_string()]);
        assert_eq!(parser.output(), "hi\nthere");
    }

    #[test]
    fn json_scalars_are_treated_as_raw_text() {
        let (chunks, parser) = parse_all("42\n\"quoted\"\n");
        assert_eq!(chunks.len(), 2);
        assert_eq!(parser.parts(), ["42\n".to_string(), "\"quoted\"\n".to_string()]);
    }

    #[test]
    fn lines_split_across_reads_are_reassembled() {
        let mut parser = StreamParser::new();
        let line = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hello"}]}}"#;
        let (head, tail) = line.split_at(20);
        assert!(parser.push(head.as_bytes()).is_empty());
        let chunks = parser.push(format!("{tail}\n").as_bytes());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "hello");
        assert!(parser.finish().is_empty());
    }

    #[test]
    fn assistant_blocks_produce_text_and_tool_summaries() {
        let line = json!({
            "type": "assistant",
            "message": {"content": [
                {"type": "text", "text": "Looking at the file"},
                {"type": "tool_use", "name": "Read", "input": {"file_path": "/src/lib.rs"}},
                {"type": "tool_use", "name": "Bash", "input": {"command": "x".repeat(100)}},
                {"type": "tool_use", "name": "Mystery", "input": {}}
            ]}
        })
        .to_string();
        let (chunks, parser) = parse_all(&line);
        assert_eq!(chunks[0].kind, ChunkKind::Text);
        assert_eq!(chunks[1].kind, ChunkKind::ToolUse);
        assert_eq!(chunks[1].content, "Reading /src/lib.rs");
        assert_eq!(chunks[1].tool_name.as_deref(), Some("Read"));
        assert_eq!(chunks[2].content, format!("Running: {}", "x".repeat(80)));
        assert_eq!(chunks[3].content, "Using tool: Mystery");
        assert_eq!(parser.parts(), ["Looking at the file".to_string()]);
    }

    #[test]
    fn result_is_only_accumulated_when_not_already_streamed() {
        let stream = [
            json!({"type": "assistant", "message": {"content": "done"}}).to_string(),
            json!({"type": "result", "result": "done"}).to_string(),
        ]
        .join("\n");
        let (chunks, parser) = parse_all(&stream);
        assert_eq!(chunks[1].kind, ChunkKind::Result);
        assert_eq!(parser.output(), "done");

        let (_, parser) = parse_all(&json!({"type": "result", "result": "final"}).to_string());
        assert_eq!(parser.output(), "final");
    }

    #[test]
    fn assistant_text_blocks_concatenate_verbatim() {
        let stream = [
            json!({"type": "assistant", "message": {"content": [
                {"type": "text", "text": "Hello "},
                {"type": "tool_use", "name": "Glob", "input": {"pattern": "*.rs"}},
                {"type": "text", "text": "world"}
            ]}})
            .to_string(),
            json!({"type": "result", "result": "Hello world"}).to_string(),
        ]
        .join("\n");
        let (_, parser) = parse_all(&stream);
        assert_eq!(parser.parts(), ["Hello ".to_string(), "world".to_string()]);
        assert_eq!(parser.output(), "Hello world");
    }

    #[test]
    fn raw_lines_keep_their_breaks_next_to_assistant_text() {
        let stream = [
            "warming up".to_string(),
            json!({"type": "assistant", "message": {"content": "step one. "}}).to_string(),
            json!({"type": "assistant", "message": {"content": "step two."}}).to_string(),
        ]
        .join("\n");
        let (_, parser) = parse_all(&stream);
        assert_eq!(parser.output(), "warming up\nstep one. step two.");
    }

    #[test]
    fn error_results_and_system_notices_are_typed() {
        let stream = [
            json!({"type": "system", "subtype": "init"}).to_string(),
            json!({"type": "result", "result": "quota", "is_error": true}).to_string(),
            json!({"type": "error", "error": {"message": "overloaded"}}).to_string(),
            json!({"type": "user", "message": {"content": []}}).to_string(),
        ]
        .join("\n");
        let (chunks, _) = parse_all(&stream);
        let kinds: Vec<ChunkKind> = chunks.iter().map(|chunk| chunk.kind).collect();
        assert_eq!(
            kinds,
            vec![ChunkKind::System, ChunkKind::Error, ChunkKind::Error]
        );
        assert_eq!(chunks[0].content, "init");
        assert_eq!(chunks[2].content, "overloaded");
    }

    #[test]
    fn text_chunks_reproduce_raw_fragments_in_order() {
        let fragments = ["alpha beta", "  gamma", "{not json", "delta  "];
        let (chunks, parser) = parse_all(&fragments.join("\n"));
        let text: String = chunks
            .iter()
            .filter(|chunk| chunk.kind == ChunkKind::Text)
            .map(|chunk| chunk.content.as_str())
            .collect();
        let expected: String = fragments
            .iter()
            .map(|fragment| format!("{}\n", fragment.trim()))
            .collect();
        assert_eq!(text, expected);
        assert_eq!(parser.output(), expected.trim_end());
    }
}
