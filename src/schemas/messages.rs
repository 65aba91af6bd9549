//! Provider-compatible chat messages with text, tool-call, and tool-result
//! content parts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

/// One tagged content part inside a structured message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    ToolCall {
        id: String,
        name: String,
        args: Value,
    },
    ToolResult {
        tool_call_id: String,
        content: String,
    },
}

/// Message content: either a plain string or an ordered part list.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: MessageContent,
    /// Marks a model-generated summary standing in for earlier history.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub summary: bool,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(text.into()),
            summary: false,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text(text.into()),
            summary: false,
        }
    }

    pub fn assistant_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Parts(parts),
            summary: false,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(text.into()),
            summary: false,
        }
    }

    pub fn summary(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(text.into()),
            summary: true,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: MessageContent::Parts(vec![ContentPart::ToolResult {
                tool_call_id: tool_call_id.into(),
                content: content.into(),
            }]),
            summary: false,
        }
    }

    /// All text carried by this message, parts concatenated in order.
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ToolResult { content, .. } => Some(content.as_str()),
                    ContentPart::ToolCall { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// Tool-call parts, in order, as `(id, name, args)`.
    pub fn tool_calls(&self) -> Vec<(&str, &str, &Value)> {
        match &self.content {
            MessageContent::Text(_) => Vec::new(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::ToolCall { id, name, args } => {
                        Some((id.as_str(), name.as_str(), args))
                    }
                    _ => None,
                })
                .collect(),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_message_wire_shape() {
        let msg = Message::user("Hello");
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v, json!({ "role": "user", "content": "Hello" }));
    }

    #[test]
    fn test_parts_round_trip() {
        let msg = Message::assistant_parts(vec![
            ContentPart::Text {
                text: "thinking".to_string(),
            },
            ContentPart::ToolCall {
                id: "call_1".to_string(),
                name: "ls".to_string(),
                args: json!({ "path": "/" }),
            },
        ]);
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
        assert_eq!(back.tool_calls().len(), 1);
    }

    #[test]
    fn test_tool_result_text() {
        let msg = Message::tool_result("call_1", "3 files");
        assert_eq!(msg.text(), "3 files");
        assert_eq!(msg.role, MessageRole::Tool);
    }

    #[test]
    fn test_summary_flag_hidden_when_false() {
        let v = serde_json::to_value(Message::user("x")).unwrap();
        assert!(v.get("summary").is_none());
        let v = serde_json::to_value(Message::summary("s")).unwrap();
        assert_eq!(v.get("summary"), Some(&json!(true)));
    }
}
