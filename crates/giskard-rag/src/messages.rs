//! Chat message types exchanged with completion providers.
//!
//! Messages serialize with a `role` tag (`system`/`user`/`assistant`) so a
//! conversation history round-trips as the familiar role/content records.

use serde::{Deserialize, Serialize};

/// A single tool/function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool the model wants to call
    pub name: String,
    /// Arguments as a JSON object
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// A chat message with a role and text content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    /// System instruction
    System {
        /// Text content
        content: String,
    },
    /// End-user turn
    #[serde(rename = "user")]
    Human {
        /// Text content
        content: String,
    },
    /// Model turn, possibly carrying tool calls
    #[serde(rename = "assistant")]
    Ai {
        /// Text content
        content: String,
        /// Tool calls requested by the model, empty for plain text answers
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn human(content: impl Into<String>) -> Self {
        Message::Human {
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn ai(content: impl Into<String>) -> Self {
        Message::Ai {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant message carrying tool calls
    pub fn ai_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Ai {
            content: content.into(),
            tool_calls,
        }
    }

    /// The message's role as a wire-format string
    #[must_use]
    pub fn role(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::Human { .. } => "user",
            Message::Ai { .. } => "assistant",
        }
    }

    /// The message's text content
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::Human { content }
            | Message::Ai { content, .. } => content,
        }
    }

    /// Tool calls carried by this message (empty for non-assistant messages)
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Ai { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_roles() {
        assert_eq!(Message::system("s").role(), "system");
        assert_eq!(Message::human("h").role(), "user");
        assert_eq!(Message::ai("a").role(), "assistant");
    }

    #[test]
    fn test_serialization_shape() {
        let msg = Message::human("What does the warranty cover?");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"role": "user", "content": "What does the warranty cover?"})
        );
    }

    #[test]
    fn test_tool_calls_round_trip() {
        let msg = Message::ai_with_tool_calls(
            "",
            vec![ToolCall::new(
                "generate_inputs",
                json!({"inputs": [{"question": "q"}]}),
            )],
        );
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tool_calls().len(), 1);
        assert_eq!(back.tool_calls()[0].name, "generate_inputs");
    }

    #[test]
    fn test_plain_ai_message_has_no_tool_calls_field() {
        let json = serde_json::to_string(&Message::ai("hello")).unwrap();
        assert!(!json.contains("tool_calls"));
    }
}
