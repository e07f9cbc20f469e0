//! Chat completion provider interface.
//!
//! The [`ChatModel`] trait is the single seam between the generation
//! pipeline and any LLM backend. Providers take an ordered message list and
//! optionally a set of tool definitions; they answer with a [`ChatResult`]
//! exposing either free text or the arguments of a requested tool call.
//!
//! [`FakeChatModel`] returns scripted responses and records every call,
//! which is what the test suites use in place of a network provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::messages::{Message, ToolCall};

/// Definition of a tool/function the model may be asked to call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Short description shown to the model
    pub description: String,
    /// JSON Schema of the tool's arguments
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Which tool(s) the model is allowed or forced to call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolChoice {
    /// The model decides whether to call a tool
    Auto,
    /// The model must call the named tool
    Required(String),
}

/// Options for a single completion call.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Sampling temperature; `None` uses the provider default
    pub temperature: Option<f32>,
    /// Tool definitions the model may call
    pub tools: Vec<ToolDefinition>,
    /// Tool choice constraint
    pub tool_choice: Option<ToolChoice>,
}

impl CompletionOptions {
    /// Plain free-text completion at the given temperature
    #[must_use]
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            ..Self::default()
        }
    }

    /// Completion forced through a single tool call
    #[must_use]
    pub fn forced_tool(tool: ToolDefinition, temperature: Option<f32>) -> Self {
        let name = tool.name.clone();
        Self {
            temperature,
            tools: vec![tool],
            tool_choice: Some(ToolChoice::Required(name)),
        }
    }
}

/// Result of one completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResult {
    /// The assistant message returned by the provider
    pub message: Message,
}

impl ChatResult {
    /// Create a result from an assistant message
    #[must_use]
    pub fn new(message: Message) -> Self {
        Self { message }
    }

    /// The free-text content of the response
    #[must_use]
    pub fn text(&self) -> &str {
        self.message.content()
    }

    /// The first tool call with the given name, if any
    #[must_use]
    pub fn tool_call(&self, name: &str) -> Option<&ToolCall> {
        self.message.tool_calls().iter().find(|tc| tc.name == name)
    }
}

/// Trait for chat models that generate responses to messages.
///
/// Implementations wrap a concrete provider (OpenAI-compatible endpoints,
/// local models, mocks). Provider failures must surface as
/// [`Error::Provider`] with the original cause in the message; this layer
/// never retries.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a response for the given messages.
    async fn complete(&self, messages: &[Message], options: &CompletionOptions)
        -> Result<ChatResult>;

    /// Unique identifier for the model type (used in logs)
    fn llm_type(&self) -> &str;
}

/// Fake chat model for testing.
///
/// Returns predefined assistant messages in order, cycling when exhausted,
/// and records every call so tests can assert on the prompts that were sent.
#[derive(Debug, Default)]
pub struct FakeChatModel {
    responses: Vec<Message>,
    response_index: std::sync::Mutex<usize>,
    calls: std::sync::Mutex<Vec<Vec<Message>>>,
}

impl FakeChatModel {
    /// Create a fake model answering with the given plain-text responses
    #[must_use]
    pub fn new(responses: Vec<String>) -> Self {
        Self::from_messages(responses.into_iter().map(Message::ai).collect())
    }

    /// Create a fake model answering with the given assistant messages
    #[must_use]
    pub fn from_messages(responses: Vec<Message>) -> Self {
        Self {
            responses,
            response_index: std::sync::Mutex::new(0),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Convenience: responses that each carry one `generate_inputs` tool call
    /// with the given argument objects.
    #[must_use]
    pub fn with_tool_responses(tool_name: &str, arguments: Vec<serde_json::Value>) -> Self {
        Self::from_messages(
            arguments
                .into_iter()
                .map(|args| Message::ai_with_tool_calls("", vec![ToolCall::new(tool_name, args)]))
                .collect(),
        )
    }

    /// All message lists this model has been called with, in order
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn next_response(&self) -> Result<Message> {
        let mut idx = self
            .response_index
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if self.responses.is_empty() {
            return Err(Error::provider("FakeChatModel has no scripted responses"));
        }
        let response = self.responses[*idx % self.responses.len()].clone();
        *idx += 1;
        Ok(response)
    }
}

#[async_trait]
impl ChatModel for FakeChatModel {
    async fn complete(
        &self,
        messages: &[Message],
        _options: &CompletionOptions,
    ) -> Result<ChatResult> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(messages.to_vec());
        Ok(ChatResult::new(self.next_response()?))
    }

    fn llm_type(&self) -> &str {
        "fake_chat_model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fake_model_cycles_responses() {
        let model = FakeChatModel::new(vec!["one".into(), "two".into()]);
        let opts = CompletionOptions::default();
        let msgs = [Message::human("hi")];

        assert_eq!(model.complete(&msgs, &opts).await.unwrap().text(), "one");
        assert_eq!(model.complete(&msgs, &opts).await.unwrap().text(), "two");
        assert_eq!(model.complete(&msgs, &opts).await.unwrap().text(), "one");
    }

    #[tokio::test]
    async fn test_fake_model_records_calls() {
        let model = FakeChatModel::new(vec!["ok".into()]);
        let opts = CompletionOptions::default();
        model
            .complete(&[Message::system("a"), Message::human("b")], &opts)
            .await
            .unwrap();

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 2);
        assert_eq!(calls[0][0].content(), "a");
    }

    #[tokio::test]
    async fn test_tool_responses() {
        let model = FakeChatModel::with_tool_responses(
            "generate_inputs",
            vec![json!({"inputs": [{"question": "What is covered?"}]})],
        );
        let result = model
            .complete(&[Message::system("p")], &CompletionOptions::default())
            .await
            .unwrap();

        let call = result.tool_call("generate_inputs").unwrap();
        assert_eq!(call.arguments["inputs"][0]["question"], "What is covered?");
        assert!(result.tool_call("other_tool").is_none());
    }

    #[tokio::test]
    async fn test_empty_script_is_a_provider_error() {
        let model = FakeChatModel::new(vec![]);
        let err = model
            .complete(&[Message::human("hi")], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }
}
