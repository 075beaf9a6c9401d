//! Message and prompt types exchanged with an [`LlmExecutor`](crate::LlmExecutor).
//!
//! These types are the wire shape of the boundary between the agent engine
//! (`agent-core`) and whatever concrete model client an embedder plugs in.
//! `agent-core` treats [`Message`] as its canonical message type rather than
//! declaring its own and converting at the seam.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message's author.
///
/// Unlike a generic chat SDK, `ToolCall` and `ToolResult` are distinct roles
/// here rather than folded into `Assistant`/`Tool`, matching the engine's
/// node model where tool-call emission and tool-result delivery are separate
/// steps with separate pipeline events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    ToolCall,
    ToolResult,
}

/// A single part of a possibly multi-part message body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { url: String },
    Custom { data: Value },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Body of a [`Message`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Flattened textual view, concatenating any text parts.
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Text(s.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Text(s)
    }
}

/// A requested tool invocation emitted by the model inside an assistant turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Per-response bookkeeping attached to a message (`§3 DATA MODEL: response metadata`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Epoch millis at which the response was produced.
    pub timestamp: Option<i64>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

impl ResponseMetadata {
    pub fn total(&self) -> u32 {
        self.total_tokens
            .or_else(|| {
                Some(self.prompt_tokens.unwrap_or(0) + self.completion_tokens.unwrap_or(0))
            })
            .unwrap_or(0)
    }
}

/// A single message in a [`Prompt`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Option<String>,
    pub role: MessageRole,
    pub content: MessageContent,
    pub name: Option<String>,
    /// Present on assistant messages that requested tool calls.
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    /// Present on `ToolResult` messages, linking back to the requesting call.
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub metadata: ResponseMetadata,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<MessageContent>) -> Self {
        Self {
            id: None,
            role,
            content: content.into(),
            name: None,
            tool_calls: None,
            tool_call_id: None,
            metadata: ResponseMetadata::default(),
        }
    }

    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn tool_result(content: impl Into<MessageContent>, tool_call_id: impl Into<String>) -> Self {
        let mut m = Self::new(MessageRole::ToolResult, content);
        m.tool_call_id = Some(tool_call_id.into());
        m
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_tool_calls(mut self, calls: Vec<ToolCallRequest>) -> Self {
        self.tool_calls = Some(calls);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn is_system(&self) -> bool {
        self.role == MessageRole::System
    }
}

/// An ordered sequence of messages, with the invariant that once a first
/// system message is set it stays first (`§3 DATA MODEL: Prompt`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prompt {
    messages: Vec<Message>,
}

impl Prompt {
    pub fn new() -> Self {
        Self { messages: Vec::new() }
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn system_message(&self) -> Option<&Message> {
        self.messages.first().filter(|m| m.is_system())
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    pub fn replace(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
