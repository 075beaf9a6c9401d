use crate::message::Message;

/// Reasoning/thinking content returned alongside a response, when the model
/// and [`crate::request::ReasoningMode`] combination produces one.
#[derive(Debug, Clone)]
pub struct ReasoningContent {
    pub content: String,
    pub is_redacted: bool,
}

/// Token accounting for one call, used to drive `latestTokenUsage` in the
/// engine's prompt session (`C2`).
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageMetadata {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl UsageMetadata {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Result of one non-streaming call to an [`crate::LlmExecutor`].
///
/// `execute` returns `Vec<Message>` directly (a call may produce more than
/// one message, e.g. a tool-call message followed by nothing further until
/// the tool result comes back); `ChatResponse` wraps that together with the
/// usage/reasoning side-channel so executors have one return type to build.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub messages: Vec<Message>,
    pub usage: Option<UsageMetadata>,
    pub reasoning: Option<ReasoningContent>,
}

impl ChatResponse {
    pub fn single(message: Message) -> Self {
        Self {
            messages: vec![message],
            usage: None,
            reasoning: None,
        }
    }

    pub fn with_usage(mut self, usage: UsageMetadata) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Convenience accessor used by call sites that only expect one message.
    pub fn first_message(&self) -> Option<&Message> {
        self.messages.first()
    }
}

/// One candidate out of `executeMultipleChoices` (`C9`).
#[derive(Debug, Clone)]
pub struct Choice {
    pub messages: Vec<Message>,
    pub usage: Option<UsageMetadata>,
}

/// Outcome of a `moderate` call.
#[derive(Debug, Clone)]
pub struct ModerationResult {
    pub flagged: bool,
    pub categories: Vec<String>,
}
