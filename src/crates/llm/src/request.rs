use crate::message::Prompt;
use crate::tools::{ToolChoice, ToolDefinition};

/// How the model should surface intermediate reasoning, when it supports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReasoningMode {
    Disabled,
    #[default]
    Default,
    /// Reasoning content is returned as a separate field rather than inline.
    Separated,
    Extended,
}

impl ReasoningMode {
    pub fn should_capture(&self) -> bool {
        !matches!(self, ReasoningMode::Disabled)
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, ReasoningMode::Extended)
    }
}

/// Sampling and behavior configuration for one call to an [`crate::LlmExecutor`].
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub reasoning_mode: ReasoningMode,
    pub stop_sequences: Vec<String>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub tool_choice: ToolChoice,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: None,
            reasoning_mode: ReasoningMode::default(),
            stop_sequences: Vec::new(),
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            tool_choice: ToolChoice::default(),
        }
    }
}

/// A full request to an [`crate::LlmExecutor`]: a prompt, the tools it may call, and config.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub prompt: Prompt,
    pub tools: Vec<ToolDefinition>,
    pub config: ChatConfig,
}

impl ChatRequest {
    pub fn new(prompt: Prompt) -> Self {
        Self {
            prompt,
            tools: Vec::new(),
            config: ChatConfig::default(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t);
        self
    }

    pub fn with_max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn with_reasoning(mut self, mode: ReasoningMode) -> Self {
        self.config.reasoning_mode = mode;
        self
    }

    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.config.tool_choice = choice;
        self
    }
}
