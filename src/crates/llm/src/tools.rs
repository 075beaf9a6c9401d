use serde_json::Value;

/// Declaration of a tool exposed to the model, sent alongside a request so
/// the provider can decide when to emit a [`crate::ToolCallRequest`].
///
/// This is deliberately a plain data description rather than the engine's
/// `Tool` type (which also carries the executor closure) — the executor
/// boundary only needs enough to build the provider's function-calling
/// payload.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters_schema,
        }
    }
}

/// How strongly the engine wants the model to emit tool calls on this turn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToolChoice {
    #[default]
    Auto,
    Required,
    None,
    Named(String),
}
