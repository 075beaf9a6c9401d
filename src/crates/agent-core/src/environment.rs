//! The `Environment` collaborator (`§6 EXTERNAL INTERFACES: Environment`).
//!
//! The engine never talks to the outside world directly — no HTTP, no
//! filesystem, no terminal. Every place the spec calls for an external
//! effect (running the tools for a batch of calls, reporting a problem so
//! an operator can see it, or letting a human pick among several LLM
//! choices) goes through this trait instead. `agent-core` ships no
//! concrete implementation beyond the in-memory test double below, mirroring
//! the teacher's `ToolRuntime`/`Store` split between interface and backend.

use async_trait::async_trait;
use llm::Choice;

use crate::error::Result;
use crate::tool_registry::{ToolCall, ToolCallOutcome, ToolDescriptor};

/// External collaborator for a run: executes tool batches on the host's
/// behalf and receives problem reports. `select_choice` backs
/// [`crate::choice::InteractiveChoiceSelection`] for human-in-the-loop
/// choice among candidate LLM responses.
#[async_trait]
pub trait Environment: Send + Sync {
    /// Run a batch of tool calls and return their outcomes. Most
    /// implementations just forward to a [`crate::tool_registry::ToolRegistry`];
    /// the indirection exists so an embedder can interpose sandboxing,
    /// audit logging, or remote execution without the engine knowing.
    async fn execute_tools(&self, calls: Vec<ToolCall>) -> Vec<ToolCallOutcome>;

    /// Reports a problem encountered during a run. Must not throw — an
    /// environment that can't report a problem swallows it rather than
    /// compounding the original failure. Called for `FeatureHandlerError`,
    /// tool failures, and on `agentExecutionFailed` before the error is
    /// rethrown to the caller.
    async fn report_problem(&self, error: &str);

    /// Pick one of several candidate choices, typically by delegating to a
    /// human. The default errors out, since most environments have no
    /// interactive surface; override when wiring a human-in-the-loop UI.
    async fn select_choice(&self, choices: &[Choice]) -> Result<usize> {
        let _ = choices;
        Err(crate::error::GraphError::custom(
            "environment does not support interactive choice selection",
        ))
    }

    /// Tool definitions available to the LLM on this run, used to populate
    /// `ChatRequest.tools` for `llmRequest` nodes. The default is empty,
    /// matching an environment with no tool-executing backend.
    fn tool_descriptors(&self) -> Vec<ToolDescriptor> {
        Vec::new()
    }
}

/// Test/reference `Environment`: executes tools through a bundled
/// [`crate::tool_registry::ToolRegistry`] and records reported problems in
/// memory instead of sending them anywhere.
pub struct RecordingEnvironment {
    registry: crate::tool_registry::ToolRegistry,
    dispatch_mode: crate::tool_registry::DispatchMode,
    problems: tokio::sync::Mutex<Vec<String>>,
}

impl RecordingEnvironment {
    pub fn new(registry: crate::tool_registry::ToolRegistry, dispatch_mode: crate::tool_registry::DispatchMode) -> Self {
        RecordingEnvironment {
            registry,
            dispatch_mode,
            problems: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// Problems reported so far, in report order.
    pub async fn problems(&self) -> Vec<String> {
        self.problems.lock().await.clone()
    }
}

#[async_trait]
impl Environment for RecordingEnvironment {
    async fn execute_tools(&self, calls: Vec<ToolCall>) -> Vec<ToolCallOutcome> {
        self.registry.execute_calls(calls, self.dispatch_mode).await
    }

    async fn report_problem(&self, error: &str) {
        self.problems.lock().await.push(error.to_string());
    }

    fn tool_descriptors(&self) -> Vec<ToolDescriptor> {
        self.registry.descriptors().into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_registry::{DispatchMode, RegisteredTool, ToolDescriptor, ToolRegistry};
    use serde_json::json;

    #[tokio::test]
    async fn recording_environment_dispatches_through_registry() {
        let mut registry = ToolRegistry::new();
        registry.register(RegisteredTool::new(
            ToolDescriptor {
                name: "echo".into(),
                description: "echoes".into(),
                arg_schema: json!({"type": "object"}),
                result_schema: json!({"type": "object"}),
            },
            |args| async move { Ok(args) },
        ));
        let env = RecordingEnvironment::new(registry, DispatchMode::Single);
        let outcomes = env
            .execute_tools(vec![ToolCall {
                id: "1".into(),
                name: "echo".into(),
                arguments: json!({"x": 1}),
            }])
            .await;
        assert_eq!(outcomes[0].result, Ok(json!({"x": 1})));
    }

    #[tokio::test]
    async fn problems_are_recorded_in_report_order() {
        let env = RecordingEnvironment::new(ToolRegistry::new(), DispatchMode::Single);
        env.report_problem("first").await;
        env.report_problem("second").await;
        assert_eq!(env.problems().await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn default_select_choice_errors_without_override() {
        let env = RecordingEnvironment::new(ToolRegistry::new(), DispatchMode::Single);
        let choices = vec![Choice {
            messages: vec![],
            usage: None,
        }];
        assert!(env.select_choice(&choices).await.is_err());
    }
}
