//! Example of wiring a minimal sequential tool-calling strategy.
//!
//! Demonstrates the shape an embedder actually builds against: a `Subgraph`
//! strung together from `LlmRequest` -> `ToolExecute` -> `ToolResultSend`,
//! run through `StrategyRunner` against a `RunContext` bound to a real
//! `LlmExecutor` and `Environment`. This file is not compiled as part of the
//! crate; it documents the pattern.
//!
//! ```rust,ignore
//! use agent_core::{
//!     Edge, Graph, NodeKind, RunConfig, RunContext, StrategyRunner, Subgraph,
//! };
//! use agent_core::environment::RecordingEnvironment;
//! use agent_core::feature::FeaturePipeline;
//! use agent_core::prompt::PromptState;
//! use agent_core::tool_registry::{DispatchMode, RegisteredTool, ToolDescriptor, ToolRegistry};
//! use llm::{Message, Prompt};
//! use std::sync::Arc;
//!
//! async fn run(llm: Arc<dyn llm::LlmExecutor>) -> agent_core::Result<serde_json::Value> {
//!     let mut registry = ToolRegistry::new();
//!     registry.register(RegisteredTool::new(
//!         ToolDescriptor {
//!             name: "search".into(),
//!             description: "looks something up".into(),
//!             arg_schema: serde_json::json!({"type": "object"}),
//!             result_schema: serde_json::json!({"type": "object"}),
//!         },
//!         |args| async move { Ok(args) },
//!     ));
//!     let environment = Arc::new(RecordingEnvironment::new(registry, DispatchMode::Single));
//!
//!     let strategy = Subgraph::new("chat", "chat:start", "chat:finish")
//!         .with_node("chat:start", NodeKind::LlmRequest { forbid_tool_calls: false })
//!         .with_node("chat:exec", NodeKind::ToolExecute)
//!         .with_node("chat:send", NodeKind::ToolResultSend)
//!         .with_edge(Edge::always("chat:start", "chat:exec"))
//!         .with_edge(Edge::always("chat:exec", "chat:send"))
//!         .with_edge(Edge::always("chat:send", "chat:finish"));
//!     let graph = Arc::new(Graph::build("chat", vec![strategy])?);
//!
//!     let ctx = RunContext::new(
//!         uuid::Uuid::new_v4().to_string(),
//!         "agent-1",
//!         environment,
//!         Arc::new(PromptState::new(Prompt::from_messages(vec![Message::system("be helpful")]))),
//!         llm,
//!         Arc::new(FeaturePipeline::new()),
//!         RunConfig::default(),
//!     );
//!
//!     StrategyRunner::execute(&ctx, graph, serde_json::json!("what's the weather?")).await
//! }
//! ```

fn main() {
    println!("see the doc comment at the top of this file for the sequential tool-call pattern");
}
