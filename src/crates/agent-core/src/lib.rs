//! # agent-core — Agent Graph Execution Engine and Feature Pipeline
//!
//! The core of this workspace: interprets a compiled strategy graph against
//! a running agent, dispatching lifecycle events to installed features
//! along the way.
//!
//! ## Overview
//!
//! A **strategy** is a directed graph of qualified-path nodes (`strategy`,
//! `strategy:subgraph`, `strategy:subgraph:node`, ...) built once via
//! [`strategy_graph::Graph::build`] and then interpreted repeatedly by
//! [`executor::GraphExecutor`]. Node behavior is a tagged enum
//! ([`strategy_graph::NodeKind`]) rather than a trait-object hierarchy: LLM
//! calls, tool execution, history compression, parallel fan-out, and nested
//! subgraphs are all variants the executor matches on, not virtual methods
//! the node implements.
//!
//! [`runner::StrategyRunner`] is the entry point callers actually drive: it
//! brackets one `GraphExecutor` run with the agent's lifecycle events
//! (`agentStarting`/`agentCompleted`/`agentExecutionFailed`/`agentClosing`)
//! and loops the restore/execute cycle for as long as a run schedules a
//! rollback against itself.
//!
//! ## Module organization
//!
//! - [`strategy_graph`] — the graph model: `Graph`, `Subgraph`, `Edge`,
//!   `NodeKind`, `ParallelReducer`, qualified paths (C4).
//! - [`executor`] — `GraphExecutor`, interpreting one subgraph at a time (C5).
//! - [`runner`] — `StrategyRunner`, the top-level `execute(input)` entry
//!   point and its agent/strategy lifecycle events (C8).
//! - [`run_context`] — `RunContext`, the per-run bundle every node touches,
//!   and its parallel-child forking/adoption.
//! - [`prompt`] — `PromptState`, the RAII read/write-session prompt holder (C2).
//! - [`storage`] — `StateManager`/`StorageKey<T>`, typed scratch storage (C1).
//! - [`tool_registry`] — `ToolRegistry`, schema-validated tool dispatch (C3).
//! - [`environment`] — the `Environment` trait agent runs are embedded in,
//!   plus `RecordingEnvironment` for tests.
//! - [`feature`] — `FeaturePipeline`, the event bus features install into (C7).
//! - [`choice`] — multi-response generation and choice selection (C9).
//! - [`compression`] — `CompressionPolicy`, pure history-trimming strategies (C10).
//! - [`config`] — `RunConfig`/`RunMode`, with an environment-variable overlay.
//! - [`restore`] — checkpoint restoration, run once per top-level attempt (C6).
//! - [`error`] — `GraphError`, the one error enum this crate surfaces.
//! - [`retry`] — exponential-backoff retry tracking shared with the
//!   tool-choice recovery loop.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use agent_core::{Graph, GraphExecutor, NodeKind, RunConfig, RunContext, StrategyRunner, Subgraph};
//! use std::sync::Arc;
//!
//! let strategy = Subgraph::new("chat", "chat:start", "chat:finish")
//!     .with_node("chat:start", NodeKind::LlmRequest { forbid_tool_calls: false });
//! let graph = Arc::new(Graph::build("chat", vec![strategy])?);
//!
//! let output = StrategyRunner::execute(&ctx, graph, serde_json::json!("hello")).await?;
//! # Ok::<(), agent_core::GraphError>(())
//! ```

pub mod choice;
pub mod compression;
pub mod config;
pub mod environment;
pub mod error;
pub mod executor;
pub mod feature;
pub mod prompt;
pub mod restore;
pub mod retry;
pub mod run_context;
pub mod runner;
pub mod storage;
pub mod strategy_graph;
pub mod tool_registry;

pub use choice::{ChoiceSelectionStrategy, FirstChoice, InteractiveChoiceSelection, PromptExecutorWithChoiceSelection};
pub use compression::CompressionPolicy;
pub use config::{RunConfig, RunMode};
pub use environment::{Environment, RecordingEnvironment};
pub use error::{GraphError, Result};
pub use executor::GraphExecutor;
pub use feature::{
    Event, EventKind, Feature, FeatureConfig, FeatureKey, FeaturePipeline, MessageProcessor,
};
pub use prompt::{PromptState, ReadSession, TokenUsage, WriteSession};
pub use restore::{restore, ExecutionPoint};
pub use retry::{RetryPolicy, RetryState};
pub use run_context::{PendingRollback, RunContext};
pub use runner::StrategyRunner;
pub use storage::{StateManager, StorageKey};
pub use strategy_graph::{Edge, Graph, NodeKind, ParallelReducer, QualifiedPath, Subgraph};
pub use tool_registry::{DispatchMode, ToolCall, ToolCallOutcome, ToolDescriptor, ToolFailureKind, ToolRegistry};
