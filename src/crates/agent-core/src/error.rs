//! Error types for the agent graph execution engine.
//!
//! This module defines every error the engine can surface, from graph
//! construction through a running strategy. All variants implement
//! `std::error::Error` via `thiserror`.
//!
//! # Error Hierarchy
//!
//! ```text
//! GraphError
//! ├── BuildError              - invalid graph, caught at construction
//! ├── NoRouteError            - no outgoing edge matched
//! ├── IterationLimitExceeded  - maxAgentIterations surpassed
//! ├── ToolValidationError     - tool argument decode failed
//! ├── ToolCallFailed          - tool invocation threw
//! ├── ToolChoiceUnsupported   - model can't enforce tool calls after N retries
//! ├── LLMCallFailed           - upstream executor failed
//! ├── KeyNotFound             - typed storage getValue missed
//! ├── NodeNotFound            - checkpoint restoration couldn't resolve a path
//! ├── NotAContainer           - restoration walked into a non-container node
//! ├── CancellationError       - cooperative cancellation, always propagates
//! ├── FeatureHandlerError     - a feature's event handler failed
//! ├── Checkpoint              - persistence-layer failure (agent-checkpoint)
//! ├── Serialization           - JSON (de)serialization failure
//! ├── Io                      - filesystem/network I/O failure
//! └── Custom                  - application-defined
//! ```
//!
//! # Recovery
//!
//! Most variants are fatal to the run: they propagate out of the top-level
//! `execute` call. A few are recovered locally by the engine itself before
//! they ever reach a caller:
//!
//! - `ToolValidationError` is turned into an explanatory tool-result message
//!   fed back to the model, unless the call was marked required.
//! - `ToolCallFailed` is, by default, fed back to the model as the tool's
//!   result text rather than aborting the run.
//! - `FeatureHandlerError` is logged and reported through the pipeline but
//!   never aborts dispatch of the remaining handlers.
//!
//! `CancellationError` is the one variant that is never swallowed anywhere —
//! every combinator in this crate that might recover from an error re-checks
//! for cancellation first and re-propagates it unconditionally.
//!
//! ```rust
//! use agent_core::error::GraphError;
//!
//! fn describe(err: &GraphError) -> &'static str {
//!     match err {
//!         GraphError::NoRouteError { .. } => "no matching edge",
//!         GraphError::IterationLimitExceeded { .. } => "ran too long",
//!         GraphError::CancellationError => "cancelled",
//!         _ => "other",
//!     }
//! }
//! ```

use std::fmt;

/// Convenience alias used throughout the engine crate.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Every error the graph execution engine can produce.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    /// The graph is structurally invalid: duplicate node ids, dangling
    /// edges, a qualified path that resolves ambiguously by last segment,
    /// or a retry-subgraph built with zero max attempts. Always caught at
    /// construction time, never during a run.
    #[error("graph build failed: {0}")]
    BuildError(String),

    /// A branch point had no outgoing edge whose guard matched. The engine
    /// evaluates guards in declaration order and requires exactly one match;
    /// zero matches is this error, more than one is resolved by taking the
    /// first and is not an error.
    #[error("no outgoing edge matched at node '{node}'")]
    NoRouteError {
        /// Qualified path of the node the run was at when routing failed.
        node: String,
    },

    /// Total node invocations for the run exceeded `RunConfig::max_agent_iterations`.
    #[error("iteration limit of {limit} exceeded after {invocations} node invocations")]
    IterationLimitExceeded {
        /// The configured cap.
        limit: u32,
        /// How many invocations the run had actually performed.
        invocations: u32,
    },

    /// Decoding a tool call's arguments against its `argSchema` failed.
    /// Surfaced through the pipeline's `onToolValidationFailed` event; the
    /// engine then synthesizes a textual tool result so the model can
    /// recover, unless the call was required.
    #[error("tool '{tool}' argument validation failed: {reason}")]
    ToolValidationError {
        /// Name of the tool whose arguments failed to decode.
        tool: String,
        /// Human-readable decode failure.
        reason: String,
    },

    /// A tool's `invoke` returned or threw an error. Reported through the
    /// pipeline; by default the engine feeds the error text back to the
    /// model as the tool result rather than failing the run.
    #[error("tool '{tool}' invocation failed: {source}")]
    ToolCallFailed {
        /// Name of the tool that failed.
        tool: String,
        /// The underlying failure, preserved for `source()`.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The active LLM binding does not support `toolChoice = required`, and
    /// the synthetic "call tools instead" retry loop was exhausted.
    #[error(
        "model '{model}' does not support required tool choice; gave up after {attempts} attempts"
    )]
    ToolChoiceUnsupported {
        /// Model identifier, for diagnostics.
        model: String,
        /// Number of retries attempted before giving up.
        attempts: u32,
    },

    /// The upstream `LlmExecutor` returned an error, or a streaming call
    /// surfaced a mid-stream failure. Per-call timeouts are the caller's
    /// responsibility and arrive here too, wrapped as an `LlmError`.
    #[error("LLM call failed: {0}")]
    LLMCallFailed(#[from] llm::LlmError),

    /// `StateManager::get_value` (the typed, failing variant of `get`)
    /// found no entry for the requested key.
    #[error("key not found in storage: {0}")]
    KeyNotFound(String),

    /// Checkpoint restoration resolved `AgentContextData::node_id` to a
    /// qualified path and found no node whose last segment matched.
    #[error("node not found during checkpoint restoration: {0}")]
    NodeNotFound(String),

    /// Checkpoint restoration walked an intermediate segment of a qualified
    /// path and found a node that does not carry an execution point (i.e.
    /// is not a subgraph/parallel/container node).
    #[error("node '{0}' is not a container and cannot be walked into during restoration")]
    NotAContainer(String),

    /// The run's `CancellationToken` was cancelled. This variant is never
    /// recovered locally anywhere in the engine — every fallible combinator
    /// checks for it first and re-raises unconditionally.
    #[error("run was cancelled")]
    CancellationError,

    /// A feature's event handler returned an error while the pipeline was
    /// dispatching an event. Logged and reported via `Environment::report_problem`;
    /// dispatch continues to the remaining handlers for that event.
    #[error("feature handler '{feature}' failed handling '{event}': {reason}")]
    FeatureHandlerError {
        /// Name the feature was installed under.
        feature: String,
        /// Name of the lifecycle event being dispatched.
        event: String,
        /// Human-readable failure detail.
        reason: String,
    },

    /// A checkpoint persistence operation failed. Wrapped via `#[from]` so
    /// every checkpoint-saver call site can just use `?`.
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] agent_checkpoint::CheckpointError),

    /// JSON encoding or decoding failed outside the tool-argument path
    /// (e.g. serializing a checkpoint payload, decoding a `StorageKey<T>` value).
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A filesystem or network I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An application-defined failure that doesn't fit the taxonomy above.
    #[error("{0}")]
    Custom(String),

    /// Internal control-flow signal raised by a top-level `Rollback` node
    /// (`§4.6`: "signals re-run"). Never reaches a caller: `GraphExecutor`
    /// intercepts it at the subgraph loop and turns it into `Ok(None)`, the
    /// "explicit null, re-run pending" outcome `StrategyRunner` loops on.
    #[error("rollback scheduled; re-run pending")]
    RollbackScheduled,
}

impl GraphError {
    /// Shorthand for [`GraphError::BuildError`].
    pub fn build(msg: impl fmt::Display) -> Self {
        GraphError::BuildError(msg.to_string())
    }

    /// Shorthand for [`GraphError::Custom`].
    pub fn custom(msg: impl fmt::Display) -> Self {
        GraphError::Custom(msg.to_string())
    }

    /// Shorthand for [`GraphError::ToolCallFailed`].
    pub fn tool_call_failed(
        tool: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        GraphError::ToolCallFailed {
            tool: tool.into(),
            source: Box::new(source),
        }
    }

    /// True for the handful of variants the engine recovers from locally
    /// rather than aborting the run. `CancellationError` is deliberately
    /// excluded — see the module docs.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GraphError::FeatureHandlerError { .. }
                | GraphError::ToolValidationError { .. }
                | GraphError::ToolCallFailed { .. }
        )
    }

    /// True only for cancellation. Combinators that would otherwise catch
    /// and recover from an error should check this first.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, GraphError::CancellationError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_never_recoverable() {
        assert!(!GraphError::CancellationError.is_recoverable());
        assert!(GraphError::CancellationError.is_cancellation());
    }

    #[test]
    fn feature_handler_errors_are_recoverable() {
        let err = GraphError::FeatureHandlerError {
            feature: "debugger".into(),
            event: "onLlmCallStarting".into(),
            reason: "boom".into(),
        };
        assert!(err.is_recoverable());
        assert!(!err.is_cancellation());
    }

    #[test]
    fn iteration_limit_message_reports_both_numbers() {
        let err = GraphError::IterationLimitExceeded {
            limit: 50,
            invocations: 51,
        };
        let msg = err.to_string();
        assert!(msg.contains("50"));
        assert!(msg.contains("51"));
    }

    #[test]
    fn checkpoint_error_converts_via_from() {
        let ckpt = agent_checkpoint::CheckpointError::NotFound("agent-1".into());
        let err: GraphError = ckpt.into();
        assert!(matches!(err, GraphError::Checkpoint(_)));
    }

    #[test]
    fn build_and_custom_constructors_format_message() {
        let err = GraphError::build("duplicate node id 'start'");
        assert_eq!(err.to_string(), "graph build failed: duplicate node id 'start'");
        let err = GraphError::custom("unreachable state");
        assert_eq!(err.to_string(), "unreachable state");
    }
}
