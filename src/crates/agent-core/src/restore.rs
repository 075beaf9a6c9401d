//! Checkpoint restoration (`§4.6 Checkpoint/Persistence: Restoration algorithm`).
//!
//! Runs once at the start of every top-level strategy execution attempt,
//! before the graph executor takes its first step. A pending
//! [`agent_checkpoint::AgentContextData`] names where to resume; this module
//! turns that into either nothing (no pending rollback, or a
//! `MessageHistoryOnly` rollback that only rewrites the prompt) or a
//! concrete [`ExecutionPoint`] the executor should jump to instead of the
//! subgraph's normal `start` node.

use agent_checkpoint::RollbackStrategy;
use serde_json::Value;

use crate::error::{GraphError, Result};
use crate::run_context::RunContext;
use crate::strategy_graph::{Graph, QualifiedPath};

pub use crate::strategy_graph::ExecutionPoint;

/// Every qualified-path prefix of `path` strictly between the top-level
/// subgraph segment and the leaf itself — the intermediate containers the
/// restoration walk must validate (`§4.6` step 3c).
fn intermediate_container_paths(path: &str) -> Vec<QualifiedPath> {
    let segments: Vec<&str> = path.split(':').collect();
    (2..segments.len())
        .map(|len| segments[..len].join(":"))
        .collect()
}

/// Consumes the context's pending rollback (if any) and restores the prompt
/// and, for `RollbackStrategy::Default`, the execution point (`§4.6`).
///
/// Returns `Ok(None)` when there was nothing to restore, or when the
/// restored strategy was `MessageHistoryOnly` (prompt rewritten, position
/// unaffected — the executor should still start from its normal `start`
/// node). Returns `Ok(Some(point))` when the executor must resume at
/// `point.node` with `point.input` instead.
pub async fn restore(ctx: &RunContext, graph: &Graph) -> Result<Option<ExecutionPoint>> {
    let pending = ctx.pending_rollback.lock().await.take();
    let Some(pending) = pending else {
        return Ok(None);
    };
    let data = pending.data;

    if data.rollback_strategy == RollbackStrategy::MessageHistoryOnly {
        let mut session = ctx.prompt.write().await;
        session.with_messages(data.message_history);
        session.commit(None).await?;
        return Ok(None);
    }

    for action in &pending.additional_rollback_actions {
        action();
    }

    ctx.set_restored_already_rolled_back(data.already_rolled_back);

    let leaf_path = graph.resolve(&data.node_id)?;

    // The leaf's declared input type is only reified by name in the spec's
    // source; this engine decodes `lastInput` as the opaque `Value` it was
    // serialized as rather than tracking a per-node input-type token
    // (`§9 DESIGN NOTES: Reflection / dynamic dispatch` — recorded as a
    // decided simplification in the project's grounding ledger).
    let input = data.last_input.unwrap_or(Value::Null);

    // `enforceExecutionPoint` walks from the outermost intermediate
    // container to the leaf, each call asserting its container is
    // execution-point-bearing and directing it at the next path in the
    // chain (`§4.6` step 3c).
    let mut chain = intermediate_container_paths(&leaf_path);
    chain.push(leaf_path.clone());
    let mut point = ExecutionPoint {
        node: leaf_path.clone(),
        input: input.clone(),
    };
    for pair in chain.windows(2) {
        point = graph.enforce_execution_point(&pair[0], pair[1].clone(), point.input)?;
    }

    let mut session = ctx.prompt.write().await;
    session.with_messages(data.message_history);
    session.commit(None).await?;

    Ok(Some(point))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::environment::RecordingEnvironment;
    use crate::feature::FeaturePipeline;
    use crate::prompt::PromptState;
    use crate::run_context::PendingRollback;
    use crate::strategy_graph::{Edge, NodeKind, ParallelReducer, Subgraph};
    use crate::tool_registry::{DispatchMode, ToolRegistry};
    use agent_checkpoint::AgentContextData;
    use llm::testing::ScriptedExecutor;
    use llm::{ChatResponse, Message, Prompt};
    use std::sync::Arc;

    fn context() -> RunContext {
        RunContext::new(
            "run-1",
            "agent-1",
            Arc::new(RecordingEnvironment::new(ToolRegistry::new(), DispatchMode::Single)),
            Arc::new(PromptState::new(Prompt::from_messages(vec![Message::system("be helpful")]))),
            Arc::new(ScriptedExecutor::new(vec![ChatResponse::single(Message::assistant("hi"))])),
            Arc::new(FeaturePipeline::new()),
            RunConfig::default(),
        )
    }

    fn graph_with_nested_container() -> Graph {
        let inner = Subgraph::new("strat:inner", "strat:inner:a", "strat:inner:finish")
            .with_node("strat:inner:a", NodeKind::Transform(Arc::new(|v| Ok(v))));
        let outer = Subgraph::new("strat", "strat:start", "strat:finish")
            .with_node("strat:start", NodeKind::Transform(Arc::new(|v| Ok(v))))
            .with_node(
                "strat:container",
                NodeKind::Parallel {
                    children: vec!["strat:inner:a".to_string()],
                    reducer: ParallelReducer::SelectBy(Arc::new(|_| true)),
                },
            )
            .with_edge(Edge::always("strat:start", "strat:container"))
            .with_edge(Edge::always("strat:container", "strat:finish"));
        Graph::build("strat", vec![outer, inner]).unwrap()
    }

    #[tokio::test]
    async fn no_pending_rollback_is_a_no_op() {
        let ctx = context();
        let graph = graph_with_nested_container();
        assert!(restore(&ctx, &graph).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn message_history_only_rewrites_prompt_without_an_execution_point() {
        let ctx = context();
        let graph = graph_with_nested_container();
        let data = AgentContextData {
            node_id: "start".into(),
            last_input: None,
            message_history: vec![Message::system("restored")],
            rollback_strategy: RollbackStrategy::MessageHistoryOnly,
            already_rolled_back: false,
        };
        ctx.schedule_rollback(PendingRollback::new(data)).await;
        let result = restore(&ctx, &graph).await.unwrap();
        assert!(result.is_none());
        let read = ctx.prompt.read().await;
        assert_eq!(read.messages()[0].content.as_text(), "restored");
    }

    #[tokio::test]
    async fn default_rollback_resolves_leaf_and_restores_input() {
        let ctx = context();
        let graph = graph_with_nested_container();
        let data = AgentContextData {
            node_id: "start".into(),
            last_input: Some(serde_json::json!({"x": 1})),
            message_history: vec![Message::system("resumed")],
            rollback_strategy: RollbackStrategy::Default,
            already_rolled_back: false,
        };
        ctx.schedule_rollback(PendingRollback::new(data)).await;
        let point = restore(&ctx, &graph).await.unwrap().unwrap();
        assert_eq!(point.node, "strat:start");
        assert_eq!(point.input, serde_json::json!({"x": 1}));
    }

    #[tokio::test]
    async fn default_rollback_into_non_container_intermediate_fails() {
        let ctx = context();
        let graph = graph_with_nested_container();
        let data = AgentContextData {
            node_id: "a".into(),
            last_input: None,
            message_history: vec![],
            rollback_strategy: RollbackStrategy::Default,
            already_rolled_back: false,
        };
        ctx.schedule_rollback(PendingRollback::new(data)).await;
        let err = restore(&ctx, &graph).await.unwrap_err();
        assert!(matches!(err, GraphError::NotAContainer(_)));
    }
}
