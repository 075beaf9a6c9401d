//! Strategy Runner (C8) — `§4.8`.
//!
//! The top-level entry point a caller actually invokes: `execute(input)`
//! wraps one [`crate::executor::GraphExecutor`] run with the agent and
//! strategy lifecycle events (`§4.7`), and loops the restore/execute cycle
//! for as long as a run schedules a rollback against itself (`§4.6`, S3:
//! "start -> A -> Save -> B -> Rollback -> finish").
//!
//! `GraphExecutor::execute` returns `Ok(None)` exactly when a
//! [`crate::strategy_graph::NodeKind::Rollback`] node scheduled a pending
//! rollback (`GraphError::RollbackScheduled`, intercepted at the subgraph
//! loop). `StrategyRunner` is what actually loops on that signal; the
//! executor itself only runs a single attempt.

use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::executor::GraphExecutor;
use crate::feature::{
    AgentClosingContext, AgentCompletedContext, AgentExecutionFailedContext, AgentStartingContext, Event,
    StrategyCompletedContext, StrategyStartingContext,
};
use crate::run_context::RunContext;
use crate::strategy_graph::Graph;

/// Drives a compiled [`Graph`] against a [`RunContext`] from the outside:
/// agent lifecycle events around the whole run, strategy lifecycle events
/// around the restore/execute loop, and the loop itself.
pub struct StrategyRunner;

impl StrategyRunner {
    /// Runs `graph` to completion against `ctx`, returning the strategy's
    /// final output.
    ///
    /// Emits `agentStarting` before anything else and `agentClosing` after
    /// everything else, regardless of outcome. `strategyStarting` /
    /// `strategyCompleted` bracket the restore/execute loop once per call —
    /// an internal rollback-and-rerun is not itself a new strategy
    /// invocation, just another iteration of this loop.
    pub async fn execute(ctx: &RunContext, graph: Arc<Graph>, input: Value) -> Result<Value> {
        ctx.pipeline
            .dispatch(
                Event::AgentStarting(AgentStartingContext {
                    run_id: ctx.run_id.clone(),
                    agent_id: ctx.agent_id.clone(),
                }),
                ctx.environment.as_ref(),
            )
            .await;

        let result = Self::run_strategy(ctx, graph, input).await;

        match &result {
            Ok(output) => {
                ctx.pipeline
                    .dispatch(
                        Event::AgentCompleted(AgentCompletedContext {
                            run_id: ctx.run_id.clone(),
                            agent_id: ctx.agent_id.clone(),
                            result: Some(output.clone()),
                        }),
                        ctx.environment.as_ref(),
                    )
                    .await;
            }
            Err(err) => {
                let message = err.to_string();
                ctx.environment.report_problem(&message).await;
                ctx.pipeline
                    .dispatch(
                        Event::AgentExecutionFailed(AgentExecutionFailedContext {
                            run_id: ctx.run_id.clone(),
                            agent_id: ctx.agent_id.clone(),
                            error: message,
                        }),
                        ctx.environment.as_ref(),
                    )
                    .await;
            }
        }

        ctx.pipeline
            .dispatch(
                Event::AgentClosing(AgentClosingContext {
                    run_id: ctx.run_id.clone(),
                    agent_id: ctx.agent_id.clone(),
                }),
                ctx.environment.as_ref(),
            )
            .await;

        result
    }

    async fn run_strategy(ctx: &RunContext, graph: Arc<Graph>, input: Value) -> Result<Value> {
        ctx.pipeline
            .dispatch(
                Event::StrategyStarting(StrategyStartingContext {
                    run_id: ctx.run_id.clone(),
                    strategy_name: graph.strategy_name.clone(),
                    input: input.clone(),
                }),
                ctx.environment.as_ref(),
            )
            .await;

        let output = loop {
            let attempt = GraphExecutor::execute(ctx, graph.clone(), input.clone()).await?;
            match attempt {
                Some(value) => break value,
                None if ctx.has_pending_rollback().await => continue,
                None => {
                    // Restoration consumed the pending rollback inside this
                    // attempt without leaving a fresh one queued, yet the
                    // attempt still produced no output — nothing left to
                    // retry against.
                    break Value::Null;
                }
            }
        };

        ctx.pipeline
            .dispatch(
                Event::StrategyCompleted(StrategyCompletedContext {
                    run_id: ctx.run_id.clone(),
                    strategy_name: graph.strategy_name.clone(),
                    output: Some(output.clone()),
                }),
                ctx.environment.as_ref(),
            )
            .await;

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::environment::RecordingEnvironment;
    use crate::feature::FeaturePipeline;
    use crate::prompt::PromptState;
    use crate::strategy_graph::{Edge, NodeKind, Subgraph};
    use crate::tool_registry::{DispatchMode, ToolRegistry};
    use llm::testing::ScriptedExecutor;
    use llm::{ChatResponse, Message, Prompt};
    use std::sync::atomic::{AtomicU32, Ordering};

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

    fn context_with_checkpoint_saver() -> RunContext {
        context().with_checkpoint_saver(Arc::new(agent_checkpoint::InMemoryCheckpointSaver::new()))
    }

    fn straight_through_graph() -> Arc<Graph> {
        let subgraph = Subgraph::new("strat", "strat:start", "strat:finish")
            .with_node("strat:start", NodeKind::Transform(Arc::new(|v| Ok(v))))
            .with_edge(Edge::always("strat:start", "strat:finish"));
        Arc::new(Graph::build("strat", vec![subgraph]).unwrap())
    }

    #[tokio::test]
    async fn straight_run_returns_transformed_output() {
        let ctx = context();
        let graph = straight_through_graph();
        let output = StrategyRunner::execute(&ctx, graph, serde_json::json!("input")).await.unwrap();
        assert_eq!(output, serde_json::json!("input"));
    }

    #[tokio::test]
    async fn rollback_loop_reruns_until_already_rolled_back_flag_is_observed() {
        let ctx = context_with_checkpoint_saver();
        let reach_count = Arc::new(AtomicU32::new(0));
        let counted = reach_count.clone();
        let subgraph = Subgraph::new("strat", "strat:start", "strat:finish")
            .with_node("strat:start", NodeKind::CheckpointAnchor)
            .with_node(
                "strat:rollback",
                NodeKind::Transform(Arc::new(move |v| {
                    counted.fetch_add(1, Ordering::SeqCst);
                    Ok(v)
                })),
            )
            .with_node("strat:gate", NodeKind::Rollback)
            .with_edge(Edge::always("strat:start", "strat:rollback"))
            .with_edge(Edge::always("strat:rollback", "strat:gate"))
            .with_edge(Edge::always("strat:gate", "strat:finish"));
        let graph = Arc::new(Graph::build("strat", vec![subgraph]).unwrap());

        let output = StrategyRunner::execute(&ctx, graph, serde_json::json!("go")).await.unwrap();

        assert_eq!(reach_count.load(Ordering::SeqCst), 2);
        assert_eq!(output, serde_json::json!("already rolled back: \"go\""));
    }
}
