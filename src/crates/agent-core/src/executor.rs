//! Graph Executor (C5) — `§4.5`.
//!
//! `execute(context, input) -> output?` drives one subgraph: restore any
//! pending execution point, then loop invoking the current node, selecting
//! an outgoing edge, and advancing until `finish` is reached or the
//! iteration cap trips.

use std::sync::Arc;

use llm::{ChatRequest, Message, ToolDefinition};
use serde::Deserialize;
use serde_json::Value;

use crate::compression::CompressionPolicy;
use crate::error::{GraphError, Result};
use crate::feature::{
    Event, LlmCallCompletedContext, LlmCallStartingContext, ToolCallCompletedContext,
    ToolCallFailedContext, ToolCallStartingContext, ToolValidationFailedContext,
};
use crate::restore;
use crate::run_context::RunContext;
use crate::strategy_graph::{Graph, NodeKind, ParallelReducer, QualifiedPath};
use crate::tool_registry::{ToolCall, ToolCallOutcome, ToolFailureKind};

const TOOL_CHOICE_RETRY_MESSAGE: &str = "# DO NOT CHAT WITH ME DIRECTLY! CALL TOOLS, INSTEAD.";

/// Wire shape for one tool call as it travels through a node's `Value`
/// payload between `ToolExecute` and `ToolResultSend`.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
struct EncodedToolCall {
    id: String,
    name: String,
    arguments: Value,
}

impl From<EncodedToolCall> for ToolCall {
    fn from(e: EncodedToolCall) -> Self {
        ToolCall {
            id: e.id,
            name: e.name,
            arguments: e.arguments,
        }
    }
}

/// Wire shape for one tool outcome, threaded between `ToolExecute` and
/// `ToolResultSend` the same way.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
struct EncodedToolOutcome {
    id: String,
    name: String,
    ok: bool,
    value: Option<Value>,
    error: Option<String>,
}

/// Interprets a compiled [`Graph`] against a [`RunContext`] (`§4.5`).
pub struct GraphExecutor;

impl GraphExecutor {
    /// Runs the strategy's top-level subgraph to completion.
    ///
    /// Restoration (`§4.6`) runs first; if it produces an
    /// [`restore::ExecutionPoint`], execution resumes there instead of at the
    /// subgraph's `start` node.
    pub async fn execute(ctx: &RunContext, graph: Arc<Graph>, input: Value) -> Result<Option<Value>> {
        let strategy_name = graph.strategy_name.clone();
        Self::execute_subgraph(ctx, &graph, &strategy_name, input, true).await
    }

    async fn execute_subgraph(
        ctx: &RunContext,
        graph: &Arc<Graph>,
        subgraph_name: &str,
        input: Value,
        allow_restore: bool,
    ) -> Result<Option<Value>> {
        let subgraph = graph.subgraph(subgraph_name)?;

        let (mut current_node, mut current_value) = if allow_restore {
            match restore::restore(ctx, graph).await? {
                Some(point) => (point.node, point.input),
                None => (subgraph.start.clone(), input),
            }
        } else {
            (subgraph.start.clone(), input)
        };

        loop {
            if current_node == subgraph.finish {
                return Ok(Some(current_value));
            }

            let invocations = ctx.record_invocation();
            if invocations > ctx.config.max_agent_iterations {
                return Err(GraphError::IterationLimitExceeded {
                    limit: ctx.config.max_agent_iterations,
                    invocations,
                });
            }

            let node = graph
                .find_node(&current_node)
                .ok_or_else(|| GraphError::NodeNotFound(current_node.clone()))?;

            if ctx.config.enable_automatic_persistence && !matches!(node, NodeKind::Transform(_)) {
                Self::persist_checkpoint(ctx, &current_node, &current_value).await?;
            }

            let output = match Self::invoke_node(ctx, graph, &current_node, node, current_value).await {
                Ok(value) => value,
                Err(GraphError::RollbackScheduled) => return Ok(None),
                Err(err) => return Err(err),
            };

            let owning = graph.subgraph_owning(&current_node).unwrap_or(subgraph);
            let edges = owning.outgoing(&current_node);
            let messages = ctx.prompt.read().await.messages().to_vec();
            let edge = edges
                .into_iter()
                .find(|e| (e.guard)(&output, &messages))
                .ok_or_else(|| GraphError::NoRouteError {
                    node: current_node.clone(),
                })?;

            current_value = (edge.transform)(output);
            current_node = edge.to.clone();
        }
    }

    async fn invoke_node(
        ctx: &RunContext,
        graph: &Arc<Graph>,
        node_id: &QualifiedPath,
        node: &NodeKind,
        input: Value,
    ) -> Result<Value> {
        match node {
            NodeKind::Transform(f) => f(input),

            NodeKind::LlmRequest { forbid_tool_calls } => {
                Self::perform_llm_call(ctx, node_id, *forbid_tool_calls).await
            }

            NodeKind::ToolExecute => Self::execute_tools(ctx, input).await,

            NodeKind::ToolResultSend => {
                Self::send_tool_results(ctx, input).await?;
                Self::perform_llm_call(ctx, node_id, false).await
            }

            NodeKind::HistoryCompress(policy) => Self::compress_history(ctx, policy, input).await,

            NodeKind::Parallel { children, reducer } => {
                Self::run_parallel(ctx, graph, children, reducer, input).await
            }

            NodeKind::Subgraph(name) => Self::execute_subgraph(ctx, graph, name, input, false)
                .await?
                .ok_or_else(|| GraphError::custom(format!("subgraph '{name}' produced no output"))),

            NodeKind::CheckpointAnchor => {
                Self::persist_checkpoint(ctx, node_id, &input).await?;
                Ok(input)
            }

            NodeKind::Rollback => Self::perform_rollback(ctx, input).await,
        }
    }

    /// `rollbackToLatestCheckpoint`-style resumption at the agent's most
    /// recently saved checkpoint (`§4.6`, S3). A run that was itself resumed
    /// from this exact rollback passes `input` straight through instead of
    /// scheduling a second time.
    async fn perform_rollback(ctx: &RunContext, input: Value) -> Result<Value> {
        if ctx.take_restored_already_rolled_back() {
            return Ok(Value::String(format!("already rolled back: {input}")));
        }

        let saver = ctx
            .checkpoint_saver
            .as_ref()
            .ok_or_else(|| GraphError::custom("rollback requested with no checkpoint saver configured"))?;
        let checkpoint = saver
            .get_latest_checkpoint(&ctx.agent_id)
            .await?
            .ok_or_else(|| GraphError::custom("rollback requested with no checkpoint saved for this agent"))?;

        let mut data = agent_checkpoint::AgentContextData::from_checkpoint(&checkpoint);
        data.already_rolled_back = true;
        ctx.schedule_rollback(crate::run_context::PendingRollback::new(data)).await;

        Err(GraphError::RollbackScheduled)
    }

    /// Persists a checkpoint at this node's entry, either because
    /// `enable_automatic_persistence` is set (`§6 RunConfig`, resolved Open
    /// Question: checkpointing happens on node entry, with the
    /// pre-execution input) or because the node itself is a
    /// [`NodeKind::CheckpointAnchor`]. A no-op when the run carries no
    /// [`agent_checkpoint::CheckpointSaver`].
    async fn persist_checkpoint(ctx: &RunContext, node_id: &QualifiedPath, input: &Value) -> Result<()> {
        let Some(saver) = ctx.checkpoint_saver.as_ref() else {
            return Ok(());
        };
        let version = saver
            .get_latest_checkpoint(&ctx.agent_id)
            .await?
            .map(|c| c.version + 1)
            .unwrap_or(1);
        let message_history = ctx.prompt.read().await.messages().to_vec();
        let checkpoint = agent_checkpoint::Checkpoint::new(
            uuid::Uuid::new_v4().to_string(),
            ctx.agent_id.clone(),
            node_id.rsplit(':').next().unwrap_or(node_id).to_string(),
            Some(input.clone()),
            None,
            message_history,
            version,
            chrono::Utc::now().timestamp_millis(),
        );
        saver.save_checkpoint(checkpoint).await?;
        Ok(())
    }

    /// Issues one LLM request, retrying with the synthetic "call tools
    /// instead" nudge when `tool_choice = Required` isn't honored
    /// (`§4.3 Tool-choice support`).
    async fn perform_llm_call(ctx: &RunContext, node_id: &QualifiedPath, forbid_tool_calls: bool) -> Result<Value> {
        let mut retry_state = crate::retry::RetryState::new();
        loop {
            let tools: Vec<ToolDefinition> = if forbid_tool_calls {
                Vec::new()
            } else {
                ctx.environment
                    .tool_descriptors()
                    .iter()
                    .map(|d| ToolDefinition::new(d.name.clone(), d.description.clone(), d.arg_schema.clone()))
                    .collect()
            };

            let prompt = ctx.prompt.read().await.prompt().clone();
            let prompt_messages = prompt.messages().len();
            ctx.pipeline
                .dispatch(
                    Event::LlmCallStarting(LlmCallStartingContext {
                        run_id: ctx.run_id.clone(),
                        node_id: node_id.clone(),
                        prompt_messages,
                    }),
                    ctx.environment.as_ref(),
                )
                .await;

            let request = ChatRequest::new(prompt)
                .with_temperature(ctx.config.temperature)
                .with_tool_choice(if forbid_tool_calls {
                    llm::ToolChoice::None
                } else {
                    ctx.config.tool_choice.clone()
                })
                .with_tools(tools);
            let response = ctx.llm.execute(request).await?;

            ctx.pipeline
                .dispatch(
                    Event::LlmCallCompleted(LlmCallCompletedContext {
                        run_id: ctx.run_id.clone(),
                        node_id: node_id.clone(),
                        messages: response.messages.clone(),
                    }),
                    ctx.environment.as_ref(),
                )
                .await;

            let has_tool_call = response
                .messages
                .iter()
                .any(|m| m.tool_calls.as_ref().map(|c| !c.is_empty()).unwrap_or(false));

            let requires_tool_choice = ctx.config.tool_choice == llm::ToolChoice::Required;
            if requires_tool_choice && !has_tool_call {
                retry_state.record_attempt(Some("model did not call a tool".to_string()));
                if !retry_state.should_retry_within(ctx.config.max_attempts_without_tool_choice) {
                    return Err(GraphError::ToolChoiceUnsupported {
                        model: ctx.prompt.model().await.unwrap_or_else(|| "unknown".to_string()),
                        attempts: retry_state.attempts as u32 - 1,
                    });
                }
                let mut session = ctx.prompt.write().await;
                for message in &response.messages {
                    session.append_prompt(message.clone());
                }
                session.append_prompt(Message::user(TOOL_CHOICE_RETRY_MESSAGE));
                match response.usage {
                    Some(usage) => session.commit(Some((&usage).into())).await?,
                    None => session.commit(None).await?,
                }
                continue;
            }

            let mut session = ctx.prompt.write().await;
            for message in &response.messages {
                session.append_prompt(message.clone());
            }
            match response.usage {
                Some(usage) => session.commit(Some((&usage).into())).await?,
                None => session.commit(None).await?,
            }

            return Ok(Self::encode_llm_output(&response.messages));
        }
    }

    /// Tool calls, if any, encoded as a `Value` array of `EncodedToolCall`;
    /// otherwise the concatenated text of the response.
    fn encode_llm_output(messages: &[Message]) -> Value {
        let tool_calls: Vec<Value> = messages
            .iter()
            .filter_map(|m| m.tool_calls.as_ref())
            .flatten()
            .map(|c| serde_json::json!({"id": c.id, "name": c.name, "arguments": c.arguments}))
            .collect();
        if !tool_calls.is_empty() {
            Value::Array(tool_calls)
        } else {
            let text = messages.iter().map(|m| m.content.as_text()).collect::<Vec<_>>().join("");
            Value::String(text)
        }
    }

    /// Decodes `input` as a tool-call batch and dispatches through the
    /// environment, emitting `toolCallStarting`/`toolCallCompleted`/
    /// `toolValidationFailed`/`toolCallFailed` per call (`§4.3`, `§4.7`).
    async fn execute_tools(ctx: &RunContext, input: Value) -> Result<Value> {
        let encoded: Vec<EncodedToolCall> = serde_json::from_value(input)?;
        let calls: Vec<ToolCall> = encoded.into_iter().map(ToolCall::from).collect();

        for call in &calls {
            ctx.pipeline
                .dispatch(
                    Event::ToolCallStarting(ToolCallStartingContext {
                        run_id: ctx.run_id.clone(),
                        tool: call.name.clone(),
                        call_id: call.id.clone(),
                        arguments: call.arguments.clone(),
                    }),
                    ctx.environment.as_ref(),
                )
                .await;
        }

        let outcomes = ctx.environment.execute_tools(calls).await;

        for outcome in &outcomes {
            Self::dispatch_tool_outcome_event(ctx, outcome).await;
        }

        let encoded_outcomes: Vec<EncodedToolOutcome> = outcomes
            .into_iter()
            .map(|o| match o.result {
                Ok(value) => EncodedToolOutcome {
                    id: o.id,
                    name: o.name,
                    ok: true,
                    value: Some(value),
                    error: None,
                },
                Err(reason) => EncodedToolOutcome {
                    id: o.id,
                    name: o.name,
                    ok: false,
                    value: None,
                    error: Some(reason),
                },
            })
            .collect();

        Ok(serde_json::to_value(encoded_outcomes)?)
    }

    async fn dispatch_tool_outcome_event(ctx: &RunContext, outcome: &ToolCallOutcome) {
        match (&outcome.result, outcome.failure_kind) {
            (Ok(value), _) => {
                ctx.pipeline
                    .dispatch(
                        Event::ToolCallCompleted(ToolCallCompletedContext {
                            run_id: ctx.run_id.clone(),
                            tool: outcome.name.clone(),
                            call_id: outcome.id.clone(),
                            result: value.clone(),
                        }),
                        ctx.environment.as_ref(),
                    )
                    .await;
            }
            (Err(reason), Some(ToolFailureKind::Validation)) => {
                ctx.pipeline
                    .dispatch(
                        Event::ToolValidationFailed(ToolValidationFailedContext {
                            run_id: ctx.run_id.clone(),
                            tool: outcome.name.clone(),
                            call_id: outcome.id.clone(),
                            reason: reason.clone(),
                        }),
                        ctx.environment.as_ref(),
                    )
                    .await;
            }
            (Err(reason), _) => {
                ctx.pipeline
                    .dispatch(
                        Event::ToolCallFailed(ToolCallFailedContext {
                            run_id: ctx.run_id.clone(),
                            tool: outcome.name.clone(),
                            call_id: outcome.id.clone(),
                            reason: reason.clone(),
                        }),
                        ctx.environment.as_ref(),
                    )
                    .await;
            }
        }
    }

    /// Appends tool outcomes to the prompt as `ToolResult` messages, in
    /// declaration order, independent of completion order (`§5 Ordering
    /// guarantees`).
    async fn send_tool_results(ctx: &RunContext, input: Value) -> Result<()> {
        let encoded: Vec<EncodedToolOutcome> = serde_json::from_value(input)?;
        let mut session = ctx.prompt.write().await;
        for entry in encoded {
            let text = if entry.ok {
                entry.value.unwrap_or(Value::Null).to_string()
            } else {
                entry.error.unwrap_or_default()
            };
            session.append_prompt(Message::tool_result(text, entry.id));
        }
        session.commit(None).await
    }

    async fn compress_history(ctx: &RunContext, policy: &CompressionPolicy, input: Value) -> Result<Value> {
        let mut session = ctx.prompt.write().await;
        let compressed = policy.compress(session.prompt().messages());
        session.with_messages(compressed);
        session.commit(None).await?;
        Ok(input)
    }

    /// Fans `input` out to every child, awaits all (no early cancellation on
    /// success), reduces, and adopts the winning child's context (`§4.5`,
    /// `§5 Forking`).
    async fn run_parallel(
        ctx: &RunContext,
        graph: &Arc<Graph>,
        children: &[QualifiedPath],
        reducer: &ParallelReducer,
        input: Value,
    ) -> Result<Value> {
        let mut child_contexts = Vec::with_capacity(children.len());
        for index in 0..children.len() {
            child_contexts.push(Arc::new(
                ctx.fork_for_parallel_child(format!("{}:child-{index}", ctx.run_id)).await,
            ));
        }

        let mut join_set = tokio::task::JoinSet::new();
        for (index, child_path) in children.iter().enumerate() {
            let child_ctx = child_contexts[index].clone();
            let child_node = graph
                .find_node(child_path)
                .ok_or_else(|| GraphError::NodeNotFound(child_path.clone()))?
                .clone();
            let child_path = child_path.clone();
            let graph = graph.clone();
            let input = input.clone();
            join_set.spawn(async move {
                let value = GraphExecutor::invoke_node(&child_ctx, &graph, &child_path, &child_node, input).await;
                (index, value)
            });
        }

        let mut slots: Vec<Option<Result<Value>>> = (0..children.len()).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, value)) => slots[index] = Some(value),
                Err(join_err) => {
                    return Err(GraphError::custom(format!("parallel child task panicked: {join_err}")))
                }
            }
        }

        let mut values = Vec::with_capacity(slots.len());
        for slot in slots {
            values.push(slot.expect("every child slot filled")?);
        }

        let (reduced, winner_index) = reducer.reduce(&values);
        ctx.adopt(&child_contexts[winner_index]).await?;
        Ok(reduced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::environment::{Environment, RecordingEnvironment};
    use crate::feature::FeaturePipeline;
    use crate::prompt::PromptState;
    use crate::strategy_graph::{Edge, ParallelReducer, Subgraph};
    use crate::tool_registry::{DispatchMode, RegisteredTool, ToolDescriptor, ToolRegistry};
    use llm::testing::ScriptedExecutor;
    use llm::{ChatResponse, LlmExecutor, Prompt, ToolCallRequest, ToolChoice};
    use serde_json::json;
    use std::sync::Arc;

    fn make_context(environment: Arc<dyn Environment>, executor: Arc<dyn LlmExecutor>, config: RunConfig) -> RunContext {
        RunContext::new(
            "run-1",
            "agent-1",
            environment,
            Arc::new(PromptState::new(Prompt::from_messages(vec![Message::system("be helpful")]))),
            executor,
            Arc::new(FeaturePipeline::new()),
            config,
        )
    }

    fn single_tool_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(RegisteredTool::new(
            ToolDescriptor {
                name: "lookup".into(),
                description: "looks something up".into(),
                arg_schema: json!({"type": "object"}),
                result_schema: json!({"type": "object"}),
            },
            |args| async move { Ok(args) },
        ));
        registry
    }

    /// S1: a plain sequential tool call round-trip — the model asks for a
    /// tool, the executor runs it and sends the result back, the model
    /// answers.
    #[tokio::test]
    async fn sequential_tool_call_round_trip() {
        let environment = Arc::new(RecordingEnvironment::new(single_tool_registry(), DispatchMode::Single));
        let llm = Arc::new(ScriptedExecutor::new(vec![
            ChatResponse::single(Message::assistant("").with_tool_calls(vec![ToolCallRequest {
                id: "call-1".into(),
                name: "lookup".into(),
                arguments: json!({"query": "rust"}),
            }])),
            ChatResponse::single(Message::assistant("lookup complete")),
        ]));
        let ctx = make_context(environment, llm, RunConfig::default());

        let subgraph = Subgraph::new("strat", "strat:start", "strat:finish")
            .with_node("strat:start", NodeKind::LlmRequest { forbid_tool_calls: false })
            .with_node("strat:exec", NodeKind::ToolExecute)
            .with_node("strat:send", NodeKind::ToolResultSend)
            .with_edge(Edge::always("strat:start", "strat:exec"))
            .with_edge(Edge::always("strat:exec", "strat:send"))
            .with_edge(Edge::always("strat:send", "strat:finish"));
        let graph = Arc::new(Graph::build("strat", vec![subgraph]).unwrap());

        let output = GraphExecutor::execute(&ctx, graph, json!("go")).await.unwrap();
        assert_eq!(output, Some(json!("lookup complete")));

        let read = ctx.prompt.read().await;
        let tool_result = read
            .messages()
            .iter()
            .find(|m| m.tool_call_id.as_deref() == Some("call-1"))
            .expect("tool result message appended");
        assert!(tool_result.content.as_text().contains("rust"));
    }

    /// S2: several tool calls from one response dispatched in parallel still
    /// come back out of `ToolExecute` in declaration order regardless of
    /// completion order.
    #[tokio::test]
    async fn parallel_tool_calls_preserve_declaration_order_through_executor() {
        let mut registry = ToolRegistry::new();
        registry.register(RegisteredTool::new(
            ToolDescriptor {
                name: "delay_echo".into(),
                description: "sleeps inversely to its index then echoes".into(),
                arg_schema: json!({"type": "object"}),
                result_schema: json!({"type": "object"}),
            },
            |args: Value| async move {
                let n = args["n"].as_u64().unwrap_or(0);
                tokio::time::sleep(std::time::Duration::from_millis(5 * (3 - n.min(3)))).await;
                Ok(args)
            },
        ));
        let environment = Arc::new(RecordingEnvironment::new(registry, DispatchMode::Parallel));
        let calls: Vec<ToolCallRequest> = (0..3)
            .map(|i| ToolCallRequest {
                id: i.to_string(),
                name: "delay_echo".into(),
                arguments: json!({"n": i}),
            })
            .collect();
        let llm = Arc::new(ScriptedExecutor::new(vec![ChatResponse::single(
            Message::assistant("").with_tool_calls(calls),
        )]));
        let ctx = make_context(environment, llm, RunConfig::default());

        let subgraph = Subgraph::new("strat", "strat:start", "strat:finish")
            .with_node("strat:start", NodeKind::LlmRequest { forbid_tool_calls: false })
            .with_node("strat:exec", NodeKind::ToolExecute)
            .with_edge(Edge::always("strat:start", "strat:exec"))
            .with_edge(Edge::always("strat:exec", "strat:finish"));
        let graph = Arc::new(Graph::build("strat", vec![subgraph]).unwrap());

        let output = GraphExecutor::execute(&ctx, graph, json!("go")).await.unwrap().unwrap();
        let outcomes = output.as_array().expect("array of outcomes");
        let ids: Vec<&str> = outcomes.iter().map(|o| o["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    /// S5: a model that never honors `ToolChoice::Required` exhausts the
    /// synthetic retry budget and fails with `ToolChoiceUnsupported` instead
    /// of looping forever.
    #[tokio::test]
    async fn tool_choice_unsupported_fails_after_exhausting_retries() {
        let environment = Arc::new(RecordingEnvironment::new(ToolRegistry::new(), DispatchMode::Single));
        let llm = Arc::new(ScriptedExecutor::new(vec![
            ChatResponse::single(Message::assistant("no tools here")),
            ChatResponse::single(Message::assistant("still no tools")),
            ChatResponse::single(Message::assistant("nope")),
        ]));
        let config = RunConfig::default()
            .with_tool_choice(ToolChoice::Required)
            .with_max_attempts_without_tool_choice(2);
        let ctx = make_context(environment, llm, config);

        let subgraph = Subgraph::new("strat", "strat:start", "strat:finish")
            .with_node("strat:start", NodeKind::LlmRequest { forbid_tool_calls: false })
            .with_edge(Edge::always("strat:start", "strat:finish"));
        let graph = Arc::new(Graph::build("strat", vec![subgraph]).unwrap());

        let err = GraphExecutor::execute(&ctx, graph, json!("go")).await.unwrap_err();
        match err {
            GraphError::ToolChoiceUnsupported { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("expected ToolChoiceUnsupported, got {other:?}"),
        }
    }

    /// S6: a parallel node's `SelectByMax` reducer, exercised end-to-end
    /// through `run_parallel` rather than against bare values.
    #[tokio::test]
    async fn parallel_node_select_by_max_adopts_winning_branch() {
        let environment = Arc::new(RecordingEnvironment::new(ToolRegistry::new(), DispatchMode::Single));
        let llm = Arc::new(ScriptedExecutor::new(vec![ChatResponse::single(Message::assistant("unused"))]));
        let ctx = make_context(environment, llm, RunConfig::default());

        let branch = Subgraph::new("branch", "branch:dummy", "branch:dummy")
            .with_node("branch:a", NodeKind::Transform(Arc::new(|_| Ok(json!(10.0)))))
            .with_node("branch:b", NodeKind::Transform(Arc::new(|_| Ok(json!(50.0)))))
            .with_node("branch:c", NodeKind::Transform(Arc::new(|_| Ok(json!(5.0)))));
        let strat = Subgraph::new("strat", "strat:start", "strat:finish")
            .with_node("strat:start", NodeKind::Transform(Arc::new(|v| Ok(v))))
            .with_node(
                "strat:container",
                NodeKind::Parallel {
                    children: vec!["branch:a".to_string(), "branch:b".to_string(), "branch:c".to_string()],
                    reducer: ParallelReducer::SelectByMax(Arc::new(|v: &Value| v.as_f64().unwrap_or(0.0))),
                },
            )
            .with_edge(Edge::always("strat:start", "strat:container"))
            .with_edge(Edge::always("strat:container", "strat:finish"));
        let graph = Arc::new(Graph::build("strat", vec![strat, branch]).unwrap());

        let output = GraphExecutor::execute(&ctx, graph, json!("go")).await.unwrap();
        assert_eq!(output, Some(json!(50.0)));
    }
}
