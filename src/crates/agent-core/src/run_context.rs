//! The per-run bundle (`§3 DATA MODEL: Agent Run`).
//!
//! A [`RunContext`] owns everything a running strategy touches: the
//! environment, prompt, storage, LLM binding, feature pipeline, config, and
//! (optionally) a checkpoint saver plus the pending rollback slot C6's
//! restoration algorithm consumes. It is created once per `run(input)` and
//! handed by reference down through the executor.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use agent_checkpoint::{AgentContextData, CheckpointSaver};
use llm::LlmExecutor;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::RunConfig;
use crate::environment::Environment;
use crate::feature::FeaturePipeline;
use crate::prompt::PromptState;
use crate::storage::StateManager;

/// An `AgentContextData` plus the in-memory rollback actions that
/// accompanied the request to roll back. `additionalRollbackActions` are
/// ordinary closures (e.g. "undo this tool's side effect") and have no
/// sensible serialized form, so unlike the rest of `AgentContextData` they
/// never round-trip through a [`CheckpointSaver`] — they only exist for the
/// lifetime of the run that scheduled the rollback.
pub struct PendingRollback {
    pub data: AgentContextData,
    pub additional_rollback_actions: Vec<Arc<dyn Fn() + Send + Sync>>,
}

impl PendingRollback {
    pub fn new(data: AgentContextData) -> Self {
        PendingRollback {
            data,
            additional_rollback_actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: Arc<dyn Fn() + Send + Sync>) -> Self {
        self.additional_rollback_actions.push(action);
        self
    }
}

/// Everything one strategy run owns (`§3 DATA MODEL: Agent Run`).
///
/// `runId`/`agentId` are opaque strings per the spec; `agentId` is the
/// identity a [`CheckpointSaver`] partitions checkpoints by, `runId`
/// distinguishes concurrent runs of the same agent.
pub struct RunContext {
    pub run_id: String,
    pub agent_id: String,
    pub environment: Arc<dyn Environment>,
    pub prompt: Arc<PromptState>,
    pub state: Arc<StateManager>,
    pub llm: Arc<dyn LlmExecutor>,
    pub pipeline: Arc<FeaturePipeline>,
    pub config: RunConfig,
    pub checkpoint_saver: Option<Arc<dyn CheckpointSaver>>,
    pub pending_rollback: Mutex<Option<PendingRollback>>,
    pub cancellation: CancellationToken,
    invocations: AtomicU32,
    /// Set by [`crate::restore::restore`] from `AgentContextData::already_rolled_back`
    /// when this attempt resumed from a scheduled rollback, so a `Rollback`
    /// node reached a second time knows not to schedule again (S3).
    restored_already_rolled_back: AtomicBool,
}

impl RunContext {
    pub fn new(
        run_id: impl Into<String>,
        agent_id: impl Into<String>,
        environment: Arc<dyn Environment>,
        prompt: Arc<PromptState>,
        llm: Arc<dyn LlmExecutor>,
        pipeline: Arc<FeaturePipeline>,
        config: RunConfig,
    ) -> Self {
        RunContext {
            run_id: run_id.into(),
            agent_id: agent_id.into(),
            environment,
            prompt,
            state: Arc::new(StateManager::new()),
            llm,
            pipeline,
            config,
            checkpoint_saver: None,
            pending_rollback: Mutex::new(None),
            cancellation: CancellationToken::new(),
            invocations: AtomicU32::new(0),
            restored_already_rolled_back: AtomicBool::new(false),
        }
    }

    pub fn with_checkpoint_saver(mut self, saver: Arc<dyn CheckpointSaver>) -> Self {
        self.checkpoint_saver = Some(saver);
        self
    }

    /// Records one more node invocation and returns the new total, checked
    /// by the executor against `config.max_agent_iterations`
    /// (`§7 IterationLimitExceeded`).
    pub fn record_invocation(&self) -> u32 {
        self.invocations.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Invocations recorded so far on this context.
    pub fn invocation_count(&self) -> u32 {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Schedules a rollback to be applied at the start of the next
    /// top-level execution attempt (`rollbackToLatestCheckpoint`, `§4.6`).
    pub async fn schedule_rollback(&self, pending: PendingRollback) {
        *self.pending_rollback.lock().await = Some(pending);
    }

    /// Whether a rollback is queued and not yet consumed.
    pub async fn has_pending_rollback(&self) -> bool {
        self.pending_rollback.lock().await.is_some()
    }

    /// Called once by [`crate::restore::restore`] per restored attempt,
    /// with `AgentContextData::already_rolled_back`.
    pub fn set_restored_already_rolled_back(&self, value: bool) {
        self.restored_already_rolled_back.store(value, Ordering::SeqCst);
    }

    /// Consumes the "already rolled back" marker: returns its value and
    /// resets it, so a `Rollback` node inside a loop only skips scheduling
    /// once per restored attempt.
    pub fn take_restored_already_rolled_back(&self) -> bool {
        self.restored_already_rolled_back.swap(false, Ordering::SeqCst)
    }

    /// A fresh sibling `RunContext` for a parallel child: shares the
    /// immutable collaborators (environment, LLM, pipeline, config,
    /// checkpoint saver) but owns independent forks of prompt and state
    /// (`§5 CONCURRENCY & RESOURCE MODEL: Forking`).
    pub async fn fork_for_parallel_child(&self, child_run_id: impl Into<String>) -> RunContext {
        let messages = self.prompt.read().await.messages().to_vec();
        let forked_prompt = Arc::new(PromptState::new(llm::Prompt::from_messages(messages)));
        RunContext {
            run_id: child_run_id.into(),
            agent_id: self.agent_id.clone(),
            environment: self.environment.clone(),
            prompt: forked_prompt,
            state: Arc::new(self.state.copy()),
            llm: self.llm.clone(),
            pipeline: self.pipeline.clone(),
            config: self.config.clone(),
            checkpoint_saver: self.checkpoint_saver.clone(),
            pending_rollback: Mutex::new(None),
            cancellation: self.cancellation.clone(),
            invocations: AtomicU32::new(0),
            restored_already_rolled_back: AtomicBool::new(false),
        }
    }

    /// Adopts a forked child's prompt/state as this context's own, used by
    /// the parallel-node reducer to make the winning child's effects visible
    /// on the parent context (`§4.5`: "selects which child's context becomes
    /// the active context").
    pub async fn adopt(&self, winner: &RunContext) -> crate::error::Result<()> {
        let messages = winner.prompt.read().await.messages().to_vec();
        let mut session = self.prompt.write().await;
        session.with_messages(messages);
        session.commit(None).await?;
        self.state.storage().put_all(winner.state.storage().snapshot());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::environment::RecordingEnvironment;
    use crate::tool_registry::{DispatchMode, ToolRegistry};
    use llm::testing::ScriptedExecutor;
    use llm::{ChatResponse, Message, Prompt};

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

    #[tokio::test]
    async fn fork_then_adopt_propagates_child_prompt_to_parent() {
        let parent = context();
        let child = parent.fork_for_parallel_child("run-1:child-0").await;
        {
            let mut session = child.prompt.write().await;
            session.append_prompt(Message::user("child said this"));
            session.commit(None).await.unwrap();
        }
        parent.adopt(&child).await.unwrap();
        let read = parent.prompt.read().await;
        assert_eq!(read.messages().len(), 2);
        assert_eq!(read.messages()[1].content.as_text(), "child said this");
    }

    #[tokio::test]
    async fn schedule_rollback_is_visible_until_consumed() {
        let ctx = context();
        assert!(!ctx.has_pending_rollback().await);
        let data = agent_checkpoint::AgentContextData {
            node_id: "nodeA".into(),
            last_input: None,
            message_history: vec![],
            rollback_strategy: agent_checkpoint::RollbackStrategy::Default,
            already_rolled_back: false,
        };
        ctx.schedule_rollback(PendingRollback::new(data)).await;
        assert!(ctx.has_pending_rollback().await);
        let taken = ctx.pending_rollback.lock().await.take();
        assert!(taken.is_some());
        assert!(!ctx.has_pending_rollback().await);
    }
}
