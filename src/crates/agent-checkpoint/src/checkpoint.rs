//! Checkpoint data model (`§3 DATA MODEL: Checkpoint`, `§4.6 Checkpoint/Persistence`).
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Checkpoint                                                │
//! │  id, agent_id, node_id                                    │
//! │  last_input (+ declared type name)                        │
//! │  message_history: Vec<Message>                            │
//! │  rollback_strategy: RollbackStrategy                      │
//! │  version: u64            (strictly increasing per agent)  │
//! │  created_at: i64         (epoch millis)                   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! A tombstone is a checkpoint with `node_id == "tombstone"` and no input or
//! history; it exists purely so `deleteCheckpoints` can logically remove an
//! agent's history without leaving index gaps a naive `list` would trip on.

use llm::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TOMBSTONE_NODE_ID: &str = "tombstone";

/// How a checkpoint's rollback is applied (`§3 DATA MODEL: Checkpoint`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollbackStrategy {
    /// Restore node position, input, and message history.
    Default,
    /// Restore only the message history, leaving node position untouched.
    MessageHistoryOnly,
}

/// A persisted snapshot of one agent run at a node boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub agent_id: String,
    /// Qualified path (or last-segment name) of the node this checkpoint was taken at.
    pub node_id: String,
    pub last_input: Option<Value>,
    pub last_input_type: Option<String>,
    pub message_history: Vec<Message>,
    pub rollback_strategy: RollbackStrategy,
    /// Strictly increasing per `agent_id`; the latest checkpoint is the
    /// highest version that is not a tombstone.
    pub version: u64,
    pub created_at: i64,
}

impl Checkpoint {
    pub fn new(
        id: impl Into<String>,
        agent_id: impl Into<String>,
        node_id: impl Into<String>,
        last_input: Option<Value>,
        last_input_type: Option<String>,
        message_history: Vec<Message>,
        version: u64,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            node_id: node_id.into(),
            last_input,
            last_input_type,
            message_history,
            rollback_strategy: RollbackStrategy::Default,
            version,
            created_at,
        }
    }

    pub fn with_rollback_strategy(mut self, strategy: RollbackStrategy) -> Self {
        self.rollback_strategy = strategy;
        self
    }

    /// Builds a tombstone entry for `agent_id` at `version`, logically
    /// deleting every earlier checkpoint without removing them from storage.
    pub fn tombstone(id: impl Into<String>, agent_id: impl Into<String>, version: u64, created_at: i64) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            node_id: TOMBSTONE_NODE_ID.to_string(),
            last_input: None,
            last_input_type: None,
            message_history: Vec::new(),
            rollback_strategy: RollbackStrategy::Default,
            version,
            created_at,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.node_id == TOMBSTONE_NODE_ID
    }
}

/// Transient per-run rollback request (`§3 DATA MODEL: AgentContextData`).
///
/// Consumed exactly once, at the start of the next top-level strategy
/// execution attempt (`§4.6 Restoration algorithm`).
#[derive(Debug, Clone)]
pub struct AgentContextData {
    pub node_id: String,
    pub last_input: Option<Value>,
    pub message_history: Vec<Message>,
    pub rollback_strategy: RollbackStrategy,
    /// Already-rolled-back marker consumed by a node so it does not roll
    /// back a second time on re-entry (see `S3` in the testable properties).
    pub already_rolled_back: bool,
}

impl AgentContextData {
    pub fn from_checkpoint(checkpoint: &Checkpoint) -> Self {
        Self {
            node_id: checkpoint.node_id.clone(),
            last_input: checkpoint.last_input.clone(),
            message_history: checkpoint.message_history.clone(),
            rollback_strategy: checkpoint.rollback_strategy,
            already_rolled_back: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tombstone_marks_node_id() {
        let t = Checkpoint::tombstone("c2", "agent-1", 2, 0);
        assert!(t.is_tombstone());
        assert!(t.message_history.is_empty());
    }

    #[test]
    fn test_agent_context_data_from_checkpoint() {
        let cp = Checkpoint::new("c1", "agent-1", "nodeA", None, None, vec![], 1, 0)
            .with_rollback_strategy(RollbackStrategy::MessageHistoryOnly);
        let data = AgentContextData::from_checkpoint(&cp);
        assert_eq!(data.node_id, "nodeA");
        assert_eq!(data.rollback_strategy, RollbackStrategy::MessageHistoryOnly);
        assert!(!data.already_rolled_back);
    }
}
