//! The [`CheckpointSaver`] trait: the persistence-provider interface
//! consumed by the engine (`§6 EXTERNAL INTERFACES: Persistence provider`).
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │ agent-core (StrategyRunner / C6 restore)   │
//! └───────────────┬─────────────────────────────┘
//!                  │ CheckpointSaver trait
//!                  ▼
//! ┌───────────────────────────────────────────┐
//! │ Storage backend (your implementation)      │
//! │   get_checkpoints / get_latest / save /     │
//! │   delete (tombstone)                        │
//! └───────────────────────────────────────────┘
//! ```
//!
//! This crate ships one reference implementation, [`crate::memory::InMemoryCheckpointSaver`].

use crate::checkpoint::Checkpoint;
use crate::error::Result;
use async_trait::async_trait;

/// Storage backend for agent checkpoints.
///
/// All operations are expected to be serialized per `agent_id` by the
/// implementation; the engine never issues concurrent writes for the same
/// agent, but concurrent reads for different agents must not block each other.
#[async_trait]
pub trait CheckpointSaver: Send + Sync {
    /// All live (non-tombstone) checkpoints for `agent_id`, oldest first.
    async fn get_checkpoints(&self, agent_id: &str) -> Result<Vec<Checkpoint>>;

    /// The highest-versioned live checkpoint for `agent_id`, if any.
    async fn get_latest_checkpoint(&self, agent_id: &str) -> Result<Option<Checkpoint>>;

    /// Persists `checkpoint`. Callers must assign a version strictly greater
    /// than any earlier live checkpoint for the same agent.
    async fn save_checkpoint(&self, checkpoint: Checkpoint) -> Result<()>;

    /// Logically deletes every checkpoint for `agent_id` by writing a
    /// tombstone at the next version; existing rows are never removed.
    async fn delete_checkpoints(&self, agent_id: &str) -> Result<()>;
}
