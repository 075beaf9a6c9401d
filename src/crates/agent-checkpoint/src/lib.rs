//! # agent-checkpoint — Checkpoint/Rollback Persistence
//!
//! Implements `C6` of the agent engine: the [`Checkpoint`] data model, the
//! [`CheckpointSaver`] persistence-provider trait the engine consumes, and
//! an [`InMemoryCheckpointSaver`] reference implementation.
//!
//! ## Overview
//!
//! A checkpoint is a snapshot sufficient to resume execution at a specific
//! node: which node, what input it was about to run with, and the message
//! history at that point. The engine never applies a rollback itself — it
//! only reads the latest checkpoint and writes an [`AgentContextData`] into
//! the run's context; the graph executor (`agent-core`) performs the actual
//! restoration walk on its next top-level execution attempt.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ agent-core: StrategyRunner / GraphExecutor   │
//! │   createCheckpoint / rollbackToLatest         │
//! └───────────────────┬───────────────────────────┘
//!                      │ CheckpointSaver trait
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │ Storage backend (your implementation)         │
//! │   get_checkpoints / get_latest_checkpoint /    │
//! │   save_checkpoint / delete_checkpoints         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Versions are strictly increasing per agent; deletion is logical, via a
//! tombstone entry, so version numbering never has to skip or renumber.
//!
//! This crate ships one reference implementation, [`InMemoryCheckpointSaver`],
//! suitable for development and tests. A durable backend (Postgres, SQLite,
//! object storage) is implemented downstream against the [`CheckpointSaver`]
//! trait; see `demos/custom_backend.rs` for the shape such an implementation
//! takes.

pub mod checkpoint;
pub mod error;
pub mod memory;
pub mod traits;

pub use checkpoint::{AgentContextData, Checkpoint, RollbackStrategy, TOMBSTONE_NODE_ID};
pub use error::{CheckpointError, Result};
pub use memory::InMemoryCheckpointSaver;
pub use traits::CheckpointSaver;
