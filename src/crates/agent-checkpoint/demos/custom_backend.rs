//! Example of implementing a custom checkpoint backend.
//!
//! Demonstrates how downstream projects can implement `CheckpointSaver` for
//! their own storage engine. This file is not compiled as part of the crate;
//! it documents the pattern a durable backend would follow.
//!
//! ```rust,ignore
//! use agent_checkpoint::{Checkpoint, CheckpointError, CheckpointSaver, Result};
//! use async_trait::async_trait;
//!
//! pub struct PostgresCheckpointSaver {
//!     pool: sqlx::PgPool,
//! }
//!
//! #[async_trait]
//! impl CheckpointSaver for PostgresCheckpointSaver {
//!     async fn get_checkpoints(&self, agent_id: &str) -> Result<Vec<Checkpoint>> {
//!         let rows = sqlx::query_as::<_, (String,)>(
//!             "SELECT data FROM checkpoints WHERE agent_id = $1 AND node_id <> 'tombstone' ORDER BY version",
//!         )
//!         .bind(agent_id)
//!         .fetch_all(&self.pool)
//!         .await
//!         .map_err(|e| CheckpointError::Storage(e.to_string()))?;
//!         rows.into_iter()
//!             .map(|(data,)| serde_json::from_str(&data).map_err(CheckpointError::from))
//!             .collect()
//!     }
//!
//!     async fn get_latest_checkpoint(&self, agent_id: &str) -> Result<Option<Checkpoint>> {
//!         Ok(self.get_checkpoints(agent_id).await?.into_iter().max_by_key(|c| c.version))
//!     }
//!
//!     async fn save_checkpoint(&self, checkpoint: Checkpoint) -> Result<()> {
//!         let data = serde_json::to_string(&checkpoint)?;
//!         sqlx::query("INSERT INTO checkpoints (agent_id, version, node_id, data) VALUES ($1, $2, $3, $4)")
//!             .bind(&checkpoint.agent_id)
//!             .bind(checkpoint.version as i64)
//!             .bind(&checkpoint.node_id)
//!             .bind(data)
//!             .execute(&self.pool)
//!             .await
//!             .map_err(|e| CheckpointError::Storage(e.to_string()))?;
//!         Ok(())
//!     }
//!
//!     async fn delete_checkpoints(&self, agent_id: &str) -> Result<()> {
//!         let next_version = self
//!             .get_checkpoints(agent_id)
//!             .await?
//!             .iter()
//!             .map(|c| c.version)
//!             .max()
//!             .unwrap_or(0)
//!             + 1;
//!         self.save_checkpoint(Checkpoint::tombstone(
//!             uuid::Uuid::new_v4().to_string(),
//!             agent_id,
//!             next_version,
//!             chrono::Utc::now().timestamp_millis(),
//!         ))
//!         .await
//!     }
//! }
//! ```
//!
//! Key considerations for a durable backend:
//! 1. Serialize per `agent_id` on the write path — the engine never issues
//!    concurrent writes for the same agent, but a careless backend could
//!    still interleave them with reads from a rollback in progress.
//! 2. Index on `(agent_id, version)` since `get_latest_checkpoint` is on the
//!    hot path of every strategy run.
//! 3. Deletion is logical only (tombstone) — never physically remove rows,
//!    or version numbering for that agent will start colliding.

fn main() {
    println!("see the doc comment at the top of this file for the CheckpointSaver pattern");
}
