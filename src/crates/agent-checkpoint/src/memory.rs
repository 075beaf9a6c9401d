//! In-memory checkpoint storage for development and testing.
//!
//! [`InMemoryCheckpointSaver`] is a reference implementation of
//! [`CheckpointSaver`] that keeps every agent's checkpoint history in a
//! thread-safe map. Useful for development, tests, and as the default
//! provider when no durable backend is wired up — not for production use
//! across restarts, since nothing is written to disk.

use crate::checkpoint::Checkpoint;
use crate::error::Result;
use crate::traits::CheckpointSaver;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory [`CheckpointSaver`]. Checkpoints for each agent are appended
/// to a per-agent `Vec` ordered by version; tombstones live in the same
/// vector as ordinary entries so version numbering never has to skip.
#[derive(Default, Clone)]
pub struct InMemoryCheckpointSaver {
    checkpoints: Arc<RwLock<HashMap<String, Vec<Checkpoint>>>>,
}

impl InMemoryCheckpointSaver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all stored state, for test isolation between cases.
    pub async fn clear(&self) {
        self.checkpoints.write().await.clear();
    }
}

#[async_trait]
impl CheckpointSaver for InMemoryCheckpointSaver {
    async fn get_checkpoints(&self, agent_id: &str) -> Result<Vec<Checkpoint>> {
        let map = self.checkpoints.read().await;
        Ok(map
            .get(agent_id)
            .map(|entries| entries.iter().filter(|c| !c.is_tombstone()).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_latest_checkpoint(&self, agent_id: &str) -> Result<Option<Checkpoint>> {
        let map = self.checkpoints.read().await;
        Ok(map.get(agent_id).and_then(|entries| {
            entries
                .iter()
                .filter(|c| !c.is_tombstone())
                .max_by_key(|c| c.version)
                .cloned()
        }))
    }

    async fn save_checkpoint(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut map = self.checkpoints.write().await;
        map.entry(checkpoint.agent_id.clone())
            .or_default()
            .push(checkpoint);
        Ok(())
    }

    async fn delete_checkpoints(&self, agent_id: &str) -> Result<()> {
        let mut map = self.checkpoints.write().await;
        let entries = map.entry(agent_id.to_string()).or_default();
        let next_version = entries.iter().map(|c| c.version).max().unwrap_or(0) + 1;
        entries.push(Checkpoint::tombstone(
            uuid::Uuid::new_v4().to_string(),
            agent_id,
            next_version,
            0,
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::RollbackStrategy;

    fn cp(agent: &str, node: &str, version: u64) -> Checkpoint {
        Checkpoint::new(
            format!("{agent}-{version}"),
            agent,
            node,
            None,
            None,
            vec![],
            version,
            version as i64,
        )
    }

    #[tokio::test]
    async fn test_latest_checkpoint_is_highest_version() {
        let saver = InMemoryCheckpointSaver::new();
        saver.save_checkpoint(cp("a1", "nodeA", 1)).await.unwrap();
        saver.save_checkpoint(cp("a1", "nodeB", 2)).await.unwrap();
        let latest = saver.get_latest_checkpoint("a1").await.unwrap().unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.node_id, "nodeB");
    }

    #[tokio::test]
    async fn test_delete_hides_checkpoints_via_tombstone() {
        let saver = InMemoryCheckpointSaver::new();
        saver.save_checkpoint(cp("a1", "nodeA", 1)).await.unwrap();
        saver.delete_checkpoints("a1").await.unwrap();
        assert!(saver.get_latest_checkpoint("a1").await.unwrap().is_none());
        assert!(saver.get_checkpoints("a1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_version_strictly_increasing_across_tombstone() {
        let saver = InMemoryCheckpointSaver::new();
        saver.save_checkpoint(cp("a1", "nodeA", 1)).await.unwrap();
        saver.delete_checkpoints("a1").await.unwrap();
        saver
            .save_checkpoint(cp("a1", "nodeB", 3).with_rollback_strategy(RollbackStrategy::Default))
            .await
            .unwrap();
        let latest = saver.get_latest_checkpoint("a1").await.unwrap().unwrap();
        assert_eq!(latest.version, 3);
    }
}
