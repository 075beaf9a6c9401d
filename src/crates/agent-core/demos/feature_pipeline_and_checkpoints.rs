//! Example of installing a feature and enabling automatic checkpointing.
//!
//! Shows the two most common things an embedder wires up beyond the bare
//! graph: a `Feature` that reacts to lifecycle events, and a
//! `CheckpointSaver` bound to a `RunContext` so a rollback node has
//! somewhere to resume from. This file is not compiled as part of the
//! crate; it documents the pattern.
//!
//! ```rust,ignore
//! use agent_core::feature::{DebuggerFeature, Feature, FeaturePipeline};
//! use agent_core::{RunConfig, RunContext};
//! use agent_checkpoint::InMemoryCheckpointSaver;
//! use std::sync::Arc;
//!
//! async fn wire_up(environment: Arc<dyn agent_core::environment::Environment>, llm: Arc<dyn llm::LlmExecutor>) {
//!     let mut pipeline = FeaturePipeline::new();
//!     pipeline.install_default(&DebuggerFeature);
//!     let pipeline = Arc::new(pipeline);
//!
//!     let saver = Arc::new(InMemoryCheckpointSaver::new());
//!     let config = RunConfig::default().with_automatic_persistence(true);
//!
//!     let ctx = RunContext::new(
//!         "run-1",
//!         "agent-1",
//!         environment,
//!         Arc::new(agent_core::prompt::PromptState::new(llm::Prompt::new())),
//!         llm,
//!         pipeline,
//!         config,
//!     )
//!     .with_checkpoint_saver(saver);
//!
//!     // a Rollback node reached later in the same run now has a
//!     // CheckpointAnchor to resume from, and every non-Transform node entry
//!     // is persisted as it happens.
//!     let _ = ctx;
//! }
//! ```
//!
//! `install_default` runs a feature's own `default_config()`; pass a
//! `FeatureConfig` explicitly (via `FeaturePipeline::install`) to scope a
//! feature's handlers to a subset of events or filter them by run.

fn main() {
    println!("see the doc comment at the top of this file for the feature/checkpoint wiring pattern");
}
