//! Trait-only LLM executor interface.
//!
//! This crate defines the boundary between the agent engine (`agent-core`)
//! and a concrete language-model client: the [`LlmExecutor`] trait, the
//! request/response/streaming types it trades in, and the [`Message`]/
//! [`Prompt`] wire types that are the engine's canonical message
//! representation (`agent-core` re-exports them rather than declaring its
//! own and converting at the seam).
//!
//! No concrete provider client ships from this crate or this workspace —
//! wiring one up means implementing [`LlmExecutor`] against whatever
//! HTTP/gRPC client the embedding application already uses.
//!
//! # Example
//!
//! ```rust
//! use llm::{ChatRequest, ChatResponse, LlmExecutor, Message, Prompt};
//! use llm::testing::ScriptedExecutor;
//!
//! # async fn run() {
//! let executor = ScriptedExecutor::new(vec![ChatResponse::single(Message::assistant("hi"))]);
//! let response = executor.execute(ChatRequest::new(Prompt::new())).await.unwrap();
//! assert_eq!(response.messages.len(), 1);
//! # }
//! ```

pub mod error;
pub mod message;
pub mod request;
pub mod response;
pub mod streaming;
pub mod tools;
pub mod traits;

pub use error::{LlmError, Result};
pub use message::{ContentPart, Message, MessageContent, MessageRole, Prompt, ToolCallRequest};
pub use request::{ChatConfig, ChatRequest, ReasoningMode};
pub use response::{ChatResponse, Choice, ModerationResult, ReasoningContent, UsageMetadata};
pub use streaming::{ChatStreamResponse, MessageChunk, TokenStream};
pub use tools::{ToolChoice, ToolDefinition};
pub use traits::LlmExecutor;

#[cfg(any(test, feature = "test-util"))]
pub use traits::testing;
