use crate::error::Result;
use crate::request::ChatRequest;
use crate::response::{ChatResponse, Choice, ModerationResult};
use crate::streaming::ChatStreamResponse;
use async_trait::async_trait;

/// The external LLM executor interface consumed by the agent engine
/// (`§6 EXTERNAL INTERFACES`).
///
/// `agent-core` never talks to a concrete provider; it only ever holds a
/// `Box<dyn LlmExecutor>` bound to the current run. Implementations live
/// outside this crate (this workspace ships none), matching the spec's
/// non-goal of providing concrete provider clients.
#[async_trait]
pub trait LlmExecutor: Send + Sync {
    /// One non-streaming call; may return more than one message (e.g. a
    /// tool-call message with no trailing text).
    async fn execute(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Streaming call. Frames must be forwarded in arrival order.
    async fn execute_streaming(&self, request: ChatRequest) -> Result<ChatStreamResponse>;

    /// Requests `n` independent candidate completions for the same prompt
    /// (`C9`); `n` is carried on the request's `config` by convention of the
    /// caller constructing distinct requests, not a dedicated field here,
    /// since choice count is a concern of the caller's retry/fan-out logic.
    async fn execute_multiple_choices(&self, request: ChatRequest, n: usize) -> Result<Vec<Choice>>;

    /// Content moderation over a prompt, independent of generation.
    async fn moderate(&self, request: ChatRequest) -> Result<ModerationResult>;

    /// Whether the executor is currently reachable. Defaults to `true`;
    /// override when the provider exposes a cheap health check.
    async fn is_available(&self) -> Result<bool> {
        Ok(true)
    }

    /// Releases any held connections/resources. Defaults to a no-op.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    use super::*;
    use crate::message::Message;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic in-memory executor used by `agent-core`'s own tests.
    pub struct ScriptedExecutor {
        responses: Vec<ChatResponse>,
        cursor: AtomicUsize,
    }

    impl ScriptedExecutor {
        pub fn new(responses: Vec<ChatResponse>) -> Self {
            Self {
                responses,
                cursor: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmExecutor for ScriptedExecutor {
        async fn execute(&self, _request: ChatRequest) -> Result<ChatResponse> {
            let idx = self.cursor.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(idx)
                .cloned()
                .ok_or_else(|| crate::error::LlmError::Call("script exhausted".into()))
        }

        async fn execute_streaming(&self, _request: ChatRequest) -> Result<ChatStreamResponse> {
            Err(crate::error::LlmError::Stream("not supported by ScriptedExecutor".into()))
        }

        async fn execute_multiple_choices(
            &self,
            request: ChatRequest,
            n: usize,
        ) -> Result<Vec<Choice>> {
            let resp = self.execute(request).await?;
            Ok((0..n)
                .map(|_| Choice {
                    messages: resp.messages.clone(),
                    usage: resp.usage,
                })
                .collect())
        }

        async fn moderate(&self, _request: ChatRequest) -> Result<ModerationResult> {
            Ok(ModerationResult {
                flagged: false,
                categories: Vec::new(),
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_scripted_executor_returns_in_order() {
            let exec = ScriptedExecutor::new(vec![
                ChatResponse::single(Message::assistant("first")),
                ChatResponse::single(Message::assistant("second")),
            ]);
            let r1 = exec
                .execute(ChatRequest::new(crate::message::Prompt::new()))
                .await
                .unwrap();
            let r2 = exec
                .execute(ChatRequest::new(crate::message::Prompt::new()))
                .await
                .unwrap();
            assert_eq!(r1.first_message().unwrap().content.as_text(), "first");
            assert_eq!(r2.first_message().unwrap().content.as_text(), "second");
        }
    }
}
