//! Choice / multi-response selection (C9).
//!
//! When an LLM call requests `number_of_choices > 1`, the executor returns
//! several candidate [`llm::Choice`]s. A [`ChoiceSelectionStrategy`] picks
//! one; [`PromptExecutorWithChoiceSelection`] wraps an [`LlmExecutor`] so
//! callers that just want "the" response never see the fan-out.

use async_trait::async_trait;
use llm::{ChatRequest, ChatResponse, ChatStreamResponse, Choice, LlmError, LlmExecutor, ModerationResult};

use crate::environment::Environment;
use crate::error::{GraphError, Result};

/// Chooses one candidate among several. Implementations may suspend (e.g.
/// to ask a human), so the trait is async.
#[async_trait]
pub trait ChoiceSelectionStrategy: Send + Sync {
    /// Return the index into `choices` to use. Must be in bounds; an
    /// out-of-range index is treated as a bug in the strategy, not a user
    /// error, and produces a [`GraphError::Custom`].
    async fn select(&self, choices: &[Choice]) -> Result<usize>;
}

/// Default strategy: always the first candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstChoice;

#[async_trait]
impl ChoiceSelectionStrategy for FirstChoice {
    async fn select(&self, choices: &[Choice]) -> Result<usize> {
        if choices.is_empty() {
            return Err(GraphError::custom("no choices to select from"));
        }
        Ok(0)
    }
}

/// Delegates selection to the environment, for human-in-the-loop choice
/// among candidates. The hook lives on [`crate::environment::Environment`]
/// so a strategy swap never changes the engine's external trait surface.
pub struct InteractiveChoiceSelection<E> {
    environment: E,
}

impl<E> InteractiveChoiceSelection<E> {
    pub fn new(environment: E) -> Self {
        InteractiveChoiceSelection { environment }
    }
}

#[async_trait]
impl<E> ChoiceSelectionStrategy for InteractiveChoiceSelection<E>
where
    E: crate::environment::Environment + Send + Sync,
{
    async fn select(&self, choices: &[Choice]) -> Result<usize> {
        if choices.is_empty() {
            return Err(GraphError::custom("no choices to select from"));
        }
        self.environment.select_choice(choices).await
    }
}

/// Wraps an [`LlmExecutor`] so every `execute` call requests multiple
/// choices internally and returns only the one a [`ChoiceSelectionStrategy`]
/// picked. Streaming calls pass through unaffected, since streaming has no
/// multi-choice concept.
pub struct PromptExecutorWithChoiceSelection<Inner, Strategy> {
    inner: Inner,
    strategy: Strategy,
    number_of_choices: u32,
}

impl<Inner, Strategy> PromptExecutorWithChoiceSelection<Inner, Strategy> {
    pub fn new(inner: Inner, strategy: Strategy, number_of_choices: u32) -> Self {
        PromptExecutorWithChoiceSelection {
            inner,
            strategy,
            number_of_choices: number_of_choices.max(1),
        }
    }
}

#[async_trait]
impl<Inner, Strategy> LlmExecutor for PromptExecutorWithChoiceSelection<Inner, Strategy>
where
    Inner: LlmExecutor + Send + Sync,
    Strategy: ChoiceSelectionStrategy + Send + Sync,
{
    async fn execute(&self, request: ChatRequest) -> std::result::Result<ChatResponse, LlmError> {
        if self.number_of_choices <= 1 {
            return self.inner.execute(request).await;
        }
        let choices = self
            .inner
            .execute_multiple_choices(request, self.number_of_choices as usize)
            .await?;
        let selected = self.strategy.select(&choices).await.map_err(|e| {
            LlmError::Call(format!("choice selection failed: {e}"))
        })?;
        let choice = choices
            .into_iter()
            .nth(selected)
            .ok_or_else(|| LlmError::Call("selected choice index out of range".into()))?;
        Ok(ChatResponse {
            messages: choice.messages,
            usage: choice.usage,
            reasoning: None,
        })
    }

    async fn execute_streaming(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<ChatStreamResponse, LlmError> {
        self.inner.execute_streaming(request).await
    }

    async fn moderate(&self, request: ChatRequest) -> std::result::Result<ModerationResult, LlmError> {
        self.inner.moderate(request).await
    }

    async fn is_available(&self) -> std::result::Result<bool, LlmError> {
        self.inner.is_available().await
    }

    async fn close(&self) -> std::result::Result<(), LlmError> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm::testing::ScriptedExecutor;
    use llm::Message;

    #[tokio::test]
    async fn first_choice_picks_index_zero() {
        let choices = vec![
            Choice {
                messages: vec![Message::assistant("a")],
                usage: None,
            },
            Choice {
                messages: vec![Message::assistant("b")],
                usage: None,
            },
        ];
        let selected = FirstChoice.select(&choices).await.unwrap();
        assert_eq!(selected, 0);
    }

    #[tokio::test]
    async fn first_choice_errors_on_empty_candidates() {
        assert!(FirstChoice.select(&[]).await.is_err());
    }

    #[tokio::test]
    async fn single_choice_passthrough_skips_multi_choice_path() {
        let inner = ScriptedExecutor::new(vec![ChatResponse::single(Message::assistant("hi"))]);
        let wrapped = PromptExecutorWithChoiceSelection::new(inner, FirstChoice, 1);
        let response = wrapped
            .execute(ChatRequest::new(llm::Prompt::new()))
            .await
            .unwrap();
        assert_eq!(response.messages[0].content.as_text(), "hi");
    }
}
