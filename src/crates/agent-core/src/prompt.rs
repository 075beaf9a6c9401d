//! Prompt session guards (C2).
//!
//! The run's prompt lives behind a single `tokio::sync::RwLock<Prompt>`.
//! Two session kinds borrow it:
//!
//! - [`ReadSession`] holds the lock's read guard for its lifetime; any
//!   number of read sessions can be open at once, but never alongside a
//!   write session.
//! - [`WriteSession`] is exclusive. It first acquires a `tokio::sync::Mutex<()>`
//!   serialization permit (so at most one writer is ever constructing a
//!   mutation, even before it touches the `RwLock`), then takes a local
//!   scratch copy of the prompt to mutate freely. The mutated copy is
//!   published back into the shared lock on [`WriteSession::commit`], so
//!   readers never observe a partially-mutated prompt — only the fully old
//!   or fully new version.
//!
//! Rust has no async `Drop`, so publish-on-exit can't be a destructor the
//! way it would be in the teacher's GC'd host language: callers must call
//! `commit` explicitly. A `WriteSession` dropped without committing logs a
//! warning and discards its scratch copy rather than silently publishing
//! a partial mutation on a blocking drop.

use llm::{Message, Prompt};
use tokio::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard};

use crate::error::Result;

/// Sum of the prompt tail's last response token counts, gated on by
/// compression nodes deciding whether to trim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl From<&llm::UsageMetadata> for TokenUsage {
    fn from(u: &llm::UsageMetadata) -> Self {
        TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

/// Owns the run's prompt and the bookkeeping sessions mutate.
pub struct PromptState {
    prompt: RwLock<Prompt>,
    write_permit: Mutex<()>,
    latest_token_usage: RwLock<TokenUsage>,
    model: RwLock<Option<String>>,
}

impl PromptState {
    pub fn new(prompt: Prompt) -> Self {
        PromptState {
            prompt: RwLock::new(prompt),
            write_permit: Mutex::new(()),
            latest_token_usage: RwLock::new(TokenUsage::default()),
            model: RwLock::new(None),
        }
    }

    /// Open a read session observing the current prompt.
    pub async fn read(&self) -> ReadSession<'_> {
        ReadSession {
            guard: self.prompt.read().await,
        }
    }

    /// Open an exclusive write session. Blocks until any other write
    /// session's permit is released.
    pub async fn write(&self) -> WriteSession<'_> {
        let _permit = self.write_permit.lock().await;
        let scratch = self.prompt.read().await.clone();
        WriteSession {
            state: self,
            _permit,
            scratch,
            committed: false,
        }
    }

    /// Token usage recorded by the most recently committed write session
    /// that called [`WriteSession::record_usage`].
    pub async fn latest_token_usage(&self) -> TokenUsage {
        *self.latest_token_usage.read().await
    }

    /// Model bound for this run, if a write session has rebound it.
    pub async fn model(&self) -> Option<String> {
        self.model.read().await.clone()
    }
}

/// Immutable view onto the current prompt.
pub struct ReadSession<'a> {
    guard: RwLockReadGuard<'a, Prompt>,
}

impl<'a> ReadSession<'a> {
    pub fn prompt(&self) -> &Prompt {
        &self.guard
    }

    pub fn messages(&self) -> &[Message] {
        self.guard.messages()
    }
}

/// Exclusive session over a local scratch copy of the prompt, published on
/// [`commit`](WriteSession::commit).
pub struct WriteSession<'a> {
    state: &'a PromptState,
    _permit: MutexGuard<'a, ()>,
    scratch: Prompt,
    committed: bool,
}

impl<'a> WriteSession<'a> {
    /// Replace the prompt outright.
    pub fn rewrite_prompt(&mut self, prompt: Prompt) {
        self.scratch = prompt;
    }

    /// Replace the message list, keeping the rest of the prompt as-is.
    pub fn with_messages(&mut self, messages: Vec<Message>) {
        self.scratch.replace(messages);
    }

    /// Append a message to the end of the scratch prompt.
    pub fn append_prompt(&mut self, message: Message) {
        self.scratch.push(message);
    }

    /// Re-bind the model used for the remainder of this run.
    pub async fn model(&mut self, model: impl Into<String>) {
        *self.state.model.write().await = Some(model.into());
    }

    /// Record the token usage of the response that produced this mutation,
    /// so the next compression-gate check sees it once committed.
    pub fn record_usage(&self, usage: TokenUsage) -> TokenUsage {
        usage
    }

    /// The scratch prompt as mutated so far, for inspection before commit.
    pub fn prompt(&self) -> &Prompt {
        &self.scratch
    }

    /// Publish the scratch prompt back into the shared lock atomically and
    /// optionally update the latest token usage.
    pub async fn commit(mut self, usage: Option<TokenUsage>) -> Result<()> {
        let mut guard = self.state.prompt.write().await;
        *guard = std::mem::take(&mut self.scratch);
        drop(guard);
        if let Some(usage) = usage {
            let usage = self.record_usage(usage);
            *self.state.latest_token_usage.write().await = usage;
        }
        self.committed = true;
        Ok(())
    }
}

impl<'a> Drop for WriteSession<'a> {
    fn drop(&mut self) {
        if !self.committed {
            tracing::warn!("write session dropped without commit; mutation discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm::Message;

    fn prompt_with(messages: Vec<Message>) -> Prompt {
        Prompt::from_messages(messages)
    }

    #[tokio::test]
    async fn write_session_commit_publishes_scratch_copy() {
        let state = PromptState::new(prompt_with(vec![Message::system("you are helpful")]));
        {
            let mut session = state.write().await;
            session.append_prompt(Message::user("hi"));
            session.commit(None).await.unwrap();
        }
        let read = state.read().await;
        assert_eq!(read.messages().len(), 2);
    }

    #[tokio::test]
    async fn dropped_write_session_does_not_publish() {
        let state = PromptState::new(prompt_with(vec![Message::system("sys")]));
        {
            let mut session = state.write().await;
            session.append_prompt(Message::user("discarded"));
            // dropped without commit
        }
        let read = state.read().await;
        assert_eq!(read.messages().len(), 1);
    }

    #[tokio::test]
    async fn commit_updates_latest_token_usage() {
        let state = PromptState::new(prompt_with(vec![]));
        let session = state.write().await;
        session
            .commit(Some(TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }))
            .await
            .unwrap();
        assert_eq!(state.latest_token_usage().await.total_tokens, 15);
    }

    #[tokio::test]
    async fn model_rebind_is_visible_after_write_session() {
        let state = PromptState::new(prompt_with(vec![]));
        {
            let mut session = state.write().await;
            session.model("gpt-4o-mini").await;
            session.commit(None).await.unwrap();
        }
        assert_eq!(state.model().await.as_deref(), Some("gpt-4o-mini"));
    }
}
