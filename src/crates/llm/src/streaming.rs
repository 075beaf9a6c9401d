use crate::response::UsageMetadata;
use std::pin::Pin;
use tokio_stream::Stream;

/// One unit of a streamed response (`§6 EXTERNAL INTERFACES: executeStreaming`).
///
/// Frames arrive in order; an executor may only reorder fragments that
/// belong to different tool-call ids relative to each other, never within
/// one id.
#[derive(Debug, Clone)]
pub enum MessageChunk {
    ContentDelta { text: String },
    ToolCallStart { id: String, name: String },
    ToolCallArgDelta { id: String, fragment: String },
    ToolCallEnd { id: String },
    Error { message: String },
    Finish { usage: Option<UsageMetadata> },
}

/// Boxed stream of [`MessageChunk`]s, the return type of `executeStreaming`.
pub type TokenStream = Pin<Box<dyn Stream<Item = MessageChunk> + Send>>;

/// Wrapper so executor implementations have one named return type rather
/// than leaking the raw `Pin<Box<dyn Stream<..>>>` alias at every call site.
pub struct ChatStreamResponse {
    pub stream: TokenStream,
}

impl ChatStreamResponse {
    pub fn new(stream: TokenStream) -> Self {
        Self { stream }
    }
}

impl std::fmt::Debug for ChatStreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStreamResponse").finish_non_exhaustive()
    }
}
