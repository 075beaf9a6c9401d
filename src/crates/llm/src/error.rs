use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

/// Failures surfaced across the [`crate::LlmExecutor`] boundary.
///
/// `agent-core` wraps every variant into its own `GraphError::LLMCallFailed`
/// at the call site; this enum exists so executor implementations have a
/// single error type to return instead of reaching for `anyhow`.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("request rejected by provider: {0}")]
    InvalidRequest(String),

    #[error("provider call failed: {0}")]
    Call(String),

    #[error("provider call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("streaming connection failed: {0}")]
    Stream(String),

    #[error("moderation call failed: {0}")]
    Moderation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
