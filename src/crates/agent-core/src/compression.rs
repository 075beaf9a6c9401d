//! History compression policies (C10).
//!
//! Each variant is a pure function over a message slice, grounded on the
//! teacher's `trim_messages`: extract the leading system message (if any),
//! apply the policy's windowing, then reattach the system message at the
//! front. Every policy preserves it and is idempotent on its own output.

use llm::{Message, MessageRole};

/// `name` tag stamped on a message synthesized by [`CompressionPolicy::Chunked`]
/// so a later pass recognizes it as already-summarized and leaves it alone —
/// the mechanism that makes `Chunked` idempotent despite actually rewriting
/// history instead of just windowing it.
const CHUNK_SUMMARY_MARKER: &str = "chunk_summary";

/// A named compression strategy for prompt history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionPolicy {
    /// No compression; returns the input unchanged (beyond the
    /// system-message invariant, which already holds).
    WholeHistory,
    /// Like `WholeHistory`, but explicitly tolerates more than one leading
    /// system message (the teacher's single-system-message assumption
    /// relaxed for multi-system-message prompts).
    WholeHistoryMultipleSystemMessages,
    /// Keep only the last `n` non-system messages.
    FromLastN(usize),
    /// Keep only non-system messages at or after `timestamp` (epoch millis).
    /// Messages without a timestamp are kept (compression can't judge them).
    FromTimestamp(i64),
    /// Fold every run of `size` consecutive non-system messages into one
    /// synthesized summary message, leaving a trailing partial run verbatim.
    /// Already-summarized messages are passed through rather than re-folded,
    /// so repeated application converges instead of compounding.
    Chunked(usize),
}

impl CompressionPolicy {
    /// Apply this policy to `messages`, always preserving the leading
    /// system message.
    pub fn compress(&self, messages: &[Message]) -> Vec<Message> {
        let (system, rest) = split_leading_system(messages, self.preserves_multiple_system());

        let windowed: Vec<Message> = match self {
            CompressionPolicy::WholeHistory | CompressionPolicy::WholeHistoryMultipleSystemMessages => {
                rest.to_vec()
            }
            CompressionPolicy::FromLastN(n) => {
                let n = *n;
                if rest.len() > n {
                    rest[rest.len() - n..].to_vec()
                } else {
                    rest.to_vec()
                }
            }
            CompressionPolicy::Chunked(size) => chunk_compress(rest, (*size).max(1)),
            CompressionPolicy::FromTimestamp(cutoff) => rest
                .iter()
                .filter(|m| m.metadata.timestamp.map(|ts| ts >= *cutoff).unwrap_or(true))
                .cloned()
                .collect(),
        };

        let mut result = system;
        result.extend(windowed);
        result
    }

    fn preserves_multiple_system(&self) -> bool {
        matches!(self, CompressionPolicy::WholeHistoryMultipleSystemMessages)
    }
}

fn is_chunk_summary(message: &Message) -> bool {
    message.name.as_deref() == Some(CHUNK_SUMMARY_MARKER)
}

/// Folds every maximal run of non-summary messages into chunks of `size`,
/// summarizing each full chunk and leaving the trailing partial run (and any
/// already-summarized messages) untouched.
fn chunk_compress(rest: &[Message], size: usize) -> Vec<Message> {
    let mut out = Vec::with_capacity(rest.len());
    let mut buffer: Vec<Message> = Vec::new();

    let mut flush = |buffer: &mut Vec<Message>, out: &mut Vec<Message>| {
        for chunk in buffer.chunks(size) {
            if chunk.len() == size {
                out.push(summarize_chunk(chunk));
            } else {
                out.extend_from_slice(chunk);
            }
        }
        buffer.clear();
    };

    for message in rest {
        if is_chunk_summary(message) {
            flush(&mut buffer, &mut out);
            out.push(message.clone());
        } else {
            buffer.push(message.clone());
        }
    }
    flush(&mut buffer, &mut out);

    out
}

/// Synthesizes one summary message standing in for `chunk`, tagged so a
/// later `Chunked` pass recognizes and skips it.
fn summarize_chunk(chunk: &[Message]) -> Message {
    let preview = chunk
        .iter()
        .map(|m| {
            let text = m.content.as_text();
            let snippet: String = text.chars().take(40).collect();
            format!("{:?}: {snippet}", m.role)
        })
        .collect::<Vec<_>>()
        .join(" | ");
    Message::new(
        MessageRole::Assistant,
        format!("[compressed {} messages] {preview}", chunk.len()),
    )
    .with_name(CHUNK_SUMMARY_MARKER)
}

/// Split off the leading system message(s). When `multiple` is false, only
/// the very first message is considered for extraction (mirroring the
/// teacher's single-system-message assumption); when true, every leading
/// contiguous system message is extracted.
fn split_leading_system(messages: &[Message], multiple: bool) -> (Vec<Message>, &[Message]) {
    if messages.is_empty() {
        return (Vec::new(), messages);
    }
    if !multiple {
        return if messages[0].is_system() {
            (vec![messages[0].clone()], &messages[1..])
        } else {
            (Vec::new(), messages)
        };
    }
    let split_at = messages.iter().take_while(|m| m.is_system()).count();
    (messages[..split_at].to_vec(), &messages[split_at..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<Message> {
        vec![
            Message::system("be helpful"),
            Message::user("one"),
            Message::assistant("two"),
            Message::user("three"),
            Message::assistant("four"),
        ]
    }

    #[test]
    fn whole_history_preserves_everything() {
        let compressed = CompressionPolicy::WholeHistory.compress(&history());
        assert_eq!(compressed.len(), history().len());
        assert!(compressed[0].is_system());
    }

    #[test]
    fn from_last_n_keeps_system_plus_window() {
        let compressed = CompressionPolicy::FromLastN(2).compress(&history());
        assert!(compressed[0].is_system());
        assert_eq!(compressed.len(), 3);
    }

    #[test]
    fn compression_is_idempotent() {
        let policy = CompressionPolicy::FromLastN(2);
        let once = policy.compress(&history());
        let twice = policy.compress(&once);
        assert_eq!(once.len(), twice.len());
        assert!(twice[0].is_system());
    }

    #[test]
    fn system_message_survives_aggressive_windowing() {
        let compressed = CompressionPolicy::FromLastN(0).compress(&history());
        assert_eq!(compressed.len(), 1);
        assert!(compressed[0].is_system());
    }

    #[test]
    fn no_system_message_leaves_history_untouched_by_extraction() {
        let messages = vec![Message::user("hi"), Message::assistant("hello")];
        let compressed = CompressionPolicy::FromLastN(1).compress(&messages);
        assert_eq!(compressed.len(), 1);
        assert!(!compressed[0].is_system());
    }

    /// S4: chunked history compression folds full chunks into distinct
    /// summary messages rather than just windowing the tail.
    #[test]
    fn chunked_folds_full_chunks_into_summaries() {
        let compressed = CompressionPolicy::Chunked(2).compress(&history());
        assert!(compressed[0].is_system());
        // 4 non-system messages at chunk size 2 -> two summary messages.
        assert_eq!(compressed.len(), 3);
        assert_eq!(compressed[1].name.as_deref(), Some("chunk_summary"));
        assert_eq!(compressed[2].name.as_deref(), Some("chunk_summary"));
    }

    #[test]
    fn chunked_leaves_a_trailing_partial_run_verbatim() {
        let compressed = CompressionPolicy::Chunked(3).compress(&history());
        assert!(compressed[0].is_system());
        // 4 non-system messages at chunk size 3 -> one summary, one leftover verbatim.
        assert_eq!(compressed.len(), 3);
        assert_eq!(compressed[1].name.as_deref(), Some("chunk_summary"));
        assert_eq!(compressed[2].content.as_text(), "four");
    }

    #[test]
    fn chunked_compression_is_idempotent() {
        let policy = CompressionPolicy::Chunked(2);
        let once = policy.compress(&history());
        let twice = policy.compress(&once);
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.content.as_text(), b.content.as_text());
            assert_eq!(a.name, b.name);
        }
    }
}
