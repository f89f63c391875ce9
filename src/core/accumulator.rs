//! Folds a stream of text fragments into the assistant's reply.

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::api::ChatChunk;
use crate::core::backend::BackendError;

/// Running concatenation of the fragments seen so far.
///
/// Every accepted fragment produces a new display value equal to the
/// concatenation of all fragments up to and including it. Empty fragments
/// and chunks without text are no-ops and produce no display update.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StreamAccumulator {
    text: String,
    fragments: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &str) -> Option<&str> {
        if fragment.is_empty() {
            return None;
        }
        self.text.push_str(fragment);
        self.fragments += 1;
        Some(&self.text)
    }

    pub fn apply(&mut self, chunk: &ChatChunk) -> Option<&str> {
        self.push(chunk.text()?)
    }

    pub fn display(&self) -> &str {
        &self.text
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// How the fragment stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Completed,
    Failed(BackendError),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Everything received before termination; possibly empty.
    pub text: String,
    pub fragments: usize,
    pub termination: Termination,
}

/// Drains `stream`, calling `on_display` with the full accumulated text after
/// each fragment. The stream ends on a `done` chunk, on exhaustion, on the
/// first error, or when `cancel` fires.
pub async fn accumulate<S, F>(
    mut stream: S,
    cancel: &CancellationToken,
    mut on_display: F,
) -> StreamOutcome
where
    S: Stream<Item = Result<ChatChunk, BackendError>> + Unpin,
    F: FnMut(&str),
{
    let mut acc = StreamAccumulator::new();
    let termination = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            next = stream.next() => Some(next),
        };
        let Some(next) = next else {
            break Termination::Cancelled;
        };
        match next {
            Some(Ok(chunk)) => {
                if let Some(display) = acc.apply(&chunk) {
                    on_display(display);
                }
                if chunk.done {
                    break Termination::Completed;
                }
            }
            Some(Err(err)) => break Termination::Failed(err),
            None => break Termination::Completed,
        }
    };

    StreamOutcome {
        fragments: acc.fragments(),
        text: acc.into_text(),
        termination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn fragments(parts: &[&str]) -> Vec<Result<ChatChunk, BackendError>> {
        parts.iter().map(|p| Ok(ChatChunk::fragment(p))).collect()
    }

    #[tokio::test]
    async fn displays_are_running_concatenations() {
        let mut displays = Vec::new();
        let outcome = accumulate(
            stream::iter(fragments(&["Hel", "lo, ", "world"])),
            &CancellationToken::new(),
            |text| displays.push(text.to_string()),
        )
        .await;

        assert_eq!(displays, ["Hel", "Hello, ", "Hello, world"]);
        assert_eq!(outcome.text, "Hello, world");
        assert_eq!(outcome.fragments, 3);
        assert_eq!(outcome.termination, Termination::Completed);
    }

    #[tokio::test]
    async fn empty_and_textless_chunks_do_not_update_display() {
        let mut items = fragments(&["a", "", "b"]);
        items.insert(1, Ok(ChatChunk::default()));
        let mut displays = Vec::new();
        let outcome = accumulate(stream::iter(items), &CancellationToken::new(), |text| {
            displays.push(text.to_string())
        })
        .await;

        assert_eq!(displays, ["a", "ab"]);
        assert_eq!(outcome.fragments, 2);
    }

    #[tokio::test]
    async fn done_chunk_stops_reading() {
        let mut items = fragments(&["one"]);
        items.push(Ok(ChatChunk {
            done: true,
            ..Default::default()
        }));
        items.extend(fragments(&["ignored"]));

        let outcome = accumulate(stream::iter(items), &CancellationToken::new(), |_| {}).await;
        assert_eq!(outcome.text, "one");
        assert_eq!(outcome.termination, Termination::Completed);
    }

    #[tokio::test]
    async fn failure_keeps_partial_text() {
        let mut items = fragments(&["Par", "tial"]);
        items.push(Err(BackendError::Stream("connection reset".into())));

        let outcome = accumulate(stream::iter(items), &CancellationToken::new(), |_| {}).await;
        assert_eq!(outcome.text, "Partial");
        assert_eq!(
            outcome.termination,
            Termination::Failed(BackendError::Stream("connection reset".into()))
        );
    }

    #[tokio::test]
    async fn failure_before_any_fragment_yields_empty_text() {
        let items = vec![Err(BackendError::Remote("boom".into()))];
        let outcome = accumulate(stream::iter(items), &CancellationToken::new(), |_| {}).await;
        assert_eq!(outcome.text, "");
        assert_eq!(outcome.fragments, 0);
        assert!(matches!(outcome.termination, Termination::Failed(_)));
    }

    #[tokio::test]
    async fn cancellation_stops_a_stalled_stream() {
        let cancel = CancellationToken::new();
        let stalled = stream::iter(fragments(&["waiting"])).chain(stream::pending());
        let trigger = cancel.clone();

        let outcome = accumulate(stalled, &cancel, move |_| trigger.cancel()).await;
        assert_eq!(outcome.text, "waiting");
        assert_eq!(outcome.termination, Termination::Cancelled);
    }

    #[test]
    fn accumulator_reports_new_display_only_for_real_fragments() {
        let mut acc = StreamAccumulator::new();
        assert_eq!(acc.push(""), None);
        assert_eq!(acc.push("x"), Some("x"));
        assert_eq!(acc.push("y"), Some("xy"));
        assert_eq!(acc.display(), "xy");
        assert_eq!(acc.fragments(), 2);
    }
}
