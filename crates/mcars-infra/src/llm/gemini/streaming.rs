//! Gemini SSE payloads to [`StreamEvent`] adapter.
//!
//! With `alt=sse`, every `data:` line of a `streamGenerateContent` response
//! carries a complete [`GeminiResponse`] chunk. The transport layer hands
//! this module the raw data strings; decoding is kept separate so it can be
//! driven from in-memory payloads.

use futures_util::{Stream, StreamExt};

use mcars_core::llm::provider::EventStream;
use mcars_types::llm::{LlmError, StopReason, StreamEvent, Usage};

use super::types::{stop_reason, GeminiResponse};

/// Map a stream of SSE data payloads to a stream of [`StreamEvent`]s.
///
/// The returned stream emits events in this order:
/// 1. `Connected` -- immediately on entry
/// 2. `TextDelta` -- for each chunk carrying visible text
/// 3. `MessageDelta` -- when a chunk carries a `finishReason`
/// 4. `Usage` -- the last reported token usage, once
/// 5. `Done` -- at the end of the stream
///
/// A prompt-level block, or a content-filter finish before any text was
/// produced, ends the stream with [`LlmError::ContentBlocked`].
pub fn map_gemini_stream<S>(payloads: S) -> EventStream
where
    S: Stream<Item = Result<String, LlmError>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        yield Ok(StreamEvent::Connected);

        let mut payloads = Box::pin(payloads);
        let mut state = DecodeState::default();

        while let Some(payload) = payloads.next().await {
            let decoded = payload.and_then(|payload| state.decode(&payload));
            match decoded {
                Ok(events) => {
                    for event in events {
                        yield Ok(event);
                    }
                }
                Err(err) => {
                    yield Err(err);
                    return;
                }
            }
        }

        if let Some(usage) = state.usage.take() {
            yield Ok(StreamEvent::Usage(usage));
        }
        yield Ok(StreamEvent::Done);
    })
}

#[derive(Default)]
struct DecodeState {
    usage: Option<Usage>,
    produced_text: bool,
}

impl DecodeState {
    /// Decode one SSE data payload into zero or more events.
    fn decode(&mut self, payload: &str) -> Result<Vec<StreamEvent>, LlmError> {
        if payload.trim().is_empty() {
            return Ok(Vec::new());
        }

        let chunk: GeminiResponse = serde_json::from_str(payload)
            .map_err(|e| LlmError::Deserialization(format!("gemini stream chunk: {e}")))?;

        if let Some(reason) = chunk.block_reason() {
            return Err(LlmError::ContentBlocked(reason.to_string()));
        }

        let mut events = Vec::new();
        let text = chunk.text();
        if !text.is_empty() {
            self.produced_text = true;
            events.push(StreamEvent::TextDelta { text });
        }

        if let Some(reason) = chunk.finish_reason() {
            let stop_reason = stop_reason(reason);
            if stop_reason == StopReason::ContentFilter && !self.produced_text {
                return Err(LlmError::ContentBlocked(reason.to_string()));
            }
            events.push(StreamEvent::MessageDelta { stop_reason });
        }

        if let Some(reported) = chunk.usage() {
            self.usage = Some(reported);
        }

        Ok(events)
    }
}
