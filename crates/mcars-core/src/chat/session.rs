//! The chat session handle.
//!
//! Wraps a provider with the fixed [`SessionConfig`] and a client-side
//! conversation history. Each call to [`ChatSession::send_message_stream`]
//! sends the whole history plus the new user turn and yields the reply as
//! a stream of [`Fragment`]s. A turn is recorded in the history only after
//! its reply finished streaming.

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::{Stream, StreamExt};
use tracing::debug;
use uuid::Uuid;

use mcars_types::chat::Fragment;
use mcars_types::config::SessionConfig;
use mcars_types::llm::{CompletionRequest, LlmError, Message, MessageRole, StreamEvent};

use crate::llm::box_provider::BoxLlmProvider;

/// Boxed stream of reply fragments, in arrival order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, LlmError>> + Send + 'static>>;

/// An ongoing model conversation.
///
/// Cheap to share behind an `Arc`. Replacing the session (on reset) simply
/// drops the old value; nothing is deleted on the remote side.
pub struct ChatSession {
    id: Uuid,
    provider: Arc<BoxLlmProvider>,
    config: SessionConfig,
    history: Arc<Mutex<Vec<Message>>>,
}

impl ChatSession {
    /// Create a session with an empty history.
    pub fn new(provider: Arc<BoxLlmProvider>, config: SessionConfig) -> Self {
        let id = Uuid::now_v7();
        debug!(session_id = %id, model = %config.model, "Chat session created");
        Self {
            id,
            provider,
            config,
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Snapshot of the recorded conversation turns.
    pub fn history(&self) -> Vec<Message> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Submit a user message and stream the reply.
    ///
    /// Provider errors are yielded as `Err` items; the stream ends after
    /// the first error. Empty text deltas are passed through unchanged.
    pub fn send_message_stream(&self, text: &str) -> FragmentStream {
        let user_turn = Message {
            role: MessageRole::User,
            content: text.to_string(),
        };
        let request = self.build_request(&user_turn);
        let mut events = self.provider.stream(request);
        let history = Arc::clone(&self.history);
        let session_id = self.id;

        Box::pin(async_stream::stream! {
            let mut reply = String::new();

            while let Some(event) = events.next().await {
                match event {
                    Ok(StreamEvent::TextDelta { text }) => {
                        reply.push_str(&text);
                        yield Ok(Fragment { text });
                    }
                    Ok(StreamEvent::Done) => break,
                    Ok(_) => {}
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }

            if reply.is_empty() {
                debug!(session_id = %session_id, "Empty reply, turn not recorded");
                return;
            }

            let mut turns = history.lock().unwrap_or_else(PoisonError::into_inner);
            turns.push(user_turn);
            turns.push(Message {
                role: MessageRole::Assistant,
                content: reply,
            });
            debug!(session_id = %session_id, turns = turns.len(), "Turn recorded");
        })
    }

    fn build_request(&self, user_turn: &Message) -> CompletionRequest {
        let mut messages = self.history();
        messages.push(user_turn.clone());

        CompletionRequest {
            model: self.config.model.clone(),
            messages,
            system: Some(self.config.system_instruction.clone()),
            temperature: self.config.temperature,
            max_tokens: self.config.max_output_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::{EventStream, LlmProvider};
    use mcars_types::llm::CompletionResponse;

    /// Replays a scripted stream and remembers every request it saw.
    struct ScriptedProvider {
        script: Vec<Result<StreamEvent, String>>,
        requests: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<StreamEvent, String>>) -> Self {
            Self {
                script,
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }

        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            Err(LlmError::InvalidRequest("not scripted".to_string()))
        }

        fn stream(&self, request: CompletionRequest) -> EventStream {
            self.requests.lock().unwrap().push(request);
            let script = self.script.clone();
            Box::pin(async_stream::stream! {
                for item in script {
                    yield item.map_err(LlmError::Stream);
                }
            })
        }
    }

    fn delta(text: &str) -> Result<StreamEvent, String> {
        Ok(StreamEvent::TextDelta {
            text: text.to_string(),
        })
    }

    fn session_with(script: Vec<Result<StreamEvent, String>>) -> (ChatSession, Arc<Mutex<Vec<CompletionRequest>>>) {
        let provider = ScriptedProvider::new(script);
        let requests = Arc::clone(&provider.requests);
        let session = ChatSession::new(
            Arc::new(BoxLlmProvider::new(provider)),
            SessionConfig::default(),
        );
        (session, requests)
    }

    async fn collect(stream: FragmentStream) -> Vec<Result<Fragment, LlmError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_fragments_follow_text_deltas_in_order() {
        let (session, _) = session_with(vec![
            Ok(StreamEvent::Connected),
            delta("Hi"),
            delta(""),
            delta(" there!"),
            Ok(StreamEvent::Done),
        ]);

        let items = collect(session.send_message_stream("Hello")).await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap().text).collect();
        assert_eq!(texts, vec!["Hi", "", " there!"]);
    }

    #[tokio::test]
    async fn test_request_carries_session_config() {
        let (session, requests) = session_with(vec![delta("ok"), Ok(StreamEvent::Done)]);
        let _ = collect(session.send_message_stream("Hello")).await;

        let requests = requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.model, "gemini-3-flash-preview");
        assert_eq!(request.temperature, Some(0.7));
        assert!(request.system.as_deref().unwrap().contains("MCARS PH"));
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].content, "Hello");
    }

    #[tokio::test]
    async fn test_successful_turn_is_recorded_and_sent_next_time() {
        let (session, requests) = session_with(vec![delta("Sure"), Ok(StreamEvent::Done)]);

        let _ = collect(session.send_message_stream("first")).await;
        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].content, "Sure");

        let _ = collect(session.send_message_stream("second")).await;
        let requests = requests.lock().unwrap();
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(requests[1].messages[2].content, "second");
    }

    #[tokio::test]
    async fn test_error_ends_stream_and_skips_history() {
        let (session, _) = session_with(vec![
            delta("Sure, "),
            Err("connection reset".to_string()),
            delta("never seen"),
        ]);

        let items = collect(session.send_message_stream("Hello")).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().text, "Sure, ");
        assert!(matches!(items[1], Err(LlmError::Stream(_))));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_empty_reply_is_not_recorded() {
        let (session, _) = session_with(vec![Ok(StreamEvent::Done)]);
        let items = collect(session.send_message_stream("Hello")).await;
        assert!(items.is_empty());
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        let (a, _) = session_with(vec![]);
        let (b, _) = session_with(vec![]);
        assert_ne!(a.id(), b.id());
    }
}
