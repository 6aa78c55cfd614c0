//! WidgetController: the streaming append loop and session lifecycle.
//!
//! One controller drives one conversation view. All state that a browser
//! widget would keep in globals lives in [`WidgetState`] behind a mutex;
//! the busy flag is a separate atomic so a second send can be rejected
//! without waiting on the lock.
//!
//! Every write into an assistant bubble is made under the state lock after
//! checking that the request's epoch is still current. A reset bumps the
//! epoch and cancels the request token, so a stream that outlives its
//! session can never write into the cleared transcript.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use mcars_types::chat::ChatMessage;
use mcars_types::config::{QuickAction, WidgetConfig};

use super::guard::BusyGuard;
use super::{IgnoreReason, Lifecycle, SendOutcome};
use crate::chat::session::ChatSession;
use crate::llm::box_provider::BoxLlmProvider;
use crate::view::ConversationView;

struct WidgetState {
    lifecycle: Lifecycle,
    open: bool,
    session: Option<Arc<ChatSession>>,
    epoch: u64,
    cancel: CancellationToken,
}

/// Controller for a single chat widget instance.
pub struct WidgetController<V: ConversationView> {
    provider: Arc<BoxLlmProvider>,
    config: Arc<WidgetConfig>,
    view: V,
    busy: AtomicBool,
    state: Mutex<WidgetState>,
}

impl<V: ConversationView> WidgetController<V> {
    pub fn new(provider: Arc<BoxLlmProvider>, config: Arc<WidgetConfig>, view: V) -> Self {
        Self {
            provider,
            config,
            view,
            busy: AtomicBool::new(false),
            state: Mutex::new(WidgetState {
                lifecycle: Lifecycle::Uninitialized,
                open: false,
                session: None,
                epoch: 0,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Whether a request is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn is_open(&self) -> bool {
        self.lock_state().open
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lock_state().lifecycle
    }

    pub fn quick_actions(&self) -> &[QuickAction] {
        &self.config.quick_actions
    }

    /// Show the widget. The first open creates the session and greets.
    pub fn open(&self) {
        let mut state = self.lock_state();
        if state.open {
            return;
        }
        state.open = true;
        self.view.set_open(true);

        if state.lifecycle == Lifecycle::Uninitialized {
            let session = self.new_session();
            info!(session_id = %session.id(), "Widget opened, session started");
            state.session = Some(session);
            state.lifecycle = Lifecycle::Active;
            self.view.append(&ChatMessage::assistant(self.config.greeting.as_str()));
            self.view.scroll_to_bottom();
        }
    }

    pub fn close(&self) {
        let mut state = self.lock_state();
        if !state.open {
            return;
        }
        state.open = false;
        self.view.set_open(false);
    }

    /// Flip the open state and return the new value.
    pub fn toggle(&self) -> bool {
        if self.is_open() {
            self.close();
            false
        } else {
            self.open();
            true
        }
    }

    /// Send user text through the active session and stream the reply.
    ///
    /// Empty input and sends while busy are dropped without touching the
    /// view. Provider failures never escape: the assistant bubble shows
    /// the fallback message and the outcome reports `Failed`.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Ignored(IgnoreReason::EmptyInput);
        }

        let Some(_guard) = BusyGuard::acquire(&self.busy, &self.view) else {
            debug!("Send dropped, request already in flight");
            return SendOutcome::Ignored(IgnoreReason::Busy);
        };

        let (session, epoch, cancel, bubble) = {
            let mut state = self.lock_state();
            let session = match &state.session {
                Some(session) => Arc::clone(session),
                None => {
                    let session = self.new_session();
                    state.session = Some(Arc::clone(&session));
                    state.lifecycle = Lifecycle::Active;
                    session
                }
            };

            self.view.append(&ChatMessage::user(text));
            self.view.clear_input();
            self.view.set_quick_actions_visible(false);
            let bubble = self.view.append(&ChatMessage::assistant(""));
            self.view.scroll_to_bottom();

            (session, state.epoch, state.cancel.clone(), bubble)
        };

        debug!(session_id = %session.id(), chars = text.len(), "Sending message");
        let mut fragments = session.send_message_stream(text);
        let mut buffer = String::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(session_id = %session.id(), "Stream orphaned by reset");
                    return SendOutcome::Orphaned;
                }
                next = fragments.next() => next,
            };

            match next {
                Some(Ok(fragment)) => {
                    buffer.push_str(&fragment.text);
                    if !self.write_if_current(epoch, &bubble, &buffer) {
                        return SendOutcome::Orphaned;
                    }
                }
                Some(Err(err)) => {
                    warn!(
                        session_id = %session.id(),
                        error = %err,
                        partial_chars = buffer.len(),
                        "Reply stream failed, showing fallback"
                    );
                    if !self.write_if_current(epoch, &bubble, &self.config.fallback_message) {
                        return SendOutcome::Orphaned;
                    }
                    return SendOutcome::Failed {
                        error: err.to_string(),
                    };
                }
                None => break,
            }
        }

        debug!(session_id = %session.id(), chars = buffer.len(), "Reply complete");
        SendOutcome::Completed { text: buffer }
    }

    /// Send the pre-filled query of the quick action at `index`.
    pub async fn send_quick_action(&self, index: usize) -> SendOutcome {
        match self.config.quick_actions.get(index) {
            Some(action) => {
                let query = action.query.clone();
                self.send(&query).await
            }
            None => SendOutcome::Ignored(IgnoreReason::UnknownQuickAction),
        }
    }

    /// Discard the session and transcript and start over.
    ///
    /// Any in-flight stream is orphaned: it stops at its next fragment and
    /// never writes into the new transcript.
    pub fn reset(&self) {
        let mut state = self.lock_state();
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
        state.epoch += 1;

        self.view.clear();
        let session = self.new_session();
        info!(session_id = %session.id(), epoch = state.epoch, "Conversation reset");
        state.session = Some(session);
        state.lifecycle = Lifecycle::Active;

        self.view
            .append(&ChatMessage::assistant(self.config.reset_message.as_str()));
        self.view.set_quick_actions_visible(true);
        self.view.scroll_to_bottom();
    }

    /// Stop any in-flight stream before the view goes away.
    pub fn shutdown(&self) {
        let mut state = self.lock_state();
        state.cancel.cancel();
        state.epoch += 1;
        debug!(epoch = state.epoch, "Widget shut down");
    }

    fn write_if_current(&self, epoch: u64, bubble: &V::Bubble, text: &str) -> bool {
        let state = self.lock_state();
        if state.epoch != epoch {
            return false;
        }
        self.view.replace_content(bubble, text);
        self.view.scroll_to_bottom();
        true
    }

    fn new_session(&self) -> Arc<ChatSession> {
        Arc::new(ChatSession::new(
            Arc::clone(&self.provider),
            self.config.session.clone(),
        ))
    }

    fn lock_state(&self) -> MutexGuard<'_, WidgetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use tokio::sync::mpsc;

    use mcars_types::chat::MessageRole;
    use mcars_types::config::DEFAULT_FALLBACK_MESSAGE;
    use mcars_types::llm::{
        CompletionRequest, CompletionResponse, LlmError, StreamEvent,
    };

    use crate::llm::provider::{EventStream, LlmProvider};

    type Item = Result<StreamEvent, LlmError>;

    /// Each `stream` call takes the next queued channel; the test feeds it.
    struct ChannelProvider {
        receivers: Mutex<VecDeque<mpsc::UnboundedReceiver<Item>>>,
        requests: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl LlmProvider for ChannelProvider {
        fn name(&self) -> &str {
            "channel"
        }

        fn model(&self) -> &str {
            "channel-1"
        }

        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            Err(LlmError::InvalidRequest("streaming only".to_string()))
        }

        fn stream(&self, request: CompletionRequest) -> EventStream {
            self.requests.lock().unwrap().push(request);
            let receiver = self.receivers.lock().unwrap().pop_front();
            Box::pin(async_stream::stream! {
                let Some(mut receiver) = receiver else {
                    return;
                };
                while let Some(item) = receiver.recv().await {
                    yield item;
                }
            })
        }
    }

    #[derive(Default)]
    struct Recorded {
        bubbles: Vec<(MessageRole, String)>,
        send_enabled: Vec<bool>,
        quick_actions_visible: Option<bool>,
        open: Option<bool>,
        inputs_cleared: usize,
        clears: usize,
    }

    #[derive(Default)]
    struct RecordingView(Mutex<Recorded>);

    impl RecordingView {
        fn bubbles(&self) -> Vec<(MessageRole, String)> {
            self.0.lock().unwrap().bubbles.clone()
        }

        fn send_enabled(&self) -> Vec<bool> {
            self.0.lock().unwrap().send_enabled.clone()
        }
    }

    impl ConversationView for RecordingView {
        type Bubble = usize;

        fn append(&self, message: &ChatMessage) -> usize {
            let mut rec = self.0.lock().unwrap();
            rec.bubbles.push((message.role, message.text.clone()));
            rec.bubbles.len() - 1
        }

        fn replace_content(&self, bubble: &usize, text: &str) {
            let mut rec = self.0.lock().unwrap();
            if let Some(entry) = rec.bubbles.get_mut(*bubble) {
                entry.1 = text.to_string();
            }
        }

        fn scroll_to_bottom(&self) {}

        fn clear(&self) {
            let mut rec = self.0.lock().unwrap();
            rec.bubbles.clear();
            rec.clears += 1;
        }

        fn clear_input(&self) {
            self.0.lock().unwrap().inputs_cleared += 1;
        }

        fn set_send_enabled(&self, enabled: bool) {
            self.0.lock().unwrap().send_enabled.push(enabled);
        }

        fn set_quick_actions_visible(&self, visible: bool) {
            self.0.lock().unwrap().quick_actions_visible = Some(visible);
        }

        fn set_open(&self, open: bool) {
            self.0.lock().unwrap().open = Some(open);
        }
    }

    struct Harness {
        controller: Arc<WidgetController<RecordingView>>,
        senders: VecDeque<mpsc::UnboundedSender<Item>>,
        requests: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl Harness {
        /// Controller whose provider serves `streams` replies, in order.
        fn new(streams: usize) -> Self {
            let mut senders = VecDeque::new();
            let mut receivers = VecDeque::new();
            for _ in 0..streams {
                let (tx, rx) = mpsc::unbounded_channel();
                senders.push_back(tx);
                receivers.push_back(rx);
            }
            let requests = Arc::new(Mutex::new(Vec::new()));
            let provider = ChannelProvider {
                receivers: Mutex::new(receivers),
                requests: Arc::clone(&requests),
            };
            let controller = Arc::new(WidgetController::new(
                Arc::new(BoxLlmProvider::new(provider)),
                Arc::new(WidgetConfig::default()),
                RecordingView::default(),
            ));
            Self {
                controller,
                senders,
                requests,
            }
        }

        /// Queue a complete reply on the next stream.
        fn script(&mut self, items: Vec<Item>) {
            let tx = self.senders.pop_front().expect("no stream left");
            for item in items {
                tx.send(item).unwrap();
            }
        }

        fn bubbles(&self) -> Vec<(MessageRole, String)> {
            self.controller.view().bubbles()
        }
    }

    fn delta(text: &str) -> Item {
        Ok(StreamEvent::TextDelta {
            text: text.to_string(),
        })
    }

    async fn wait_until_busy(controller: &WidgetController<RecordingView>) {
        while !controller.is_busy() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_empty_and_whitespace_input_is_ignored() {
        let harness = Harness::new(0);

        for input in ["", "   ", "\n\t "] {
            assert_eq!(
                harness.controller.send(input).await,
                SendOutcome::Ignored(IgnoreReason::EmptyInput)
            );
        }

        assert!(harness.bubbles().is_empty());
        assert!(harness.controller.view().send_enabled().is_empty());
        assert!(harness.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fragments_concatenate_into_final_text() {
        let mut harness = Harness::new(1);
        harness.script(vec![delta("Hi"), delta(""), delta(" there!"), Ok(StreamEvent::Done)]);

        let outcome = harness.controller.send("Hello").await;

        assert_eq!(
            outcome,
            SendOutcome::Completed {
                text: "Hi there!".to_string()
            }
        );
        assert_eq!(
            harness.bubbles(),
            vec![
                (MessageRole::User, "Hello".to_string()),
                (MessageRole::Assistant, "Hi there!".to_string()),
            ]
        );
        assert_eq!(harness.controller.view().send_enabled(), vec![false, true]);
        assert!(!harness.controller.is_busy());
    }

    #[tokio::test]
    async fn test_input_is_trimmed_and_field_cleared() {
        let mut harness = Harness::new(1);
        harness.script(vec![delta("ok")]);

        harness.controller.send("  Hello  ").await;

        assert_eq!(harness.bubbles()[0].1, "Hello");
        let rec = harness.controller.view().0.lock().unwrap();
        assert_eq!(rec.inputs_cleared, 1);
        assert_eq!(rec.quick_actions_visible, Some(false));
    }

    #[tokio::test]
    async fn test_failure_after_partial_reply_shows_fallback() {
        let mut harness = Harness::new(1);
        harness.script(vec![
            delta("Sure, "),
            Err(LlmError::Stream("connection reset".to_string())),
        ]);

        let outcome = harness.controller.send("Hello").await;

        assert!(matches!(outcome, SendOutcome::Failed { .. }));
        assert_eq!(harness.bubbles()[1].1, DEFAULT_FALLBACK_MESSAGE);
        assert_eq!(harness.controller.view().send_enabled(), vec![false, true]);
    }

    #[tokio::test]
    async fn test_immediate_failure_releases_guard() {
        let mut harness = Harness::new(2);
        harness.script(vec![Err(LlmError::AuthenticationFailed)]);
        harness.script(vec![delta("Back online")]);

        let first = harness.controller.send("Hello").await;
        assert!(matches!(first, SendOutcome::Failed { .. }));
        assert_eq!(harness.bubbles().len(), 2);
        assert_eq!(harness.bubbles()[1].1, DEFAULT_FALLBACK_MESSAGE);

        let second = harness.controller.send("Again").await;
        assert_eq!(
            second,
            SendOutcome::Completed {
                text: "Back online".to_string()
            }
        );
        assert_eq!(
            harness.controller.view().send_enabled(),
            vec![false, true, false, true]
        );
    }

    #[tokio::test]
    async fn test_send_while_busy_is_dropped() {
        let mut harness = Harness::new(2);
        let tx = harness.senders.pop_front().unwrap();

        let controller = Arc::clone(&harness.controller);
        let first = tokio::spawn(async move { controller.send("Hello").await });
        wait_until_busy(&harness.controller).await;

        assert_eq!(
            harness.controller.send("Again").await,
            SendOutcome::Ignored(IgnoreReason::Busy)
        );

        tx.send(delta("Hi")).unwrap();
        drop(tx);
        assert_eq!(
            first.await.unwrap(),
            SendOutcome::Completed {
                text: "Hi".to_string()
            }
        );

        let users = harness
            .bubbles()
            .iter()
            .filter(|(role, _)| *role == MessageRole::User)
            .count();
        assert_eq!(users, 1);
        assert_eq!(harness.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_typing_bubble_grows_monotonically() {
        let mut harness = Harness::new(1);
        let tx = harness.senders.pop_front().unwrap();

        let controller = Arc::clone(&harness.controller);
        let task = tokio::spawn(async move { controller.send("Hello").await });
        wait_until_busy(&harness.controller).await;
        assert_eq!(harness.bubbles()[1], (MessageRole::Assistant, String::new()));

        tx.send(delta("Sure")).unwrap();
        while harness.bubbles()[1].1.is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(harness.bubbles()[1].1, "Sure");

        tx.send(delta("!")).unwrap();
        drop(tx);
        task.await.unwrap();
        assert_eq!(harness.bubbles()[1].1, "Sure!");
    }

    #[tokio::test]
    async fn test_greeting_only_on_first_open() {
        let harness = Harness::new(0);
        assert_eq!(harness.controller.lifecycle(), Lifecycle::Uninitialized);

        assert!(harness.controller.toggle());
        assert_eq!(harness.controller.lifecycle(), Lifecycle::Active);
        assert!(!harness.controller.toggle());
        assert!(harness.controller.toggle());
        harness.controller.open();

        let bubbles = harness.bubbles();
        assert_eq!(bubbles.len(), 1);
        assert_eq!(bubbles[0].0, MessageRole::Assistant);
        assert!(bubbles[0].1.contains("MCARS PH AI Assistant"));
        assert_eq!(harness.controller.view().0.lock().unwrap().open, Some(true));
    }

    #[tokio::test]
    async fn test_send_before_open_skips_greeting() {
        let mut harness = Harness::new(1);
        harness.script(vec![delta("Hi")]);

        harness.controller.send("Hello").await;
        harness.controller.open();

        assert_eq!(harness.bubbles().len(), 2);
        assert_eq!(harness.controller.lifecycle(), Lifecycle::Active);
    }

    #[tokio::test]
    async fn test_reset_while_idle() {
        let mut harness = Harness::new(1);
        harness.script(vec![delta("Hi")]);
        harness.controller.open();
        harness.controller.send("Hello").await;

        harness.controller.reset();

        assert_eq!(
            harness.bubbles(),
            vec![(
                MessageRole::Assistant,
                mcars_types::config::DEFAULT_RESET_MESSAGE.to_string()
            )]
        );
        let rec = harness.controller.view().0.lock().unwrap();
        assert_eq!(rec.clears, 1);
        assert_eq!(rec.quick_actions_visible, Some(true));
    }

    #[tokio::test]
    async fn test_reset_uses_same_session_config() {
        let mut harness = Harness::new(2);
        harness.script(vec![delta("one")]);
        harness.script(vec![delta("two")]);

        harness.controller.send("before").await;
        harness.controller.reset();
        harness.controller.send("after").await;

        let requests = harness.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].temperature, requests[1].temperature);
        assert_eq!(requests[1].temperature, Some(0.7));
        assert_eq!(requests[0].system, requests[1].system);
        assert_eq!(requests[0].model, requests[1].model);
        // The new session starts without the previous turn.
        assert_eq!(requests[1].messages.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_orphans_in_flight_stream() {
        let mut harness = Harness::new(1);
        let tx = harness.senders.pop_front().unwrap();

        let controller = Arc::clone(&harness.controller);
        let task = tokio::spawn(async move { controller.send("Hello").await });
        wait_until_busy(&harness.controller).await;

        harness.controller.reset();
        let _ = tx.send(delta("late fragment"));

        assert_eq!(task.await.unwrap(), SendOutcome::Orphaned);
        assert_eq!(
            harness.bubbles(),
            vec![(
                MessageRole::Assistant,
                mcars_types::config::DEFAULT_RESET_MESSAGE.to_string()
            )]
        );
        assert!(!harness.controller.is_busy());
    }

    #[tokio::test]
    async fn test_shutdown_stops_hung_stream() {
        let mut harness = Harness::new(1);
        let tx = harness.senders.pop_front().unwrap();

        let controller = Arc::clone(&harness.controller);
        let task = tokio::spawn(async move { controller.send("Hello").await });
        wait_until_busy(&harness.controller).await;

        harness.controller.shutdown();

        assert_eq!(task.await.unwrap(), SendOutcome::Orphaned);
        assert_eq!(harness.bubbles()[1].1, "");
        assert_eq!(harness.controller.view().send_enabled(), vec![false, true]);
        drop(tx);
    }

    #[tokio::test]
    async fn test_quick_action_sends_query() {
        let mut harness = Harness::new(1);
        harness.script(vec![delta("1-3 business days")]);

        let outcome = harness.controller.send_quick_action(1).await;

        assert!(matches!(outcome, SendOutcome::Completed { .. }));
        assert_eq!(
            harness.bubbles()[0].1,
            "How long does shipping take within the Philippines?"
        );
        assert_eq!(
            harness.controller.send_quick_action(9).await,
            SendOutcome::Ignored(IgnoreReason::UnknownQuickAction)
        );
    }
}
