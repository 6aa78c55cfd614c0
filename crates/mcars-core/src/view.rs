//! ConversationView port.
//!
//! The controller never touches markup or terminals directly. Each surface
//! (browser socket, terminal) implements this trait and decides how a bubble
//! handle maps onto its own output.

use mcars_types::chat::ChatMessage;

/// Presentation surface driven by the widget controller.
///
/// Methods are synchronous and infallible: a surface that can no longer
/// deliver output (closed socket, closed terminal) drops the update.
pub trait ConversationView: Send + Sync {
    /// Handle to the content region of an appended bubble.
    type Bubble: Send + Sync;

    /// Render a new bubble and return a handle to its content region.
    fn append(&self, message: &ChatMessage) -> Self::Bubble;

    /// Overwrite the content region of a bubble with the full text.
    ///
    /// Empty text renders the typing indicator.
    fn replace_content(&self, bubble: &Self::Bubble, text: &str);

    fn scroll_to_bottom(&self);

    /// Remove every rendered bubble.
    fn clear(&self);

    fn clear_input(&self);

    fn set_send_enabled(&self, enabled: bool);

    fn set_quick_actions_visible(&self, visible: bool);

    fn set_open(&self, open: bool);
}
