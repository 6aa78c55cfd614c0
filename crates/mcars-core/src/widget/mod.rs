//! The chat widget controller.
//!
//! Owns all mutable widget state (session, busy flag, open flag, request
//! epoch) and drives a [`ConversationView`](crate::view::ConversationView).

pub mod controller;
mod guard;

pub use controller::WidgetController;

/// Where the widget is in its session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No session yet; the greeting has not been shown.
    Uninitialized,
    Active,
}

/// Why a send request was dropped without touching the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyInput,
    Busy,
    UnknownQuickAction,
}

/// Result of one pass through the streaming append loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Ignored(IgnoreReason),
    /// The reply streamed to the end; `text` is the final bubble content.
    Completed { text: String },
    /// The stream failed; the bubble shows the fallback message.
    Failed { error: String },
    /// The conversation was reset or shut down mid-stream.
    Orphaned,
}
