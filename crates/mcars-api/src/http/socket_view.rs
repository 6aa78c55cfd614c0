//! Conversation view that renders into a browser over a WebSocket.
//!
//! Each view call becomes a [`ViewPatch`] pushed onto an unbounded channel.
//! The connection task drains the channel and forwards every patch as one
//! JSON text frame; the page script applies it to the DOM.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::mpsc;

use mcars_core::render::{format_content, render_bubble};
use mcars_core::view::ConversationView;
use mcars_types::chat::{ChatMessage, MessageRole};

/// DOM update sent to the widget page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewPatch {
    /// Append a rendered bubble to the message list.
    Append {
        id: u64,
        role: MessageRole,
        html: String,
    },
    /// Replace the content region of bubble `id`.
    Replace { id: u64, html: String },
    Scroll,
    Clear,
    ClearInput,
    SendEnabled { enabled: bool },
    QuickActions { visible: bool },
    Open { open: bool },
    /// Keep-alive reply to a client `ping`.
    Pong,
}

pub struct SocketView {
    tx: mpsc::UnboundedSender<ViewPatch>,
    next_id: AtomicU64,
}

impl SocketView {
    pub fn new(tx: mpsc::UnboundedSender<ViewPatch>) -> Self {
        Self {
            tx,
            next_id: AtomicU64::new(0),
        }
    }

    fn push(&self, patch: ViewPatch) {
        if self.tx.send(patch).is_err() {
            tracing::trace!("Widget socket closed, dropping view patch");
        }
    }
}

impl ConversationView for SocketView {
    type Bubble = u64;

    fn append(&self, message: &ChatMessage) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.push(ViewPatch::Append {
            id,
            role: message.role,
            html: render_bubble(message),
        });
        id
    }

    fn replace_content(&self, bubble: &u64, text: &str) {
        self.push(ViewPatch::Replace {
            id: *bubble,
            html: format_content(text),
        });
    }

    fn scroll_to_bottom(&self) {
        self.push(ViewPatch::Scroll);
    }

    fn clear(&self) {
        self.push(ViewPatch::Clear);
    }

    fn clear_input(&self) {
        self.push(ViewPatch::ClearInput);
    }

    fn set_send_enabled(&self, enabled: bool) {
        self.push(ViewPatch::SendEnabled { enabled });
    }

    fn set_quick_actions_visible(&self, visible: bool) {
        self.push(ViewPatch::QuickActions { visible });
    }

    fn set_open(&self, open: bool) {
        self.push(ViewPatch::Open { open });
    }
}
