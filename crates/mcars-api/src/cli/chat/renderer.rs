//! Terminal rendition of the conversation view.
//!
//! The terminal is append-only, so "replace the bubble content" becomes
//! "print whatever was added since last time". While a reply has no text
//! yet a spinner stands in for the typing indicator. When the new content
//! does not extend what is already on screen (a partial reply replaced by
//! the fallback message) the full text is printed on a fresh line.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use mcars_core::render::format_timestamp;
use mcars_core::view::ConversationView;
use mcars_types::chat::{ChatMessage, MessageRole};
use mcars_types::config::QuickAction;

use super::commands::print_quick_actions;

/// What to print to bring the screen from `printed` to `text`.
#[derive(Debug, PartialEq, Eq)]
pub enum StreamUpdate {
    Unchanged,
    /// Print this suffix after what is already shown.
    Append(String),
    /// Content diverged; print the whole text again.
    Rewrite(String),
}

pub fn stream_update(printed: &str, text: &str) -> StreamUpdate {
    if text == printed {
        StreamUpdate::Unchanged
    } else if let Some(suffix) = text.strip_prefix(printed) {
        StreamUpdate::Append(suffix.to_string())
    } else {
        StreamUpdate::Rewrite(text.to_string())
    }
}

struct LiveBubble {
    id: usize,
    time: String,
    printed: String,
    spinner: Option<ProgressBar>,
}

#[derive(Default)]
struct TerminalState {
    next_id: usize,
    live: Option<LiveBubble>,
}

pub struct TerminalView {
    quick_actions: Vec<QuickAction>,
    echo_user: AtomicBool,
    state: Mutex<TerminalState>,
}

impl TerminalView {
    pub fn new(quick_actions: Vec<QuickAction>) -> Self {
        Self {
            quick_actions,
            echo_user: AtomicBool::new(false),
            state: Mutex::new(TerminalState::default()),
        }
    }

    /// Print the next user bubble.
    ///
    /// Typed lines are already on screen from the prompt; messages that come
    /// from a quick action are not.
    pub fn echo_next_user(&self) {
        self.echo_user.store(true, Ordering::Release);
    }

    fn lock_state(&self) -> MutexGuard<'_, TerminalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish_live(state: &mut TerminalState) {
        if let Some(live) = state.live.take() {
            match live.spinner {
                Some(spinner) => spinner.finish_and_clear(),
                None if !live.printed.is_empty() => println!(),
                None => {}
            }
        }
    }
}

fn print_assistant_prefix(message_time: &str) {
    print!(
        "\n  {} {} ",
        style("MCARS").red().bold(),
        style(message_time).dim()
    );
}

fn typing_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner:.red} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("typing...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

impl ConversationView for TerminalView {
    type Bubble = usize;

    fn append(&self, message: &ChatMessage) -> usize {
        let mut state = self.lock_state();
        Self::finish_live(&mut state);
        let id = state.next_id;
        state.next_id += 1;

        let time = format_timestamp(&message.timestamp);
        match message.role {
            MessageRole::User => {
                if self.echo_user.swap(false, Ordering::AcqRel) {
                    println!("  {} {}", style("You >").green().bold(), message.text);
                }
            }
            MessageRole::Assistant | MessageRole::System => {
                if message.text.is_empty() {
                    // Header goes out with the first fragment, after the spinner clears.
                    state.live = Some(LiveBubble {
                        id,
                        time,
                        printed: String::new(),
                        spinner: Some(typing_spinner()),
                    });
                } else {
                    print_assistant_prefix(&time);
                    println!("{}", message.text);
                }
            }
        }
        id
    }

    fn replace_content(&self, bubble: &usize, text: &str) {
        let mut state = self.lock_state();
        let Some(live) = state.live.as_mut().filter(|live| live.id == *bubble) else {
            return;
        };

        if let Some(spinner) = live.spinner.take() {
            if text.is_empty() {
                live.spinner = Some(spinner);
                return;
            }
            spinner.finish_and_clear();
            print_assistant_prefix(&live.time);
        }

        match stream_update(&live.printed, text) {
            StreamUpdate::Unchanged => {}
            StreamUpdate::Append(suffix) => print!("{suffix}"),
            StreamUpdate::Rewrite(full) => {
                println!();
                print!("  {}", style(full).yellow());
            }
        }
        live.printed = text.to_string();
    }

    fn scroll_to_bottom(&self) {
        let _ = std::io::stdout().flush();
    }

    fn clear(&self) {
        let mut state = self.lock_state();
        Self::finish_live(&mut state);
        println!();
        println!("  {}", style("--- conversation cleared ---").dim());
    }

    fn clear_input(&self) {}

    fn set_send_enabled(&self, enabled: bool) {
        if enabled {
            let mut state = self.lock_state();
            Self::finish_live(&mut state);
            let _ = std::io::stdout().flush();
        }
    }

    fn set_quick_actions_visible(&self, visible: bool) {
        if visible {
            print_quick_actions(&self.quick_actions);
        }
    }

    fn set_open(&self, _open: bool) {}
}
