//! Interactive terminal chat driven by the same controller as the widget.

use std::sync::Arc;

use console::style;

use mcars_core::widget::{IgnoreReason, SendOutcome, WidgetController};

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::TerminalView;
use crate::state::AppState;

/// Run the chat loop until the user exits.
pub async fn run_chat_loop(state: &AppState) -> anyhow::Result<()> {
    let view = TerminalView::new(state.widget.quick_actions.clone());
    let controller = WidgetController::new(
        Arc::clone(&state.provider),
        Arc::clone(&state.widget),
        view,
    );

    print_welcome_banner(
        &state.widget.session.model,
        &state.widget.storefront_url,
        state.has_api_key,
    );
    controller.open();
    commands::print_quick_actions(controller.quick_actions());

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) = ChatInput::new(prompt)
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        let text = match chat_input.read_line().await {
            InputEvent::Eof => break,
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                continue;
            }
            InputEvent::Message(text) => text,
        };
        if text.is_empty() {
            continue;
        }

        let outcome = if let Some(cmd) = commands::parse(&text) {
            match cmd {
                ChatCommand::Help => {
                    commands::print_help();
                    continue;
                }
                ChatCommand::Clear => {
                    chat_input.clear();
                    continue;
                }
                ChatCommand::Exit => break,
                ChatCommand::Reset => {
                    controller.reset();
                    continue;
                }
                ChatCommand::Quick(None) => {
                    commands::print_quick_actions(controller.quick_actions());
                    continue;
                }
                ChatCommand::Quick(Some(n)) => {
                    controller.view().echo_next_user();
                    controller.send_quick_action(n - 1).await
                }
                ChatCommand::Unknown(cmd_name) => {
                    println!(
                        "\n  {} Unknown command: {}. Type /help for available commands.\n",
                        style("?").yellow().bold(),
                        style(cmd_name).dim()
                    );
                    continue;
                }
            }
        } else {
            controller.send(&text).await
        };

        match outcome {
            SendOutcome::Failed { error } => {
                tracing::debug!(%error, "Reply failed");
                println!("  {}", style("Type a message to try again.").dim());
            }
            SendOutcome::Ignored(IgnoreReason::UnknownQuickAction) => {
                println!(
                    "\n  {} No such quick action. Type /quick to list them.\n",
                    style("?").yellow().bold()
                );
            }
            SendOutcome::Completed { .. } | SendOutcome::Ignored(_) | SendOutcome::Orphaned => {}
        }
    }

    controller.shutdown();
    println!("\n  {}", style("Session ended.").dim());
    Ok(())
}
