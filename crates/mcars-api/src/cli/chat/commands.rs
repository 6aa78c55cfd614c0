//! Slash command parsing for the terminal chat.
//!
//! Commands start with `/` and mirror the widget's buttons: reset, quick
//! actions, plus terminal housekeeping.

use console::style;

use mcars_types::config::QuickAction;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Clear the terminal screen.
    Clear,
    /// Exit the chat.
    Exit,
    /// Discard the conversation and start a fresh session.
    Reset,
    /// List quick actions, or send the 1-based quick action `n`.
    Quick(Option<usize>),
    /// Unknown command.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let parts: Vec<&str> = trimmed.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let arg = parts.get(1).map(|s| s.trim()).filter(|s| !s.is_empty());

    match cmd.as_str() {
        "/help" | "/h" | "/?" => Some(ChatCommand::Help),
        "/clear" | "/cls" => Some(ChatCommand::Clear),
        "/exit" | "/quit" | "/q" => Some(ChatCommand::Exit),
        "/reset" | "/new" => Some(ChatCommand::Reset),
        "/quick" | "/qa" => match arg {
            None => Some(ChatCommand::Quick(None)),
            Some(n) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Some(ChatCommand::Quick(Some(n))),
                _ => Some(ChatCommand::Unknown(
                    "/quick takes a number from the list".to_string(),
                )),
            },
        },
        other => Some(ChatCommand::Unknown(other.to_string())),
    }
}

/// Print the help text listing all available commands.
pub fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}     {}", style("/help").cyan(), "Show this help message");
    println!("  {}    {}", style("/reset").cyan(), "Clear the conversation and start over");
    println!("  {} {}", style("/quick [n]").cyan(), "List quick actions or send number n");
    println!("  {}    {}", style("/clear").cyan(), "Clear the screen");
    println!("  {}     {}", style("/exit").cyan(), "End the chat");
    println!();
    println!("  {}", style("Ctrl+D to exit").dim());
    println!();
}

/// Print the numbered quick actions.
pub fn print_quick_actions(actions: &[QuickAction]) {
    if actions.is_empty() {
        return;
    }
    println!();
    for (i, action) in actions.iter().enumerate() {
        println!(
            "  {} {}  {}",
            style(format!("[{}]", i + 1)).red().bold(),
            style(&action.label).bold(),
            style(&action.query).dim()
        );
    }
    println!("  {}", style("Type /quick <n> to ask").dim());
    println!();
}
