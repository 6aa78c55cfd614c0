//! Welcome banner for the terminal chat.

use console::style;

/// Print the banner shown before the greeting.
pub fn print_welcome_banner(model: &str, storefront_url: &str, has_api_key: bool) {
    println!();
    println!(
        "  {} {}",
        style("MCARS").bold(),
        style("PH Assistant").red().bold()
    );
    println!("  {}", style(storefront_url).dim());
    println!();
    println!("  {}  {}", style("Model:").bold(), style(model).dim());
    if !has_api_key {
        println!(
            "  {}  {}",
            style("!").yellow().bold(),
            style("No API key found; replies will fall back to the support message.").yellow()
        );
    }
    println!();
    println!("  {}", style("Type /help for commands, Ctrl+D to exit").dim());
    println!("  {}", style("---").dim());
}
