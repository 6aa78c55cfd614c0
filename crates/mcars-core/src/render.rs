//! HTML rendering for conversation bubbles.
//!
//! Pure functions from typed view-models to markup. Escaping is an explicit
//! step ([`escape_html`]) so every piece of user or model text that reaches
//! the page goes through one testable function.

use chrono::{DateTime, Local, Utc};

use mcars_types::chat::ChatMessage;
use mcars_types::config::QuickAction;

/// Markup shown while an assistant bubble has no content yet.
pub const TYPING_INDICATOR: &str = concat!(
    r#"<div class="flex space-x-1 py-1">"#,
    r#"<div class="w-1.5 h-1.5 bg-slate-300 rounded-full animate-bounce"></div>"#,
    r#"<div class="w-1.5 h-1.5 bg-slate-300 rounded-full animate-bounce delay-75"></div>"#,
    r#"<div class="w-1.5 h-1.5 bg-slate-300 rounded-full animate-bounce delay-150"></div>"#,
    r#"</div>"#,
);

const BLANK_LINE: &str = r#"<div class="h-1.5"></div>"#;

/// Escape text for safe inclusion in HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Render the content region of a bubble.
///
/// Empty text renders the typing indicator. Otherwise every line becomes
/// its own paragraph and whitespace-only lines become vertical spacing.
pub fn format_content(text: &str) -> String {
    if text.is_empty() {
        return TYPING_INDICATOR.to_string();
    }

    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                BLANK_LINE.to_string()
            } else {
                format!(r#"<p class="mb-1 last:mb-0">{}</p>"#, escape_html(line))
            }
        })
        .collect()
}

/// Format a message timestamp as local `HH:MM`.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}

/// Render a complete message bubble.
///
/// The content region carries the `content-bubble` class; it is the part
/// that gets replaced while a reply streams.
pub fn render_bubble(message: &ChatMessage) -> String {
    let assistant = message.is_assistant();
    let (row, justify, items) = if assistant {
        ("flex-row", "justify-start", "items-start")
    } else {
        ("flex-row-reverse", "justify-end", "items-end")
    };
    let avatar = if assistant {
        "bg-red-600 text-white mr-2"
    } else {
        "bg-slate-800 text-white ml-2"
    };
    let icon = if assistant { "fa-robot" } else { "fa-user" };
    let bubble = if assistant {
        "bg-white border border-slate-200 text-slate-800 rounded-tl-none shadow-sm"
    } else {
        "bg-red-600 text-white rounded-tr-none shadow-md"
    };

    format!(
        concat!(
            r#"<div class="flex w-full mb-4 {justify}">"#,
            r#"<div class="flex max-w-[88%] {row}">"#,
            r#"<div class="flex-shrink-0 h-7 w-7 rounded-full flex items-center justify-center mt-0.5 shadow-sm {avatar}">"#,
            r#"<i class="fa-solid {icon} text-[10px]"></i>"#,
            r#"</div>"#,
            r#"<div class="flex flex-col {items}">"#,
            r#"<div class="content-bubble px-3.5 py-2 rounded-2xl text-[13px] leading-relaxed {bubble}">{content}</div>"#,
            r#"<span class="text-[9px] text-slate-400 mt-1 uppercase font-medium tracking-widest">{time}</span>"#,
            r#"</div>"#,
            r#"</div>"#,
            r#"</div>"#,
        ),
        justify = justify,
        row = row,
        avatar = avatar,
        icon = icon,
        items = items,
        bubble = bubble,
        content = format_content(&message.text),
        time = format_timestamp(&message.timestamp),
    )
}

/// Render the quick-action buttons, indexed by position.
pub fn render_quick_actions(actions: &[QuickAction]) -> String {
    actions
        .iter()
        .enumerate()
        .map(|(index, action)| {
            format!(
                r#"<button type="button" class="quick-action px-3 py-1 rounded-full border border-red-100 bg-red-50 text-red-600 text-[11px] font-bold hover:bg-red-600 hover:text-white transition-all shadow-sm shrink-0" data-index="{index}" title="{title}">{label}</button>"#,
                index = index,
                title = escape_html(&action.query),
                label = escape_html(&action.label),
            )
        })
        .collect()
}
