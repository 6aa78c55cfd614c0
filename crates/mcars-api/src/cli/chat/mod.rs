//! Terminal chat: the widget conversation rendered in a terminal.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
