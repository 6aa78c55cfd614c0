//! Chat session handle.
//!
//! A [`session::ChatSession`] is the widget's only link to the hosted model:
//! it owns the fixed session configuration and the conversation history.

pub mod session;
