//! Shared domain types for the MCARS chat widget.
//!
//! This crate contains the types used across the widget workspace:
//! chat messages and streamed fragments, LLM request/stream shapes,
//! and the configuration that drives the widget and its model session.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod llm;
