//! Core logic and port definitions for the MCARS chat widget.
//!
//! This crate defines the "ports" (provider and view traits) that the
//! infrastructure and application layers implement, plus the widget
//! controller that drives a streamed conversation through them. It depends
//! only on `mcars-types` -- never on `mcars-infra` or any HTTP crate.

pub mod chat;
pub mod llm;
pub mod render;
pub mod view;
pub mod widget;
