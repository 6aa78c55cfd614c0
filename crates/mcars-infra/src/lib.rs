//! Infrastructure layer for the MCARS chat widget.
//!
//! Contains the concrete implementations behind the ports defined in
//! `mcars-core`: the Gemini LLM provider, the `config.toml` loader,
//! data directory resolution, and environment secret lookup.

pub mod config;
pub mod llm;
pub mod secret;
