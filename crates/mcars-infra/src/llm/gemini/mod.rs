//! Google Gemini LLM provider implementation.
//!
//! This module provides the [`GeminiProvider`] which implements the
//! [`LlmProvider`](mcars_core::llm::provider::LlmProvider) trait for
//! the Generative Language REST API, including SSE streaming support.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::GeminiProvider;
