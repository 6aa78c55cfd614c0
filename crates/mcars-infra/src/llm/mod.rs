//! LLM provider implementations.
//!
//! Contains the concrete implementation of the [`LlmProvider`] trait
//! defined in `mcars-core` for Google Gemini.
//!
//! Also provides a provider factory ([`create_provider`]) that constructs
//! the right provider from a [`ProviderConfig`], and a connection test
//! function ([`test_provider_connection`]) used by `mcars check`.
//!
//! [`LlmProvider`]: mcars_core::llm::provider::LlmProvider

pub mod gemini;

use secrecy::SecretString;

use mcars_core::llm::box_provider::BoxLlmProvider;
use mcars_types::llm::{CompletionRequest, LlmError, Message, MessageRole, ProviderConfig};

use self::gemini::GeminiProvider;

/// Create a [`BoxLlmProvider`] from a [`ProviderConfig`].
///
/// A missing API key does not fail construction. The provider is built
/// anyway and every request it makes fails with
/// [`LlmError::AuthenticationFailed`].
///
/// # Errors
///
/// Returns [`LlmError::InvalidRequest`] for an unknown provider name, or
/// [`LlmError::Provider`] if the HTTP client cannot be built.
pub fn create_provider(
    config: &ProviderConfig,
    model: &str,
    api_key: Option<SecretString>,
) -> Result<BoxLlmProvider, LlmError> {
    match config.name.as_str() {
        "gemini" => {
            if api_key.is_none() {
                tracing::warn!(
                    env = %config.api_key_env,
                    "No API key found, model requests will fail"
                );
            }
            let mut provider = GeminiProvider::new(api_key, model.to_string())?;
            if let Some(base_url) = config.base_url.as_deref() {
                provider = provider.with_base_url(base_url.to_string());
            }
            Ok(BoxLlmProvider::new(provider))
        }
        other => Err(LlmError::InvalidRequest(format!(
            "unsupported provider '{other}'"
        ))),
    }
}

/// Test provider connectivity by sending a minimal completion request.
///
/// # Errors
///
/// Returns the LLM error if the provider fails to respond.
pub async fn test_provider_connection(provider: &BoxLlmProvider) -> Result<(), LlmError> {
    let request = CompletionRequest {
        model: String::new(), // Provider uses its configured default
        messages: vec![Message {
            role: MessageRole::User,
            content: "Hello".to_string(),
        }],
        system: None,
        temperature: Some(0.0),
        max_tokens: Some(10),
    };
    provider.complete(&request).await?;
    Ok(())
}
