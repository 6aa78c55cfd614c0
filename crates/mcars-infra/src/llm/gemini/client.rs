//! GeminiProvider -- concrete [`LlmProvider`] implementation for Google Gemini.
//!
//! Sends requests to the Generative Language API
//! (`/models/{model}:generateContent` and `:streamGenerateContent?alt=sse`).
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output. A provider built without a key answers
//! every request with [`LlmError::AuthenticationFailed`].

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest_eventsource::{Event, EventSource};
use secrecy::{ExposeSecret, SecretString};

use mcars_core::llm::provider::{EventStream, LlmProvider};
use mcars_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, StopReason,
};

use super::streaming::map_gemini_stream;
use super::types::{
    stop_reason, GeminiContent, GeminiErrorResponse, GeminiRequest, GeminiResponse,
    GenerationConfig,
};

/// Public Generative Language API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini LLM provider.
///
/// Stateless: the conversation history travels with every request.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Provider`] if the HTTP client cannot be built.
    pub fn new(api_key: Option<SecretString>, model: String) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300)) // long replies stream for a while
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
        })
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Build the full URL for a model method, e.g. `generateContent`.
    fn url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    fn model_for<'a>(&'a self, request: &'a CompletionRequest) -> &'a str {
        if request.model.is_empty() {
            &self.model
        } else {
            &request.model
        }
    }

    /// Convert a generic [`CompletionRequest`] into a [`GeminiRequest`].
    ///
    /// Assistant turns use the `model` role. System messages in the
    /// history are folded into the system instruction.
    fn to_gemini_request(&self, request: &CompletionRequest) -> GeminiRequest {
        let mut system = request.system.clone().unwrap_or_default();
        let mut contents = Vec::with_capacity(request.messages.len());

        for message in &request.messages {
            match message.role {
                MessageRole::System => {
                    if !system.is_empty() {
                        system.push_str("\n\n");
                    }
                    system.push_str(&message.content);
                }
                MessageRole::User => {
                    contents.push(GeminiContent::text(Some("user"), message.content.as_str()));
                }
                MessageRole::Assistant => {
                    contents.push(GeminiContent::text(Some("model"), message.content.as_str()));
                }
            }
        }

        let generation_config = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            })
        } else {
            None
        };

        GeminiRequest {
            contents,
            system_instruction: (!system.is_empty()).then(|| GeminiContent::text(None, system)),
            generation_config,
        }
    }
}

// GeminiProvider does not derive Debug; the client and key stay out of logs.

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let api_key = self.api_key.as_ref().ok_or(LlmError::AuthenticationFailed)?;
        let model = self.model_for(request).to_string();
        let body = self.to_gemini_request(request);

        let response = self
            .client
            .post(self.url(&model, "generateContent"))
            .header(API_KEY_HEADER, api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = retry_after_ms(response.headers());
            let error_body = response.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after_ms, &error_body));
        }

        let gemini_resp: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        if let Some(reason) = gemini_resp.block_reason() {
            return Err(LlmError::ContentBlocked(reason.to_string()));
        }

        Ok(CompletionResponse {
            content: gemini_resp.text(),
            model: gemini_resp.model_version.clone().unwrap_or(model),
            stop_reason: gemini_resp
                .finish_reason()
                .map(stop_reason)
                .unwrap_or(StopReason::EndTurn),
            usage: gemini_resp.usage().unwrap_or_default(),
        })
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        let Some(api_key) = self.api_key.as_ref() else {
            return map_gemini_stream(futures_util::stream::once(async {
                Err(LlmError::AuthenticationFailed)
            }));
        };

        let model = self.model_for(&request).to_string();
        let body = self.to_gemini_request(&request);
        let builder = self
            .client
            .post(self.url(&model, "streamGenerateContent?alt=sse"))
            .header(API_KEY_HEADER, api_key.expose_secret())
            .json(&body);

        let payloads = async_stream::stream! {
            let mut source = match EventSource::new(builder) {
                Ok(source) => source,
                Err(e) => {
                    yield Err(LlmError::Provider {
                        message: format!("failed to open stream: {e}"),
                    });
                    return;
                }
            };

            while let Some(event) = source.next().await {
                match event {
                    Ok(Event::Open) => {
                        tracing::debug!(model = %model, "Gemini stream opened");
                    }
                    Ok(Event::Message(message)) => yield Ok(message.data),
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(err) => {
                        yield Err(source_error(err).await);
                        break;
                    }
                }
            }
            source.close();
        };

        map_gemini_stream(payloads)
    }
}

/// Map an HTTP error status to an [`LlmError`].
fn status_error(status: StatusCode, retry_after_ms: Option<u64>, body: &str) -> LlmError {
    let detail = serde_json::from_str::<GeminiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    tracing::warn!(status = %status, detail = %detail, "Gemini API error response");

    match status.as_u16() {
        400 => LlmError::InvalidRequest(detail),
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited { retry_after_ms },
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {detail}"),
        },
    }
}

/// `Retry-After` in seconds, converted to milliseconds.
///
/// The header is server-controlled; absurd values saturate at `u64::MAX`.
fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000))
}

async fn source_error(err: reqwest_eventsource::Error) -> LlmError {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let retry_after_ms = retry_after_ms(response.headers());
            let body = response.text().await.unwrap_or_default();
            status_error(status, retry_after_ms, &body)
        }
        reqwest_eventsource::Error::Transport(e) => LlmError::Provider {
            message: format!("HTTP request failed: {e}"),
        },
        other => LlmError::Stream(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcars_types::llm::{Message, StreamEvent};
    use reqwest::header::HeaderValue;

    fn make_provider() -> GeminiProvider {
        GeminiProvider::new(
            Some(SecretString::from("test-key-not-real")),
            "gemini-3-flash-preview".to_string(),
        )
        .unwrap()
    }

    fn request(messages: Vec<Message>) -> CompletionRequest {
        CompletionRequest {
            model: String::new(),
            messages,
            system: Some("You are the MCARS PH assistant.".to_string()),
            temperature: Some(0.7),
            max_tokens: None,
        }
    }

    #[test]
    fn test_provider_name_and_model() {
        let provider = make_provider();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(LlmProvider::model(&provider), "gemini-3-flash-preview");
    }

    #[test]
    fn test_url_uses_request_model_or_default() {
        let provider = make_provider().with_base_url("http://localhost:8080/v1beta/".to_string());
        let req = request(vec![]);
        assert_eq!(
            provider.url(provider.model_for(&req), "generateContent"),
            "http://localhost:8080/v1beta/models/gemini-3-flash-preview:generateContent"
        );

        let req = CompletionRequest {
            model: "gemini-2.5-flash".to_string(),
            ..request(vec![])
        };
        assert_eq!(provider.model_for(&req), "gemini-2.5-flash");
    }

    #[test]
    fn test_to_gemini_request_maps_roles() {
        let provider = make_provider();
        let req = request(vec![
            Message {
                role: MessageRole::User,
                content: "Do you ship to Cebu?".to_string(),
            },
            Message {
                role: MessageRole::Assistant,
                content: "Yes, 3-7 business days.".to_string(),
            },
            Message {
                role: MessageRole::User,
                content: "Thanks".to_string(),
            },
        ]);

        let body = serde_json::to_value(provider.to_gemini_request(&req)).unwrap();
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You are the MCARS PH assistant."
        );
        assert_eq!(body["generationConfig"]["temperature"], 0.7);
    }

    #[test]
    fn test_to_gemini_request_without_config_omits_generation_config() {
        let provider = make_provider();
        let req = CompletionRequest {
            system: None,
            temperature: None,
            ..request(vec![])
        };
        let body = serde_json::to_value(provider.to_gemini_request(&req)).unwrap();
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, None, "bad"),
            LlmError::InvalidRequest(_)
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, None, ""),
            LlmError::AuthenticationFailed
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, Some(2000), ""),
            LlmError::RateLimited {
                retry_after_ms: Some(2000)
            }
        ));
        assert!(matches!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, None, ""),
            LlmError::Provider { .. }
        ));
    }

    #[test]
    fn test_status_error_extracts_api_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        match status_error(StatusCode::BAD_REQUEST, None, body) {
            LlmError::InvalidRequest(detail) => assert_eq!(detail, "API key not valid"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after_ms(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert_eq!(retry_after_ms(&headers), Some(3000));
    }

    #[test]
    fn test_retry_after_huge_value_saturates() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("18446744073709552"));
        assert_eq!(retry_after_ms(&headers), Some(u64::MAX));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("99999999999999999999999"));
        assert_eq!(retry_after_ms(&headers), None);
    }

    #[test]
    fn test_rate_limit_with_huge_retry_after_maps_to_error() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("18446744073709552"));
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, retry_after_ms(&headers), "");
        assert!(matches!(
            err,
            LlmError::RateLimited {
                retry_after_ms: Some(u64::MAX)
            }
        ));
    }

    #[tokio::test]
    async fn test_stream_without_key_fails_authentication() {
        let provider = GeminiProvider::new(None, "gemini-3-flash-preview".to_string()).unwrap();
        let events: Vec<_> = provider.stream(request(vec![])).collect().await;
        assert!(matches!(events[0], Ok(StreamEvent::Connected)));
        assert!(matches!(events[1], Err(LlmError::AuthenticationFailed)));
        assert_eq!(events.len(), 2);
    }
}
