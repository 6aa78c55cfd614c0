//! Configuration types for the chat widget.
//!
//! `AppConfig` represents the top-level `config.toml`. Every field has a
//! default, so an empty or missing file yields the stock storefront widget.

use serde::{Deserialize, Serialize};

use crate::llm::ProviderConfig;

/// Model used for the storefront assistant.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Sampling temperature applied to every session, at startup and on reset.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Storefront that the fallback message points users to.
pub const DEFAULT_STOREFRONT_URL: &str = "shop.mcars.ph";

/// Persona and policy sent as the system instruction of every session.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = r#"You are the official AI Sales and Customer Support Assistant for MCARS PH (shop.mcars.ph), an online automotive shop based in the Philippines.

**Website Context:**
- MCARS PH sells car parts (engine parts, suspension, brakes), accessories (lighting, interior, exterior trim), and general automotive products.
- Target audience: Car enthusiasts and vehicle owners in the Philippines.

**Behavior Rules:**
1. **Be clear, concise, and helpful.**
2. **Product Knowledge:** If asked about compatibility, ask for the car's Make (e.g., Toyota), Model (e.g., Vios), and Year (e.g., 2018).
3. **No Hallucinations:** Do NOT invent prices, specific stock levels, or active promotions. If asked, tell the user that prices vary and suggest they check the website (shop.mcars.ph) for the most accurate and real-time pricing.
4. **No Legal/Financial Advice:** Redirect any such queries to the appropriate authorities.
5. **Tone:** Professional yet friendly, helpful, and customer-focused. Use conversational English typical of the Philippines (Taglish is acceptable if the user initiates it, but keep it mostly English).
6. **Delivery:** General info: We ship nationwide. Metro Manila usually takes 1-3 business days. Provincial areas 3-7 business days.
7. **Redirection:** If a query is too technical or requires human intervention (e.g., order tracking or returns), politely provide our support channels (Email: support@mcars.ph or Message us on Facebook at MCARS PH).

**Style Guidelines:**
- Address users politely ("Sure!", "I can help with that.").
- Use simple explanations.
- Only use emojis if the user uses them first.
"#;

/// Static greeting appended the first time the widget opens.
pub const DEFAULT_GREETING: &str = "Hi! I'm the MCARS PH AI Assistant. Looking for specific car parts or have questions about an order? I'm here to help!";

/// Static confirmation appended after a conversation reset.
pub const DEFAULT_RESET_MESSAGE: &str = "History cleared. How can I assist you further today?";

/// Reply shown in place of any failed or partial assistant message.
pub const DEFAULT_FALLBACK_MESSAGE: &str = "I apologize, but I'm having trouble connecting right now. Please check shop.mcars.ph for assistance.";

/// Fixed configuration for a model chat session.
///
/// The same value is used when the first session is created and every time
/// the conversation is reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_system_instruction() -> String {
    DEFAULT_SYSTEM_INSTRUCTION.to_string()
}

fn default_temperature() -> Option<f64> {
    Some(DEFAULT_TEMPERATURE)
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            system_instruction: default_system_instruction(),
            temperature: default_temperature(),
            max_output_tokens: None,
        }
    }
}

/// A pre-filled query offered as a one-click button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickAction {
    pub label: String,
    pub query: String,
}

impl QuickAction {
    pub fn new(label: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            query: query.into(),
        }
    }
}

fn default_quick_actions() -> Vec<QuickAction> {
    vec![
        QuickAction::new(
            "Compatibility",
            "I want to check if a part is compatible with my car.",
        ),
        QuickAction::new(
            "Delivery",
            "How long does shipping take within the Philippines?",
        ),
        QuickAction::new("Returns", "What is your return and warranty policy?"),
    ]
}

/// Behaviour and copy of the chat widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_reset_message")]
    pub reset_message: String,
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
    #[serde(default = "default_storefront_url")]
    pub storefront_url: String,
    #[serde(default = "default_quick_actions")]
    pub quick_actions: Vec<QuickAction>,
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

fn default_reset_message() -> String {
    DEFAULT_RESET_MESSAGE.to_string()
}

fn default_fallback_message() -> String {
    DEFAULT_FALLBACK_MESSAGE.to_string()
}

fn default_storefront_url() -> String {
    DEFAULT_STOREFRONT_URL.to_string()
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            greeting: default_greeting(),
            reset_message: default_reset_message(),
            fallback_message: default_fallback_message(),
            storefront_url: default_storefront_url(),
            quick_actions: default_quick_actions(),
        }
    }
}

/// Top-level configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub widget: WidgetConfig,
}
