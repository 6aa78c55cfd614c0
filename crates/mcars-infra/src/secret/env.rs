//! Environment variable secret provider.
//!
//! The widget needs exactly one secret: the model API key. It is looked up
//! under the configured variable name first, then under `GEMINI_API_KEY`.

use secrecy::SecretString;

/// Variable checked when the configured one is unset.
pub const FALLBACK_KEY_ENV: &str = "GEMINI_API_KEY";

/// Read-only secret provider backed by process environment variables.
pub struct EnvSecretProvider;

impl EnvSecretProvider {
    pub fn new() -> Self {
        Self
    }

    /// Look up a single variable. Unset, empty, and non-Unicode values
    /// are all treated as absent.
    pub fn get(&self, key: &str) -> Option<SecretString> {
        match std::env::var(key) {
            Ok(val) if !val.trim().is_empty() => Some(SecretString::from(val)),
            Ok(_) => None,
            Err(std::env::VarError::NotPresent) => None,
            Err(std::env::VarError::NotUnicode(_)) => None,
        }
    }

    /// Resolve the model API key: `key` first, then [`FALLBACK_KEY_ENV`].
    pub fn api_key(&self, key: &str) -> Option<SecretString> {
        self.get(key).or_else(|| {
            if key == FALLBACK_KEY_ENV {
                None
            } else {
                self.get(FALLBACK_KEY_ENV)
            }
        })
    }
}

impl Default for EnvSecretProvider {
    fn default() -> Self {
        Self::new()
    }
}
