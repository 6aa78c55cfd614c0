//! Application state shared by the CLI commands and the widget server.
//!
//! Everything here is read-only after startup: the loaded configuration and
//! one provider shared by every widget connection. Per-visitor state lives
//! in each connection's `WidgetController`.

use std::path::PathBuf;
use std::sync::Arc;

use mcars_core::llm::box_provider::BoxLlmProvider;
use mcars_infra::config::{load_app_config, resolve_data_dir};
use mcars_infra::llm::create_provider;
use mcars_infra::secret::EnvSecretProvider;
use mcars_types::config::{AppConfig, WidgetConfig};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub widget: Arc<WidgetConfig>,
    pub provider: Arc<BoxLlmProvider>,
    pub data_dir: PathBuf,
    /// Whether an API key was found at startup.
    pub has_api_key: bool,
}

impl AppState {
    /// Load configuration, resolve the API key, and build the provider.
    pub async fn init(data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(resolve_data_dir);
        let config = load_app_config(&data_dir).await;

        let api_key = EnvSecretProvider::new().api_key(&config.provider.api_key_env);
        let has_api_key = api_key.is_some();
        let provider = create_provider(&config.provider, &config.widget.session.model, api_key)?;

        tracing::debug!(
            data_dir = %data_dir.display(),
            provider = provider.name(),
            model = provider.model(),
            has_api_key,
            "Application state initialized"
        );

        Ok(Self {
            widget: Arc::new(config.widget.clone()),
            config: Arc::new(config),
            provider: Arc::new(provider),
            data_dir,
            has_api_key,
        })
    }
}
