//! Print the effective configuration.

use anyhow::{Context, Result};

use mcars_types::config::AppConfig;

use crate::state::AppState;

/// Print the merged configuration (file values over defaults).
///
/// The output is a valid `config.toml`, so it doubles as a starting point
/// for customizing the widget.
pub fn show_config(state: &AppState, json: bool) -> Result<()> {
    println!("{}", render_config(&state.config, json)?);
    Ok(())
}

fn render_config(config: &AppConfig, json: bool) -> Result<String> {
    if json {
        serde_json::to_string_pretty(config).context("Failed to serialize config as JSON")
    } else {
        toml::to_string_pretty(config).context("Failed to serialize config as TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_toml_loads_back() {
        let config = AppConfig::default();
        let rendered = render_config(&config, false).unwrap();
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_render_json() {
        let rendered = render_config(&AppConfig::default(), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["provider"]["name"], "gemini");
        assert_eq!(value["widget"]["session"]["temperature"], 0.7);
    }
}
