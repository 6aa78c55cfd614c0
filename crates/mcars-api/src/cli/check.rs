//! Configuration and connectivity check.

use std::time::{Duration, Instant};

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use mcars_infra::llm::test_provider_connection;

use crate::state::AppState;

/// Print where configuration came from and try one round-trip to the model.
///
/// Fails (non-zero exit) when the model cannot be reached.
pub async fn check(state: &AppState, json: bool) -> Result<()> {
    let config_path = state.data_dir.join("config.toml");
    let config_found = tokio::fs::try_exists(&config_path).await.unwrap_or(false);

    let spinner = (!json).then(|| {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("Contacting {}...", state.provider.model()));
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    });

    let started = Instant::now();
    let result = test_provider_connection(&state.provider).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if json {
        let report = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "config_file": config_found.then(|| config_path.display().to_string()),
            "provider": state.provider.name(),
            "model": state.provider.model(),
            "api_key_env": state.config.provider.api_key_env,
            "api_key_configured": state.has_api_key,
            "connection": match &result {
                Ok(()) => serde_json::json!({ "ok": true, "latency_ms": elapsed_ms }),
                Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }),
            },
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!(
            "  {} MCARS assistant v{}",
            style("*").red().bold(),
            env!("CARGO_PKG_VERSION")
        );
        println!();
        println!("  {:<10} {}", style("Data dir").bold(), state.data_dir.display());
        println!(
            "  {:<10} {}",
            style("Config").bold(),
            if config_found {
                config_path.display().to_string()
            } else {
                "defaults (no config.toml)".to_string()
            }
        );
        println!(
            "  {:<10} {} / {}",
            style("Model").bold(),
            state.provider.name(),
            state.provider.model()
        );
        println!(
            "  {:<10} {}",
            style("API key").bold(),
            if state.has_api_key {
                style(format!("set ({})", state.config.provider.api_key_env)).green()
            } else {
                style(format!("missing ({})", state.config.provider.api_key_env)).red()
            }
        );
        match &result {
            Ok(()) => println!(
                "  {:<10} {} {}ms",
                style("Connection").bold(),
                style("ok").green(),
                elapsed_ms
            ),
            Err(e) => println!(
                "  {:<10} {} {}",
                style("Connection").bold(),
                style("failed").red(),
                style(e).dim()
            ),
        }
        println!();
    }

    result.map_err(|e| anyhow::anyhow!("Model connection check failed: {e}"))
}
