use std::sync::Arc;
use std::time::Duration;

use mindcare_core::MindcareConfig;
use mindcare_provider::{InsightGenerator, OllamaProvider};

/// Summary of a loaded config. When insights are enabled the Ollama server is
/// asked for its model list; an unreachable model is reported, not treated as
/// invalid config.
pub async fn validate_summary(config: &MindcareConfig) -> String {
    let mut summary = format!(
        "Config valid. {} thresholds, {} reference ranges, cache {}.",
        config.effective_thresholds().len(),
        config.effective_reference_ranges().len(),
        if config.cache.enabled { "on" } else { "off" },
    );

    if !config.insights.enabled {
        summary.push_str("\nInsights off.");
        return summary;
    }

    let provider = OllamaProvider::new(&config.insights.base_url, &config.insights.model)
        .with_timeout(Duration::from_secs(config.insights.timeout_secs));
    let generator = InsightGenerator::new(Arc::new(provider));
    match generator.health().await {
        Ok(()) => summary.push_str(&format!(
            "\nInsights on: model {} is available at {}.",
            config.insights.model, config.insights.base_url
        )),
        Err(e) => {
            tracing::warn!(base_url = %config.insights.base_url, "insight model not ready: {e}");
            summary.push_str(&format!(
                "\nInsights on but not ready ({e}); reports will use rule-based insights."
            ));
        }
    }
    summary
}
