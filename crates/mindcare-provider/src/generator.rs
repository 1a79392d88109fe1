use std::sync::Arc;
use std::time::Duration;

use mindcare_schema::{DomainSnapshot, InsightSource, Insights};

use crate::prompt::{build_prompt, parse_completion};
use crate::{InsightError, InsightProvider};

const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Enriches rule-based insights through an [`InsightProvider`].
///
/// Enrichment never fails: any provider error is logged and the rule-based
/// insights come back marked [`InsightSource::Fallback`].
pub struct InsightGenerator {
    provider: Arc<dyn InsightProvider>,
    max_retries: u32,
}

impl InsightGenerator {
    pub fn new(provider: Arc<dyn InsightProvider>) -> Self {
        Self {
            provider,
            max_retries: 1,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub async fn health(&self) -> Result<(), InsightError> {
        self.provider.health().await
    }

    pub async fn enrich(&self, snapshot: &DomainSnapshot, baseline: Insights) -> Insights {
        let prompt = build_prompt(snapshot, &baseline);
        match self.complete(&prompt).await {
            Ok(text) => match parse_completion(&text) {
                Ok(completion) => {
                    tracing::info!(
                        provider = self.provider.name(),
                        domain = snapshot.domain().as_str(),
                        "insights enriched by llm"
                    );
                    let recommendations = if completion.recommendations.is_empty() {
                        baseline.recommendations
                    } else {
                        completion.recommendations
                    };
                    Insights {
                        source: InsightSource::Llm,
                        summary: completion.summary,
                        observations: baseline.observations,
                        recommendations,
                        alerts: baseline.alerts,
                    }
                }
                Err(e) => fallback(baseline, &e),
            },
            Err(e) => fallback(baseline, &e),
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, InsightError> {
        let mut attempt = 0;
        loop {
            match self.provider.generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::debug!(attempt, "retrying insight request: {e}");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn fallback(baseline: Insights, err: &InsightError) -> Insights {
    tracing::warn!("llm insight generation failed, using rule-based insights: {err}");
    Insights {
        source: InsightSource::Fallback,
        ..baseline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StubProvider;
    use mindcare_schema::{Alert, ChatSnapshot, Severity};

    fn baseline() -> Insights {
        Insights {
            source: InsightSource::Rules,
            summary: "rules summary".into(),
            observations: vec!["obs".into()],
            recommendations: vec!["rule rec".into()],
            alerts: vec![Alert {
                severity: Severity::High,
                message: "critical".into(),
            }],
        }
    }

    fn snapshot() -> DomainSnapshot {
        DomainSnapshot::Chat(ChatSnapshot::default())
    }

    #[tokio::test]
    async fn llm_reply_replaces_summary_and_keeps_alerts() {
        let stub = StubProvider::new(r#"{"summary": "llm summary", "recommendations": ["llm rec"]}"#);
        let generator = InsightGenerator::new(Arc::new(stub));
        let out = generator.enrich(&snapshot(), baseline()).await;
        assert_eq!(out.source, InsightSource::Llm);
        assert_eq!(out.summary, "llm summary");
        assert_eq!(out.recommendations, vec!["llm rec"]);
        assert_eq!(out.alerts.len(), 1);
        assert_eq!(out.observations, vec!["obs"]);
    }

    #[tokio::test]
    async fn plain_reply_keeps_rule_recommendations() {
        let generator = InsightGenerator::new(Arc::new(StubProvider::new("Things look steady.")));
        let out = generator.enrich(&snapshot(), baseline()).await;
        assert_eq!(out.summary, "Things look steady.");
        assert_eq!(out.recommendations, vec!["rule rec"]);
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_rules() {
        let generator = InsightGenerator::new(Arc::new(StubProvider::failing())).with_max_retries(0);
        let out = generator.enrich(&snapshot(), baseline()).await;
        assert_eq!(out.source, InsightSource::Fallback);
        assert_eq!(out.summary, "rules summary");
        assert!(generator.health().await.is_err());
    }

    #[tokio::test]
    async fn blank_reply_falls_back() {
        let generator = InsightGenerator::new(Arc::new(StubProvider::new("  ")));
        let out = generator.enrich(&snapshot(), baseline()).await;
        assert_eq!(out.source, InsightSource::Fallback);
    }
}
