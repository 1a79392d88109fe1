use mindcare_schema::{AnalysisReport, DomainSnapshot};

use crate::chat::ChatUsageAnalyzer;
use crate::config::MindcareConfig;
use crate::health::HealthAnalyzer;
use crate::input::AnalysisInput;
use crate::insights::rule_insights;
use crate::mood::MoodAnalyzer;

/// Entry point wiring the analyzers to one explicit configuration.
pub struct AnalyticsService {
    mood: MoodAnalyzer,
    health: HealthAnalyzer,
    chat: ChatUsageAnalyzer,
}

impl AnalyticsService {
    pub fn new(config: &MindcareConfig) -> Self {
        Self {
            mood: MoodAnalyzer::new(&config.analytics),
            health: HealthAnalyzer::new(config),
            chat: ChatUsageAnalyzer::new(&config.analytics),
        }
    }

    pub fn snapshot(&self, input: &AnalysisInput, window_days: u32) -> DomainSnapshot {
        match input {
            AnalysisInput::Mood(logs) => DomainSnapshot::Mood(self.mood.analyze(logs)),
            AnalysisInput::Health(metrics) => {
                DomainSnapshot::Health(self.health.analyze(metrics, window_days))
            }
            AnalysisInput::Chat(messages) => DomainSnapshot::Chat(self.chat.analyze(messages)),
        }
    }

    /// Snapshot plus rule-based insights.
    pub fn report(
        &self,
        subject_id: &str,
        input: &AnalysisInput,
        window_days: u32,
    ) -> AnalysisReport {
        let snapshot = self.snapshot(input, window_days);
        let insights = rule_insights(&snapshot);
        tracing::info!(
            subject_id,
            domain = snapshot.domain().as_str(),
            records = input.len(),
            window_days,
            "built analysis report"
        );
        AnalysisReport::new(subject_id, window_days, snapshot, insights)
    }
}
