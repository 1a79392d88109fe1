use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{BucketAverage, PatternTable, Peak, RiskFlag, Severity, TrendResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Mood,
    Health,
    Chat,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mood => "mood",
            Self::Health => "health",
            Self::Chat => "chat",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown analysis domain: {0}")]
pub struct UnknownDomain(pub String);

impl FromStr for Domain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mood" => Ok(Self::Mood),
            "health" | "medical" => Ok(Self::Health),
            "chat" | "chatbot" => Ok(Self::Chat),
            other => Err(UnknownDomain(other.to_string())),
        }
    }
}

// ============================================================
// Mood
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMean {
    pub date: NaiveDate,
    pub mean: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MoodCategory {
    Positive,
    Neutral,
    Concerning,
    #[default]
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMood {
    pub activity: String,
    pub average_mood: f64,
    pub sessions: usize,
    /// Difference from the overall mean mood of the window.
    pub compared_to_overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MoodSnapshot {
    pub total_logs: usize,
    pub summary: TrendResult,
    pub daily_trend: TrendResult,
    pub daily_means: Vec<DailyMean>,
    pub weekday_pattern: Vec<BucketAverage>,
    pub hourly_pattern: Vec<BucketAverage>,
    pub activity_frequency: PatternTable<String>,
    pub activity_moods: Vec<ActivityMood>,
    pub activity_diversity: f64,
    pub category: MoodCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_trend: Option<TrendResult>,
}

// ============================================================
// Health
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub metric_type: String,
    pub trend: TrendResult,
    /// `increasing`, `decreasing` or `stable`.
    pub movement: String,
    pub latest: f64,
    pub out_of_range_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceEntry {
    pub metric_type: String,
    /// Recommended readings for the window, rounded down.
    pub expected: usize,
    pub actual: usize,
    /// `actual` over the unrounded expectation, capped at 1.0.
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HealthSnapshot {
    pub total_measurements: usize,
    pub metrics: Vec<MetricSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_tracked_metric: Option<Peak<String>>,
    /// Threshold, reference-range and outlier flags on individual readings.
    pub flags: Vec<RiskFlag>,
    /// Flags derived from trends and variability across a metric.
    pub risks: Vec<RiskFlag>,
    pub compliance: Vec<ComplianceEntry>,
    pub overall_compliance: f64,
    pub measurement_consistency: f64,
    pub stability_index: f64,
    pub health_score: f64,
    pub hourly_distribution: PatternTable<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_hour: Option<Peak<u32>>,
    pub weekday_distribution: PatternTable<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_weekday: Option<Peak<String>>,
}

impl HealthSnapshot {
    pub fn count_flags(&self, severity: Severity) -> usize {
        self.flags
            .iter()
            .chain(self.risks.iter())
            .filter(|f| f.severity == severity)
            .count()
    }
}

// ============================================================
// Chatbot usage
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngagementLevel {
    #[default]
    NoData,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LengthCategory {
    #[default]
    VeryShort,
    Short,
    Medium,
    Long,
    VeryLong,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChatSnapshot {
    pub total_messages: usize,
    pub user_messages: usize,
    pub bot_messages: usize,
    pub user_percentage: f64,
    pub bot_percentage: f64,
    /// Bot replies per user message.
    pub response_ratio: f64,
    pub average_user_length: f64,
    pub average_bot_length: f64,
    pub hourly_distribution: PatternTable<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_hour: Option<Peak<u32>>,
    pub weekday_distribution: PatternTable<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_weekday: Option<Peak<String>>,
    pub daily_trend: TrendResult,
    pub keyword_mentions: PatternTable<String>,
    pub top_keywords: Vec<Peak<String>>,
    pub question_rate: f64,
    pub engagement: EngagementLevel,
    pub length_category: LengthCategory,
}

// ============================================================
// Report
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "data", rename_all = "lowercase")]
pub enum DomainSnapshot {
    Mood(MoodSnapshot),
    Health(HealthSnapshot),
    Chat(ChatSnapshot),
}

impl DomainSnapshot {
    pub fn domain(&self) -> Domain {
        match self {
            Self::Mood(_) => Domain::Mood,
            Self::Health(_) => Domain::Health,
            Self::Chat(_) => Domain::Chat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InsightSource {
    #[default]
    Rules,
    Llm,
    /// The LLM was asked but failed; rule-based output stands in.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Insights {
    pub source: InsightSource,
    pub summary: String,
    #[serde(default)]
    pub observations: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub report_id: Uuid,
    pub subject_id: String,
    pub window_days: u32,
    pub generated_at: DateTime<Utc>,
    pub snapshot: DomainSnapshot,
    pub insights: Insights,
}

impl AnalysisReport {
    pub fn new(
        subject_id: impl Into<String>,
        window_days: u32,
        snapshot: DomainSnapshot,
        insights: Insights,
    ) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            subject_id: subject_id.into(),
            window_days,
            generated_at: Utc::now(),
            snapshot,
            insights,
        }
    }

    pub fn domain(&self) -> Domain {
        self.snapshot.domain()
    }
}
