//! Deterministic insights derived from a snapshot.
//!
//! These are the baseline that LLM enrichment builds on and the fallback when
//! it is unavailable.

use mindcare_schema::{
    Alert, ChatSnapshot, DomainSnapshot, EngagementLevel, HealthSnapshot, InsightSource,
    Insights, MoodCategory, MoodSnapshot, RiskKind, Severity, TrendDirection,
};

/// Keywords in chat that point at distress rather than general wellbeing talk.
pub const DISTRESS_KEYWORDS: [&str; 5] = ["anxiety", "depression", "stress", "struggle", "worse"];

/// Below this overall compliance the recording frequency is called out.
pub const LOW_COMPLIANCE: f64 = 0.5;

pub fn rule_insights(snapshot: &DomainSnapshot) -> Insights {
    match snapshot {
        DomainSnapshot::Mood(s) => mood_insights(s),
        DomainSnapshot::Health(s) => health_insights(s),
        DomainSnapshot::Chat(s) => chat_insights(s),
    }
}

fn no_data(what: &str) -> Insights {
    Insights {
        source: InsightSource::Rules,
        summary: format!("No {what} recorded in this window."),
        recommendations: vec![format!("Record {what} regularly to unlock trend analysis.")],
        ..Default::default()
    }
}

pub fn mood_insights(s: &MoodSnapshot) -> Insights {
    if s.total_logs == 0 {
        return no_data("mood logs");
    }

    let mut out = Insights {
        source: InsightSource::Rules,
        ..Default::default()
    };

    let category = match s.category {
        MoodCategory::Positive => "positive",
        MoodCategory::Neutral => "neutral",
        MoodCategory::Concerning => "concerning",
        MoodCategory::NoData => "unknown",
    };
    out.summary = format!(
        "Average mood {:.1}/10 over {} logs is {category} and {}.",
        s.summary.mean, s.total_logs, s.daily_trend.direction
    );

    match s.daily_trend.direction {
        TrendDirection::Improving => {
            out.observations.push("Daily mood is trending upward.".to_string())
        }
        TrendDirection::Declining => {
            out.observations
                .push("Daily mood is trending downward.".to_string());
            out.recommendations
                .push("Consider reaching out to a counselor or trusted person.".to_string());
        }
        TrendDirection::Stable => {}
    }

    if s.summary.volatility > 2.0 {
        out.observations.push(format!(
            "Mood fluctuates noticeably (standard deviation {:.1}).",
            s.summary.volatility
        ));
    }

    let best = s
        .activity_moods
        .iter()
        .filter(|a| a.compared_to_overall > 0.0)
        .max_by(|a, b| a.compared_to_overall.total_cmp(&b.compared_to_overall));
    if let Some(best) = best {
        out.observations.push(format!(
            "Mood is {:.1} points higher than usual around '{}'.",
            best.compared_to_overall, best.activity
        ));
        out.recommendations
            .push(format!("Make more room for '{}'.", best.activity));
    }

    if s.category == MoodCategory::Concerning {
        out.alerts.push(Alert {
            severity: Severity::Medium,
            message: "Average mood is in the concerning range.".to_string(),
        });
    }

    out
}

pub fn health_insights(s: &HealthSnapshot) -> Insights {
    if s.total_measurements == 0 {
        return no_data("health measurements");
    }

    let mut out = Insights {
        source: InsightSource::Rules,
        ..Default::default()
    };

    let summary = if s.health_score >= 0.8 {
        "Overall health indicators are within good ranges.".to_string()
    } else if s.health_score >= 0.6 {
        "Health indicators are moderate, with some areas to watch.".to_string()
    } else {
        out.alerts.push(Alert {
            severity: Severity::Medium,
            message: format!("Health score is low ({:.2}).", s.health_score),
        });
        "Several health indicators need attention.".to_string()
    };
    out.summary = summary;

    let by_direction = |dir: TrendDirection| {
        s.metrics
            .iter()
            .filter(|m| m.trend.direction == dir)
            .map(|m| m.metric_type.as_str())
            .collect::<Vec<_>>()
    };
    let rising = by_direction(TrendDirection::Improving);
    if !rising.is_empty() {
        out.observations
            .push(format!("Increasing: {}.", rising.join(", ")));
    }
    let falling = by_direction(TrendDirection::Declining);
    if !falling.is_empty() {
        out.observations
            .push(format!("Decreasing: {}.", falling.join(", ")));
    }

    for flag in s.flags.iter().filter(|f| f.kind.is_critical()) {
        if flag.severity == Severity::High {
            out.alerts.push(Alert {
                severity: Severity::High,
                message: format!("Critical {} reading for {}.", flag.kind.as_str(), flag.metric),
            });
        }
    }
    if s.count_flags(Severity::High) > 0 {
        out.recommendations
            .push("Share the flagged readings with a healthcare provider.".to_string());
    }

    for risk in &s.risks {
        match risk.kind {
            RiskKind::DecliningVital => out.alerts.push(Alert {
                severity: risk.severity,
                message: format!("{} is declining steadily.", risk.metric),
            }),
            RiskKind::HighVariability => out.observations.push(format!(
                "{} readings vary widely between measurements.",
                risk.metric
            )),
            _ => {}
        }
    }

    if !s.compliance.is_empty() && s.overall_compliance < LOW_COMPLIANCE {
        out.observations
            .push("Low health data recording frequency detected.".to_string());
        out.recommendations
            .push("Record vitals on a regular schedule for more reliable trends.".to_string());
    }

    out
}

pub fn chat_insights(s: &ChatSnapshot) -> Insights {
    if s.total_messages == 0 {
        return no_data("chat messages");
    }

    let mut out = Insights {
        source: InsightSource::Rules,
        ..Default::default()
    };

    let engagement = match s.engagement {
        EngagementLevel::High => "high",
        EngagementLevel::Medium => "medium",
        EngagementLevel::Low => "low",
        EngagementLevel::NoData => "no",
    };
    out.summary = format!(
        "{} messages with {engagement} engagement; {} user messages.",
        s.total_messages, s.user_messages
    );

    if let Some(peak) = &s.peak_hour {
        out.observations
            .push(format!("Most active around {:02}:00.", peak.key));
    }
    if let Some(day) = &s.peak_weekday {
        out.observations
            .push(format!("Busiest day is {}.", day.key));
    }

    let distress: Vec<&str> = s
        .top_keywords
        .iter()
        .map(|p| p.key.as_str())
        .filter(|k| DISTRESS_KEYWORDS.contains(k))
        .collect();
    if !distress.is_empty() {
        out.observations.push(format!(
            "Conversations frequently mention {}.",
            distress.join(", ")
        ));
        out.recommendations
            .push("Offer coping resources related to these topics.".to_string());
    }

    if s.engagement == EngagementLevel::Low {
        out.recommendations
            .push("Try open questions to encourage longer conversations.".to_string());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindcare_schema::{Peak, RiskDetail, RiskFlag, TrendResult};

    #[test]
    fn empty_snapshots_ask_for_data() {
        let insights = rule_insights(&DomainSnapshot::Chat(ChatSnapshot::default()));
        assert_eq!(insights.source, InsightSource::Rules);
        assert!(insights.summary.contains("No chat messages"));
    }

    #[test]
    fn concerning_declining_mood_alerts() {
        let snap = MoodSnapshot {
            total_logs: 8,
            category: MoodCategory::Concerning,
            summary: TrendResult {
                mean: 3.2,
                ..Default::default()
            },
            daily_trend: TrendResult {
                direction: TrendDirection::Declining,
                ..Default::default()
            },
            ..Default::default()
        };
        let insights = mood_insights(&snap);
        assert!(insights.summary.contains("3.2/10"));
        assert_eq!(insights.alerts.len(), 1);
        assert!(!insights.recommendations.is_empty());
    }

    #[test]
    fn high_flags_and_declining_vitals_become_alerts() {
        let critical = RiskFlag {
            metric: "heart_rate".into(),
            severity: Severity::High,
            kind: RiskKind::CriticalHigh,
            detail: RiskDetail::Threshold {
                value: 150.0,
                low: 50.0,
                high: 120.0,
                index: Some(0),
            },
        };
        let declining = RiskFlag {
            metric: "oxygen_saturation".into(),
            severity: Severity::High,
            kind: RiskKind::DecliningVital,
            detail: RiskDetail::Trend {
                strength: 0.9,
                slope: -1.0,
            },
        };
        let snap = HealthSnapshot {
            total_measurements: 5,
            flags: vec![critical],
            risks: vec![declining],
            health_score: 0.5,
            ..Default::default()
        };
        let insights = health_insights(&snap);
        assert_eq!(insights.alerts.len(), 3);
        assert!(insights
            .alerts
            .iter()
            .any(|a| a.message.contains("oxygen_saturation is declining")));
        assert!(insights.summary.contains("need attention"));
    }

    #[test]
    fn distress_keywords_are_called_out() {
        let snap = ChatSnapshot {
            total_messages: 10,
            user_messages: 6,
            engagement: EngagementLevel::Low,
            top_keywords: vec![
                Peak {
                    key: "feel".into(),
                    count: 4,
                },
                Peak {
                    key: "anxiety".into(),
                    count: 2,
                },
            ],
            ..Default::default()
        };
        let insights = chat_insights(&snap);
        assert!(insights.observations.iter().any(|o| o.contains("anxiety")));
        assert_eq!(insights.recommendations.len(), 2);
    }
}
