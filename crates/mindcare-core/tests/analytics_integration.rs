use std::path::PathBuf;

use mindcare_core::{load_config, AnalysisInput, AnalyticsService, MindcareConfig};
use mindcare_schema::{
    Domain, DomainSnapshot, InsightSource, MoodCategory, RiskKind, Severity, TrendDirection,
};

fn fixture_config_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config")
}

#[test]
fn mood_report_from_json_records() {
    let raw = r#"[
        {"score": 3, "timestamp": "2024-05-01T09:00:00Z", "activities": ["work"]},
        {"score": 4, "timestamp": "2024-05-02T09:00:00Z", "activities": ["work", "walk"]},
        {"score": 6, "timestamp": "2024-05-03T09:00:00Z", "activities": ["walk"]},
        {"score": 7, "timestamp": "2024-05-04T09:00:00Z", "activities": ["walk", "friends"]},
        {"score": 8, "timestamp": "2024-05-05T09:00:00Z", "activities": ["friends"]}
    ]"#;
    let input = AnalysisInput::from_json(Domain::Mood, raw).unwrap();
    let service = AnalyticsService::new(&MindcareConfig::default());
    let report = service.report("subject-1", &input, 30);

    assert_eq!(report.domain(), Domain::Mood);
    assert_eq!(report.insights.source, InsightSource::Rules);
    let DomainSnapshot::Mood(snap) = &report.snapshot else {
        panic!("expected mood snapshot");
    };
    assert_eq!(snap.total_logs, 5);
    assert_eq!(snap.category, MoodCategory::Neutral);
    assert_eq!(snap.daily_trend.direction, TrendDirection::Improving);
    assert!(snap.daily_trend.prediction.unwrap() <= 10.0);
    assert_eq!(snap.activity_moods.len(), 3);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["snapshot"]["domain"], "mood");
    assert_eq!(json["snapshot"]["data"]["activity_frequency"]["walk"], 3);
}

#[test]
fn health_report_applies_configured_thresholds() {
    let config = load_config(&fixture_config_root()).unwrap();
    let service = AnalyticsService::new(&config);
    let raw = r#"[
        {"metric_type": "heart_rate", "value": 122, "timestamp": "2024-05-01T08:00:00Z"},
        {"metric_type": "heart_rate", "value": 124, "timestamp": "2024-05-02T08:00:00Z"},
        {"metric_type": "heart_rate", "value": 160, "timestamp": "2024-05-03T08:00:00Z"},
        {"metric_type": "blood_pressure", "value": "118/78", "timestamp": "2024-05-01T08:00:00Z"}
    ]"#;
    let input = AnalysisInput::from_json(Domain::Health, raw).unwrap();
    let report = service.report("subject-2", &input, 7);
    let DomainSnapshot::Health(snap) = &report.snapshot else {
        panic!("expected health snapshot");
    };

    // fixture raises the heart-rate ceiling to 125, so only 160 is critical
    let critical: Vec<_> = snap.flags.iter().filter(|f| f.kind.is_critical()).collect();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].kind, RiskKind::CriticalHigh);
    assert_eq!(critical[0].severity, Severity::High);
    assert_eq!(snap.total_measurements, 5);
    assert!(report
        .insights
        .alerts
        .iter()
        .any(|a| a.severity == Severity::High));
}

#[test]
fn chat_window_drops_old_messages() {
    let raw = r#"[
        {"content": "hello", "is_bot": false, "timestamp": "2024-01-01T10:00:00Z"},
        {"content": "I have anxiety today?", "is_bot": false, "timestamp": "2024-03-01T10:00:00Z"},
        {"content": "I'm here to help.", "is_bot": true, "timestamp": "2024-03-01T10:01:00Z"}
    ]"#;
    let mut input = AnalysisInput::from_json(Domain::Chat, raw).unwrap();
    let end = input.latest_timestamp().unwrap();
    input.retain_window(30, end);

    let report = AnalyticsService::new(&MindcareConfig::default()).report("s", &input, 30);
    let DomainSnapshot::Chat(snap) = &report.snapshot else {
        panic!("expected chat snapshot");
    };
    assert_eq!(snap.total_messages, 2);
    assert_eq!(snap.response_ratio, 1.0);
    assert_eq!(snap.keyword_mentions.get(&"anxiety".to_string()), 1);
}

#[test]
fn empty_input_still_reports() {
    let input = AnalysisInput::Health(Vec::new());
    let report = AnalyticsService::new(&MindcareConfig::default()).report("s", &input, 30);
    assert!(report.insights.summary.contains("No health measurements"));
}
