use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use mindcare_schema::{parse_timestamp, ChatMessage, Domain, HealthMetric, MoodLog};
use serde::Deserialize;
use serde_json::Value;

/// Health reading as exported by the collection layer. `value` may be a number
/// or a string such as `"120/80"`.
#[derive(Debug, Deserialize)]
struct RawHealthMetric {
    metric_type: String,
    value: Value,
    timestamp: String,
}

/// Records for one analysis run, already split by domain.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisInput {
    Mood(Vec<MoodLog>),
    Health(Vec<HealthMetric>),
    Chat(Vec<ChatMessage>),
}

impl AnalysisInput {
    /// Parse a JSON array of records for `domain`.
    ///
    /// Unparseable health readings are skipped with a warning; any other
    /// malformed record fails the whole input.
    pub fn from_json(domain: Domain, raw: &str) -> Result<Self> {
        match domain {
            Domain::Mood => {
                let logs: Vec<MoodLog> =
                    serde_json::from_str(raw).context("failed to parse mood logs")?;
                Ok(Self::Mood(logs))
            }
            Domain::Chat => {
                let messages: Vec<ChatMessage> =
                    serde_json::from_str(raw).context("failed to parse chat messages")?;
                Ok(Self::Chat(messages))
            }
            Domain::Health => {
                let rows: Vec<RawHealthMetric> =
                    serde_json::from_str(raw).context("failed to parse health metrics")?;
                let mut metrics = Vec::with_capacity(rows.len());
                for row in rows {
                    match parse_health_row(&row) {
                        Ok(parsed) => metrics.extend(parsed),
                        Err(e) => tracing::warn!(
                            metric = %row.metric_type,
                            "skipping health reading: {e}"
                        ),
                    }
                }
                Ok(Self::Health(metrics))
            }
        }
    }

    pub fn domain(&self) -> Domain {
        match self {
            Self::Mood(_) => Domain::Mood,
            Self::Health(_) => Domain::Health,
            Self::Chat(_) => Domain::Chat,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Mood(v) => v.len(),
            Self::Health(v) => v.len(),
            Self::Chat(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Mood(v) => v.iter().map(|r| r.timestamp).max(),
            Self::Health(v) => v.iter().map(|r| r.timestamp).max(),
            Self::Chat(v) => v.iter().map(|r| r.timestamp).max(),
        }
    }

    /// Keep records within `window_days` ending at `end` (inclusive).
    pub fn retain_window(&mut self, window_days: u32, end: DateTime<Utc>) {
        let start = end - Duration::days(i64::from(window_days));
        let keep = |ts: DateTime<Utc>| ts >= start && ts <= end;
        match self {
            Self::Mood(v) => v.retain(|r| keep(r.timestamp)),
            Self::Health(v) => v.retain(|r| keep(r.timestamp)),
            Self::Chat(v) => v.retain(|r| keep(r.timestamp)),
        }
    }
}

fn parse_health_row(row: &RawHealthMetric) -> Result<Vec<HealthMetric>> {
    let timestamp = parse_timestamp(&row.timestamp)?;
    let raw = match &row.value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => anyhow::bail!("unsupported value: {other}"),
    };
    Ok(HealthMetric::from_raw(&row.metric_type, &raw, timestamp)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mindcare_schema::{BLOOD_PRESSURE_DIASTOLIC, HEART_RATE};

    #[test]
    fn health_rows_split_blood_pressure_and_skip_bad_values() {
        let raw = r#"[
            {"metric_type": "blood_pressure", "value": "122/81", "timestamp": "2024-06-01T08:00:00Z"},
            {"metric_type": "heart_rate", "value": 71, "timestamp": "2024-06-01T08:05:00"},
            {"metric_type": "heart_rate", "value": "fast", "timestamp": "2024-06-02T08:00:00Z"},
            {"metric_type": "heart_rate", "value": 70, "timestamp": "yesterday"}
        ]"#;
        let input = AnalysisInput::from_json(Domain::Health, raw).unwrap();
        let AnalysisInput::Health(metrics) = input else {
            panic!("expected health input");
        };
        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics[1].metric_type, BLOOD_PRESSURE_DIASTOLIC);
        assert_eq!(metrics[2].metric_type, HEART_RATE);
        assert_eq!(metrics[2].value, 71.0);
    }

    #[test]
    fn non_finite_string_values_are_skipped() {
        let raw = r#"[
            {"metric_type": "heart_rate", "value": "inf", "timestamp": "2024-06-01T08:00:00Z"},
            {"metric_type": "heart_rate", "value": "NaN", "timestamp": "2024-06-02T08:00:00Z"},
            {"metric_type": "heart_rate", "value": 68, "timestamp": "2024-06-03T08:00:00Z"}
        ]"#;
        let AnalysisInput::Health(metrics) = AnalysisInput::from_json(Domain::Health, raw).unwrap()
        else {
            panic!("expected health input");
        };
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].value, 68.0);
    }

    #[test]
    fn malformed_mood_input_is_an_error() {
        let err = AnalysisInput::from_json(Domain::Mood, r#"[{"score": "high"}]"#).unwrap_err();
        assert!(err.to_string().contains("failed to parse mood logs"));
    }

    #[test]
    fn retain_window_anchors_on_end() {
        let end = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let mut input = AnalysisInput::Chat(vec![
            ChatMessage::user("old", end - Duration::days(40)),
            ChatMessage::user("recent", end - Duration::days(3)),
            ChatMessage::user("edge", end - Duration::days(30)),
        ]);
        assert_eq!(input.latest_timestamp(), Some(end - Duration::days(3)));
        input.retain_window(30, end);
        assert_eq!(input.len(), 2);
        assert_eq!(input.domain(), Domain::Chat);
    }
}
