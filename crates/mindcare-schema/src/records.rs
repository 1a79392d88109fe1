use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::observation::{deserialize_timestamp, Observation, RecordError};

pub const BLOOD_PRESSURE: &str = "blood_pressure";
pub const BLOOD_PRESSURE_SYSTOLIC: &str = "blood_pressure_systolic";
pub const BLOOD_PRESSURE_DIASTOLIC: &str = "blood_pressure_diastolic";
pub const HEART_RATE: &str = "heart_rate";
pub const WEIGHT: &str = "weight";
pub const TEMPERATURE: &str = "temperature";
pub const BLOOD_GLUCOSE: &str = "blood_glucose";
pub const OXYGEN_SATURATION: &str = "oxygen_saturation";
pub const PAIN_LEVEL: &str = "pain_level";

/// One mood log entry. Scores are on a 1-10 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodLog {
    pub score: f64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default)]
    pub energy_level: Option<f64>,
}

impl MoodLog {
    pub fn new(score: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            score,
            timestamp,
            activities: Vec::new(),
            energy_level: None,
        }
    }

    pub fn with_activities<I, S>(mut self, activities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.activities = activities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy_level = Some(energy);
        self
    }

    pub fn to_observation(&self) -> Observation {
        Observation::new(self.score, self.timestamp).with_category("mood")
    }
}

/// One numeric health measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetric {
    pub metric_type: String,
    pub value: f64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl HealthMetric {
    pub fn new(metric_type: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            metric_type: metric_type.into(),
            value,
            timestamp,
        }
    }

    /// Parse a raw reading as stored by the collection layer.
    ///
    /// `blood_pressure` readings in `"120/80"` form split into a systolic and a
    /// diastolic metric; every other type must be a plain number.
    pub fn from_raw(
        metric_type: &str,
        raw: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<Self>, RecordError> {
        let raw = raw.trim();
        if metric_type == BLOOD_PRESSURE {
            let (systolic, diastolic) = raw
                .split_once('/')
                .ok_or_else(|| RecordError::InvalidBloodPressure(raw.to_string()))?;
            let parse = |s: &str| {
                s.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| RecordError::InvalidBloodPressure(raw.to_string()))
            };
            return Ok(vec![
                Self::new(BLOOD_PRESSURE_SYSTOLIC, parse(systolic)?, timestamp),
                Self::new(BLOOD_PRESSURE_DIASTOLIC, parse(diastolic)?, timestamp),
            ]);
        }

        let value = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| RecordError::InvalidValue {
                metric: metric_type.to_string(),
                raw: raw.to_string(),
            })?;
        Ok(vec![Self::new(metric_type, value, timestamp)])
    }

    pub fn to_observation(&self) -> Observation {
        Observation::new(self.value, self.timestamp).with_category(self.metric_type.clone())
    }
}

/// One chatbot conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub content: String,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            content: content.into(),
            is_bot: false,
            timestamp,
        }
    }

    pub fn bot(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            content: content.into(),
            is_bot: true,
            timestamp,
        }
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}
