use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors raised while turning raw collected records into typed values.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("invalid numeric value for {metric}: {raw}")]
    InvalidValue { metric: String, raw: String },
    #[error("invalid blood pressure reading: {0} (expected systolic/diastolic)")]
    InvalidBloodPressure(String),
}

/// A single timestamped numeric measurement handed to the calculators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub value: f64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Observation {
    pub fn new(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            value,
            timestamp,
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn parse(
        value: f64,
        timestamp: &str,
        category: Option<&str>,
    ) -> Result<Self, RecordError> {
        Ok(Self {
            value,
            timestamp: parse_timestamp(timestamp)?,
            category: category.map(str::to_string),
        })
    }
}

/// Extract the bare values of an ordered observation window.
pub fn values_of(observations: &[Observation]) -> Vec<f64> {
    observations.iter().map(|o| o.value).collect()
}

/// Parse RFC 3339 (`Z` or offset suffix) or a naive ISO-8601 datetime, which is
/// taken to be UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, RecordError> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(RecordError::InvalidTimestamp(input.to_string()))
}

pub(crate) fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}
