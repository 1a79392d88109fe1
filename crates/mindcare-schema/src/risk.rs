use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    CriticalLow,
    CriticalHigh,
    StatisticalOutlier,
    OutOfReferenceRange,
    DecliningVital,
    HighVariability,
}

impl RiskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CriticalLow => "critical_low",
            Self::CriticalHigh => "critical_high",
            Self::StatisticalOutlier => "statistical_outlier",
            Self::OutOfReferenceRange => "out_of_reference_range",
            Self::DecliningVital => "declining_vital",
            Self::HighVariability => "high_variability",
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Self::CriticalLow | Self::CriticalHigh)
    }
}

/// Per-kind evidence attached to a flag. Serializes as a flat JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RiskDetail {
    Outlier {
        value: f64,
        z_score: f64,
        mean: f64,
        std_dev: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    Threshold {
        value: f64,
        low: f64,
        high: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    Trend {
        strength: f64,
        slope: f64,
    },
    Variability {
        coefficient_of_variation: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFlag {
    pub metric: String,
    pub severity: Severity,
    pub kind: RiskKind,
    pub detail: RiskDetail,
}

/// Critical `{low, high}` pair for one metric. Values strictly beyond either
/// bound are flagged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub low: f64,
    pub high: f64,
}

impl Thresholds {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

/// Normal `{min, max}` band for one metric, with an optional narrower optimal
/// band inside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimal_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimal_max: Option<f64>,
}

impl ReferenceRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            optimal_min: None,
            optimal_max: None,
        }
    }

    pub const fn with_optimal(mut self, min: f64, max: f64) -> Self {
        self.optimal_min = Some(min);
        self.optimal_max = Some(max);
        self
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// `None` when no optimal band is configured.
    pub fn is_optimal(&self, value: f64) -> Option<bool> {
        match (self.optimal_min, self.optimal_max) {
            (Some(lo), Some(hi)) => Some(value >= lo && value <= hi),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_low_to_high() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn risk_flag_detail_is_flat_mapping() {
        let flag = RiskFlag {
            metric: "heart_rate".into(),
            severity: Severity::Medium,
            kind: RiskKind::CriticalHigh,
            detail: RiskDetail::Threshold {
                value: 130.0,
                low: 50.0,
                high: 120.0,
                index: None,
            },
        };
        let json = serde_json::to_value(&flag).unwrap();
        assert_eq!(json["kind"], "critical_high");
        assert_eq!(json["severity"], "medium");
        assert_eq!(json["detail"]["high"], 120.0);
        assert!(json["detail"].get("index").is_none());
    }

    #[test]
    fn outlier_detail_parses_back_to_outlier_variant() {
        let raw = r#"{"value": 180.0, "z_score": 3.2, "mean": 70.0, "std_dev": 30.0, "index": 4}"#;
        let detail: RiskDetail = serde_json::from_str(raw).unwrap();
        assert!(matches!(detail, RiskDetail::Outlier { index: Some(4), .. }));
    }

    #[test]
    fn reference_range_is_inclusive() {
        let range = ReferenceRange::new(60.0, 100.0);
        assert!(range.contains(60.0));
        assert!(range.contains(100.0));
        assert!(!range.contains(100.5));
        assert_eq!(range.is_optimal(70.0), None);
    }

    #[test]
    fn optimal_band_parses_from_yaml_shape() {
        let raw = r#"{"min": 60.0, "max": 100.0, "optimal_min": 60.0, "optimal_max": 80.0}"#;
        let range: ReferenceRange = serde_json::from_str(raw).unwrap();
        assert_eq!(range, ReferenceRange::new(60.0, 100.0).with_optimal(60.0, 80.0));
        assert_eq!(range.is_optimal(85.0), Some(false));
    }
}
