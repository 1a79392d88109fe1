use serde::{Deserialize, Serialize};

/// Direction of a time-ordered series, from the sign of its regression slope.
///
/// `Improving` means the values rise over the window. Whether rising is good for
/// a given metric is left to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    #[default]
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Declining => "declining",
            Self::Stable => "stable",
        }
    }

    /// Value-movement wording used for raw vitals, where "improving" would
    /// imply a clinical judgement.
    pub fn movement(&self) -> &'static str {
        match self {
            Self::Improving => "increasing",
            Self::Declining => "decreasing",
            Self::Stable => "stable",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TrendResult {
    pub direction: TrendDirection,
    /// Always within `[0, 1]`.
    pub strength: f64,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    /// Sample standard deviation; zero below two observations.
    pub volatility: f64,
    /// Raw OLS slope of value against 0-based index.
    pub slope: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<f64>,
    /// Within `[0, 0.8]` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl TrendResult {
    /// Result for an empty window.
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn is_neutral(&self) -> bool {
        self.count == 0
    }
}
