use std::collections::BTreeMap;

use mindcare_schema::{
    ReferenceRange, RiskDetail, RiskFlag, RiskKind, Severity, Thresholds, TrendDirection,
    TrendResult, BLOOD_PRESSURE_SYSTOLIC, HEART_RATE, OXYGEN_SATURATION,
};

use crate::config::MindcareConfig;
use crate::trend::{coefficient_of_variation, mean, sample_std_dev};

/// Fraction past a critical bound at which a flag escalates to high.
pub const HIGH_SEVERITY_MARGIN: f64 = 0.2;

/// Vitals whose sustained decline is itself a risk.
pub const CRITICAL_VITALS: [&str; 3] = [BLOOD_PRESSURE_SYSTOLIC, HEART_RATE, OXYGEN_SATURATION];

pub const DECLINING_VITAL_MIN_STRENGTH: f64 = 0.6;
pub const HIGH_VARIABILITY_CV: f64 = 0.2;
pub const HIGH_VARIABILITY_MIN_SAMPLES: usize = 5;

/// Classify one value against a critical `{low, high}` pair.
///
/// Values strictly outside the pair are flagged `medium`, escalating to `high`
/// at 20% past the bound.
pub fn flag(metric: &str, value: f64, thresholds: Thresholds) -> Option<RiskFlag> {
    flag_at(metric, value, thresholds, None)
}

fn flag_at(
    metric: &str,
    value: f64,
    thresholds: Thresholds,
    index: Option<usize>,
) -> Option<RiskFlag> {
    let Thresholds { low, high } = thresholds;
    let kind = if value < low {
        RiskKind::CriticalLow
    } else if value > high {
        RiskKind::CriticalHigh
    } else {
        return None;
    };
    let severity = if value <= low * (1.0 - HIGH_SEVERITY_MARGIN)
        || value >= high * (1.0 + HIGH_SEVERITY_MARGIN)
    {
        Severity::High
    } else {
        Severity::Medium
    };
    Some(RiskFlag {
        metric: metric.to_string(),
        severity,
        kind,
        detail: RiskDetail::Threshold {
            value,
            low,
            high,
            index,
        },
    })
}

/// Z-score outliers against the sample's own mean and sample deviation.
///
/// Needs at least `min_samples` values; a zero deviation yields no outliers.
pub fn outliers(
    metric: &str,
    values: &[f64],
    medium_z: f64,
    high_z: f64,
    min_samples: usize,
) -> Vec<RiskFlag> {
    if values.len() < min_samples {
        return Vec::new();
    }
    let m = mean(values);
    let sd = sample_std_dev(values);
    if sd == 0.0 {
        return Vec::new();
    }

    values
        .iter()
        .enumerate()
        .filter_map(|(index, &value)| {
            let z = ((value - m) / sd).abs();
            let severity = if z > high_z {
                Severity::High
            } else if z > medium_z {
                Severity::Medium
            } else {
                return None;
            };
            Some(RiskFlag {
                metric: metric.to_string(),
                severity,
                kind: RiskKind::StatisticalOutlier,
                detail: RiskDetail::Outlier {
                    value,
                    z_score: z,
                    mean: m,
                    std_dev: sd,
                    index: Some(index),
                },
            })
        })
        .collect()
}

/// Applies per-metric threshold and reference tables.
#[derive(Debug, Clone)]
pub struct RiskFlagger {
    thresholds: BTreeMap<String, Thresholds>,
    reference_ranges: BTreeMap<String, ReferenceRange>,
    outlier_medium_z: f64,
    outlier_high_z: f64,
    min_outlier_samples: usize,
}

impl Default for RiskFlagger {
    fn default() -> Self {
        Self::from_config(&MindcareConfig::default())
    }
}

impl RiskFlagger {
    pub fn from_config(config: &MindcareConfig) -> Self {
        Self {
            thresholds: config.effective_thresholds(),
            reference_ranges: config.effective_reference_ranges(),
            outlier_medium_z: config.analytics.outlier_medium_z,
            outlier_high_z: config.analytics.outlier_high_z,
            min_outlier_samples: config.analytics.min_outlier_samples,
        }
    }

    pub fn thresholds_for(&self, metric: &str) -> Option<Thresholds> {
        self.thresholds.get(metric).copied()
    }

    pub fn reference_range_for(&self, metric: &str) -> Option<ReferenceRange> {
        self.reference_ranges.get(metric).copied()
    }

    /// Critical flag for `metric`, or `None` when the value is inside its
    /// thresholds or the metric has none.
    pub fn check(&self, metric: &str, value: f64) -> Option<RiskFlag> {
        flag(metric, value, self.thresholds_for(metric)?)
    }

    /// Critical flags across an ordered series, each carrying its index.
    pub fn flag_series(&self, metric: &str, values: &[f64]) -> Vec<RiskFlag> {
        let Some(thresholds) = self.thresholds_for(metric) else {
            return Vec::new();
        };
        values
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| flag_at(metric, v, thresholds, Some(i)))
            .collect()
    }

    pub fn outliers(&self, metric: &str, values: &[f64]) -> Vec<RiskFlag> {
        outliers(
            metric,
            values,
            self.outlier_medium_z,
            self.outlier_high_z,
            self.min_outlier_samples,
        )
    }

    /// Low-severity flag for a value outside the normal band that did not trip
    /// a critical threshold.
    pub fn reference_range_flag(
        &self,
        metric: &str,
        value: f64,
        index: Option<usize>,
    ) -> Option<RiskFlag> {
        let range = self.reference_range_for(metric)?;
        if range.contains(value) || self.check(metric, value).is_some() {
            return None;
        }
        Some(RiskFlag {
            metric: metric.to_string(),
            severity: Severity::Low,
            kind: RiskKind::OutOfReferenceRange,
            detail: RiskDetail::Threshold {
                value,
                low: range.min,
                high: range.max,
                index,
            },
        })
    }

    /// Risks read off a whole series: a strongly declining critical vital,
    /// and high relative variability in a metric with critical thresholds.
    pub fn trend_risks(&self, metric: &str, trend: &TrendResult, values: &[f64]) -> Vec<RiskFlag> {
        let mut risks = Vec::new();

        if CRITICAL_VITALS.contains(&metric)
            && trend.direction == TrendDirection::Declining
            && trend.strength > DECLINING_VITAL_MIN_STRENGTH
        {
            risks.push(RiskFlag {
                metric: metric.to_string(),
                severity: Severity::High,
                kind: RiskKind::DecliningVital,
                detail: RiskDetail::Trend {
                    strength: trend.strength,
                    slope: trend.slope,
                },
            });
        }

        if self.thresholds.contains_key(metric) && values.len() >= HIGH_VARIABILITY_MIN_SAMPLES {
            let cv = coefficient_of_variation(values);
            if cv > HIGH_VARIABILITY_CV {
                risks.push(RiskFlag {
                    metric: metric.to_string(),
                    severity: Severity::Medium,
                    kind: RiskKind::HighVariability,
                    detail: RiskDetail::Variability {
                        coefficient_of_variation: cv,
                    },
                });
            }
        }

        risks
    }
}
