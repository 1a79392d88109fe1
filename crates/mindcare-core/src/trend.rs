use std::collections::BTreeMap;

use mindcare_schema::{DailyMean, Observation, TrendDirection, TrendResult};

use crate::config::AnalyticsConfig;

/// Fewer points than this never yield a direction.
pub const MIN_TREND_POINTS: usize = 3;

/// Slope magnitude below `SLOPE_EPSILON * sensitivity` reads as stable.
pub const SLOPE_EPSILON: f64 = 0.01;

/// Confidence attached to a prediction never exceeds this.
pub const MAX_CONFIDENCE: f64 = 0.8;

/// Descriptive statistics and regression trend over an ordered series.
///
/// Direction comes from the raw ordinary-least-squares slope of value against
/// 0-based index. Strength normalises that slope by the series range and
/// length, so a perfectly linear ramp over its own range scores 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendStatsCalculator {
    sensitivity: f64,
    bounds: Option<(f64, f64)>,
}

impl Default for TrendStatsCalculator {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl TrendStatsCalculator {
    pub fn new(sensitivity: f64) -> Self {
        Self {
            sensitivity,
            bounds: None,
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(config.trend_sensitivity)
    }

    /// Clamp predictions into `[min, max]`.
    pub fn with_prediction_bounds(mut self, min: f64, max: f64) -> Self {
        self.bounds = Some((min, max));
        self
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn compute(&self, values: &[f64]) -> TrendResult {
        let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let n = values.len();
        if n == 0 {
            return TrendResult::neutral();
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut result = TrendResult {
            count: n,
            mean: mean(&values),
            median: median(&values),
            min,
            max,
            range: max - min,
            volatility: sample_std_dev(&values),
            ..TrendResult::neutral()
        };

        let Some(slope) = ols_slope(&values) else {
            return result;
        };
        result.slope = slope;
        if n < MIN_TREND_POINTS {
            return result;
        }

        let tail = &values[n - MIN_TREND_POINTS..];
        let step = ols_slope(tail).unwrap_or(0.0);
        let mut prediction = values[n - 1] + step;
        if let Some((lo, hi)) = self.bounds {
            prediction = prediction.clamp(lo, hi);
        }

        if result.range > 0.0 {
            result.strength = (slope.abs() / result.range * n as f64).min(1.0);
            let threshold = SLOPE_EPSILON * self.sensitivity;
            result.direction = if slope > threshold {
                TrendDirection::Improving
            } else if slope < -threshold {
                TrendDirection::Declining
            } else {
                TrendDirection::Stable
            };
        }
        result.prediction = Some(prediction);
        result.confidence = Some(result.strength.min(MAX_CONFIDENCE));

        tracing::trace!(
            n,
            slope,
            direction = %result.direction,
            strength = result.strength,
            "computed trend"
        );
        result
    }

    /// Trend over observation values after ordering them by timestamp.
    pub fn compute_observations(&self, observations: &[Observation]) -> TrendResult {
        let mut ordered: Vec<&Observation> = observations.iter().collect();
        ordered.sort_by_key(|o| o.timestamp);
        let values: Vec<f64> = ordered.iter().map(|o| o.value).collect();
        self.compute(&values)
    }
}

// ============================================================
// Descriptive helpers
// ============================================================

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample (n - 1) standard deviation; zero below two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Population (n) variance; zero for an empty slice.
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// `(n·Σxy − Σx·Σy) / (n·Σx² − (Σx)²)` with `x` the 0-based index.
/// `None` when the denominator vanishes.
pub fn ols_slope(values: &[f64]) -> Option<f64> {
    let n = values.len() as f64;
    let (mut sx, mut sy, mut sxy, mut sxx) = (0.0, 0.0, 0.0, 0.0);
    for (i, &y) in values.iter().enumerate() {
        let x = i as f64;
        sx += x;
        sy += y;
        sxy += x * y;
        sxx += x * x;
    }
    let denom = n * sxx - sx * sx;
    if denom == 0.0 {
        return None;
    }
    Some((n * sxy - sx * sy) / denom)
}

/// Sample standard deviation over mean. Zero for fewer than two values or a
/// zero mean.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if values.len() < 2 || m == 0.0 {
        return 0.0;
    }
    sample_std_dev(values) / m.abs()
}

/// Per-calendar-day (UTC) means in date order.
pub fn daily_means(observations: &[Observation]) -> Vec<DailyMean> {
    let mut days: BTreeMap<chrono::NaiveDate, (f64, usize)> = BTreeMap::new();
    for obs in observations {
        let slot = days.entry(obs.timestamp.date_naive()).or_insert((0.0, 0));
        slot.0 += obs.value;
        slot.1 += 1;
    }
    days.into_iter()
        .map(|(date, (sum, count))| DailyMean {
            date,
            mean: sum / count as f64,
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn short_series_is_stable_with_zero_strength() {
        let calc = TrendStatsCalculator::default();
        for values in [vec![], vec![4.0], vec![1.0, 9.0]] {
            let r = calc.compute(&values);
            assert_eq!(r.direction, TrendDirection::Stable);
            assert_eq!(r.strength, 0.0);
            assert!(r.prediction.is_none());
        }
    }

    #[test]
    fn single_value_still_reports_descriptives() {
        let r = TrendStatsCalculator::default().compute(&[7.0]);
        assert_eq!(r.count, 1);
        assert_eq!(r.mean, 7.0);
        assert_eq!(r.median, 7.0);
        assert_eq!(r.volatility, 0.0);
    }

    #[test]
    fn increasing_ramp_is_improving_at_full_strength() {
        let r = TrendStatsCalculator::default().compute(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(r.direction, TrendDirection::Improving);
        assert!(approx(r.slope, 1.0));
        assert!(approx(r.strength, 1.0));
        assert!(approx(r.mean, 3.0));
        assert_eq!(r.prediction, Some(6.0));
        assert_eq!(r.confidence, Some(0.8));
    }

    #[test]
    fn decreasing_ramp_is_declining() {
        let r = TrendStatsCalculator::default().compute(&[9.0, 7.5, 6.0, 4.0]);
        assert_eq!(r.direction, TrendDirection::Declining);
        assert!(r.slope < 0.0);
        assert!(r.strength > 0.0 && r.strength <= 1.0);
    }

    #[test]
    fn constant_series_has_zero_volatility() {
        let r = TrendStatsCalculator::default().compute(&[5.0, 5.0, 5.0, 5.0]);
        assert_eq!(r.volatility, 0.0);
        assert_eq!(r.direction, TrendDirection::Stable);
        assert_eq!(r.strength, 0.0);
        assert_eq!(r.prediction, Some(5.0));
        assert_eq!(r.confidence, Some(0.0));
    }

    #[test]
    fn tiny_slope_is_stable_and_sensitivity_scales_threshold() {
        // slope 0.005 per step
        let values = [10.0, 10.005, 10.01, 10.015];
        let r = TrendStatsCalculator::default().compute(&values);
        assert_eq!(r.direction, TrendDirection::Stable);

        let r = TrendStatsCalculator::new(0.1).compute(&values);
        assert_eq!(r.direction, TrendDirection::Improving);
    }

    #[test]
    fn mean_matches_independent_mean() {
        let values = [3.5, 8.0, 1.25, 6.0, 2.0, 9.75];
        let expected = values.iter().sum::<f64>() / values.len() as f64;
        let r = TrendStatsCalculator::default().compute(&values);
        assert!(approx(r.mean, expected));
        assert_eq!(r.min, 1.25);
        assert_eq!(r.max, 9.75);
        assert!(approx(r.range, 8.5));
        assert!(approx(r.median, 4.75));
    }

    #[test]
    fn prediction_is_clamped_to_bounds() {
        let calc = TrendStatsCalculator::default().with_prediction_bounds(1.0, 10.0);
        let r = calc.compute(&[6.0, 8.0, 10.0]);
        assert_eq!(r.prediction, Some(10.0));
    }

    #[test]
    fn non_finite_values_are_ignored() {
        let r = TrendStatsCalculator::default().compute(&[1.0, f64::NAN, 2.0, 3.0]);
        assert_eq!(r.count, 3);
        assert_eq!(r.direction, TrendDirection::Improving);
    }

    #[test]
    fn observations_are_ordered_by_time() {
        let at = |h| Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0).unwrap();
        let obs = vec![
            Observation::new(3.0, at(12)),
            Observation::new(1.0, at(8)),
            Observation::new(2.0, at(10)),
        ];
        let r = TrendStatsCalculator::default().compute_observations(&obs);
        assert_eq!(r.direction, TrendDirection::Improving);
    }

    #[test]
    fn coefficient_of_variation_guards_zero_mean() {
        assert_eq!(coefficient_of_variation(&[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(coefficient_of_variation(&[4.0]), 0.0);
        let cv = coefficient_of_variation(&[10.0, 20.0, 30.0]);
        assert!(approx(cv, 0.5));
    }

    #[test]
    fn daily_means_collapse_by_date() {
        let obs = vec![
            Observation::new(4.0, Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap()),
            Observation::new(6.0, Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
            Observation::new(8.0, Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap()),
        ];
        let days = daily_means(&obs);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].mean, 7.0);
        assert_eq!(days[0].count, 2);
        assert_eq!(days[1].mean, 4.0);
    }

    #[test]
    fn ols_slope_needs_two_points() {
        assert_eq!(ols_slope(&[]), None);
        assert_eq!(ols_slope(&[3.0]), None);
        assert_eq!(ols_slope(&[1.0, 4.0]), Some(3.0));
    }
}
