use mindcare_schema::{
    ComplianceEntry, HealthMetric, HealthSnapshot, MetricSummary, PatternTable, ReferenceRange,
    TrendDirection, BLOOD_PRESSURE, BLOOD_PRESSURE_SYSTOLIC, HEART_RATE, WEIGHT,
};

use crate::config::MindcareConfig;
use crate::pattern::{group_by, hour_of_day, peak, weekday_name};
use crate::risk::RiskFlagger;
use crate::trend::{mean, population_variance, TrendStatsCalculator};

/// Recommended readings per week, keyed by the metric counted.
///
/// Blood pressure is counted through its systolic half so one cuff reading
/// counts once.
pub const RECOMMENDED_PER_WEEK: [(&str, &str, f64); 3] = [
    (BLOOD_PRESSURE, BLOOD_PRESSURE_SYSTOLIC, 3.0),
    (WEIGHT, WEIGHT, 1.0),
    (HEART_RATE, HEART_RATE, 2.0),
];

/// Each trend-derived risk takes this much off the risk component of the
/// health score.
pub const RISK_PENALTY: f64 = 0.2;

/// Score of one reading against its reference band.
pub fn reference_score(range: &ReferenceRange, value: f64) -> f64 {
    match range.is_optimal(value) {
        Some(true) => 1.0,
        Some(false) if range.contains(value) => 0.7,
        Some(false) => 0.3,
        None if range.contains(value) => 0.8,
        None => 0.2,
    }
}

/// `((improving - declining) / total + 1) / 2`, zero with no trends.
pub fn stability_index(directions: &[TrendDirection]) -> f64 {
    if directions.is_empty() {
        return 0.0;
    }
    let improving = directions
        .iter()
        .filter(|d| **d == TrendDirection::Improving)
        .count() as f64;
    let declining = directions
        .iter()
        .filter(|d| **d == TrendDirection::Declining)
        .count() as f64;
    ((improving - declining) / directions.len() as f64 + 1.0) / 2.0
}

/// `1 / (1 + var(interval_days) / 10)` over time-ordered readings; zero below
/// two readings.
pub fn measurement_consistency(metrics: &[HealthMetric]) -> f64 {
    if metrics.len() < 2 {
        return 0.0;
    }
    let intervals: Vec<f64> = metrics
        .windows(2)
        .map(|w| (w[1].timestamp - w[0].timestamp).num_days() as f64)
        .collect();
    1.0 / (1.0 + population_variance(&intervals) / 10.0)
}

pub struct HealthAnalyzer {
    calculator: TrendStatsCalculator,
    flagger: RiskFlagger,
}

impl HealthAnalyzer {
    pub fn new(config: &MindcareConfig) -> Self {
        Self {
            calculator: TrendStatsCalculator::from_config(&config.analytics),
            flagger: RiskFlagger::from_config(config),
        }
    }

    pub fn analyze(&self, metrics: &[HealthMetric], window_days: u32) -> HealthSnapshot {
        if metrics.is_empty() {
            return HealthSnapshot::default();
        }

        let mut metrics = metrics.to_vec();
        metrics.sort_by_key(|m| m.timestamp);

        let by_type = group_by(&metrics, |m| m.metric_type.clone());
        let mut summaries = Vec::with_capacity(by_type.len());
        let mut flags = Vec::new();
        let mut risks = Vec::new();
        let mut reference_scores = Vec::new();

        for (metric_type, _) in by_type.iter() {
            let values: Vec<f64> = metrics
                .iter()
                .filter(|m| &m.metric_type == metric_type)
                .map(|m| m.value)
                .collect();
            let trend = self.calculator.compute(&values);
            let latest = values.last().copied().unwrap_or_default();

            let critical = self.flagger.flag_series(metric_type, &values);
            let reference: Vec<_> = values
                .iter()
                .enumerate()
                .filter_map(|(i, &v)| self.flagger.reference_range_flag(metric_type, v, Some(i)))
                .collect();
            let out_of_range_count = match self.flagger.reference_range_for(metric_type) {
                Some(range) => values.iter().filter(|v| !range.contains(**v)).count(),
                None => critical.len(),
            };
            if let Some(range) = self.flagger.reference_range_for(metric_type) {
                reference_scores.push(reference_score(&range, latest));
            }

            flags.extend(critical);
            flags.extend(reference);
            flags.extend(self.flagger.outliers(metric_type, &values));
            risks.extend(self.flagger.trend_risks(metric_type, &trend, &values));

            summaries.push(MetricSummary {
                metric_type: metric_type.clone(),
                movement: trend.direction.movement().to_string(),
                trend,
                latest,
                out_of_range_count,
            });
        }

        let compliance = compliance(&by_type, window_days);
        let overall_compliance = mean(&compliance.iter().map(|c| c.rate).collect::<Vec<_>>());

        let directions: Vec<TrendDirection> = summaries.iter().map(|s| s.trend.direction).collect();
        let stability = stability_index(&directions);

        let mut components = Vec::new();
        if !reference_scores.is_empty() {
            components.push(mean(&reference_scores));
        }
        if stability > 0.0 {
            components.push(stability);
        }
        components.push((1.0 - RISK_PENALTY * risks.len() as f64).max(0.0));
        let health_score = mean(&components);

        let hourly_distribution: PatternTable<u32> = group_by(&metrics, |m| hour_of_day(&m.timestamp));
        let weekday_distribution = group_by(&metrics, |m| weekday_name(&m.timestamp));

        tracing::debug!(
            measurements = metrics.len(),
            metric_types = summaries.len(),
            flags = flags.len(),
            risks = risks.len(),
            health_score,
            "analyzed health window"
        );

        HealthSnapshot {
            total_measurements: metrics.len(),
            most_tracked_metric: peak(&by_type),
            metrics: summaries,
            flags,
            risks,
            compliance,
            overall_compliance,
            measurement_consistency: measurement_consistency(&metrics),
            stability_index: stability,
            health_score,
            peak_hour: peak(&hourly_distribution),
            hourly_distribution,
            peak_weekday: peak(&weekday_distribution),
            weekday_distribution,
        }
    }
}

fn compliance(by_type: &PatternTable<String>, window_days: u32) -> Vec<ComplianceEntry> {
    let weeks = window_days as f64 / 7.0;
    RECOMMENDED_PER_WEEK
        .iter()
        .filter_map(|(name, counted, per_week)| {
            let actual = by_type.get(&counted.to_string());
            if actual == 0 {
                return None;
            }
            // the reported count is floored, the rate uses the fractional expectation
            let expected = per_week * weeks;
            let rate = if expected > 0.0 {
                (actual as f64 / expected).min(1.0)
            } else {
                0.0
            };
            Some(ComplianceEntry {
                metric_type: name.to_string(),
                expected: expected as usize,
                actual,
                rate,
            })
        })
        .collect()
}
