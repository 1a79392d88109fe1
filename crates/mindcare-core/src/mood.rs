use std::collections::HashSet;

use mindcare_schema::{ActivityMood, MoodCategory, MoodLog, MoodSnapshot, Observation};

use crate::config::AnalyticsConfig;
use crate::pattern::{average_by, average_by_many, group_by_many, hour_of_day, ratio, weekday_name};
use crate::trend::{daily_means, TrendStatsCalculator};

pub const MOOD_SCALE_MIN: f64 = 1.0;
pub const MOOD_SCALE_MAX: f64 = 10.0;

/// Hourly mood pattern needs more logs than this.
pub const HOURLY_PATTERN_MIN_LOGS: usize = 10;

pub const POSITIVE_MOOD: f64 = 7.0;
pub const NEUTRAL_MOOD: f64 = 4.0;

pub fn mood_category(average: f64) -> MoodCategory {
    if average >= POSITIVE_MOOD {
        MoodCategory::Positive
    } else if average >= NEUTRAL_MOOD {
        MoodCategory::Neutral
    } else {
        MoodCategory::Concerning
    }
}

pub struct MoodAnalyzer {
    calculator: TrendStatsCalculator,
}

impl MoodAnalyzer {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            calculator: TrendStatsCalculator::from_config(config)
                .with_prediction_bounds(MOOD_SCALE_MIN, MOOD_SCALE_MAX),
        }
    }

    pub fn analyze(&self, logs: &[MoodLog]) -> MoodSnapshot {
        if logs.is_empty() {
            return MoodSnapshot::default();
        }

        let mut logs = logs.to_vec();
        logs.sort_by_key(|l| l.timestamp);

        let scores: Vec<f64> = logs.iter().map(|l| l.score).collect();
        let summary = self.calculator.compute(&scores);

        let observations: Vec<Observation> = logs.iter().map(MoodLog::to_observation).collect();
        let daily = daily_means(&observations);
        let daily_values: Vec<f64> = daily.iter().map(|d| d.mean).collect();
        let daily_trend = self.calculator.compute(&daily_values);

        let weekday_pattern = average_by(&logs, |l| weekday_name(&l.timestamp), |l| l.score);
        let hourly_pattern = if logs.len() > HOURLY_PATTERN_MIN_LOGS {
            average_by(&logs, |l| hour_of_day(&l.timestamp), |l| l.score)
        } else {
            Vec::new()
        };

        let activity_frequency = group_by_many(&logs, |l| l.activities.clone());
        let overall = summary.mean;
        let activity_moods = average_by_many(&logs, |l| l.activities.clone(), |l| l.score)
            .into_iter()
            .filter(|b| b.count > 1)
            .map(|b| ActivityMood {
                activity: b.key,
                average_mood: b.mean,
                sessions: b.count,
                compared_to_overall: b.mean - overall,
            })
            .collect();

        let unique: HashSet<&str> = logs
            .iter()
            .flat_map(|l| l.activities.iter().map(String::as_str))
            .collect();
        let activity_diversity = ratio(unique.len() as f64, activity_frequency.total() as f64);

        let energy: Vec<f64> = logs.iter().filter_map(|l| l.energy_level).collect();
        let energy_trend = (!energy.is_empty()).then(|| self.calculator.compute(&energy));

        tracing::debug!(
            logs = logs.len(),
            days = daily.len(),
            direction = %daily_trend.direction,
            "analyzed mood window"
        );

        MoodSnapshot {
            total_logs: logs.len(),
            category: mood_category(summary.mean),
            summary,
            daily_trend,
            daily_means: daily,
            weekday_pattern,
            hourly_pattern,
            activity_frequency,
            activity_moods,
            activity_diversity,
            energy_trend,
        }
    }
}
