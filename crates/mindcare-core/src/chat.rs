use mindcare_schema::{ChatMessage, ChatSnapshot, EngagementLevel, LengthCategory, PatternTable};

use crate::config::AnalyticsConfig;
use crate::pattern::{
    count_keywords, day_of, group_by, hour_of_day, peak, percentage, ratio, top_n, weekday_name,
};
use crate::trend::{mean, TrendStatsCalculator};

pub const MENTAL_HEALTH_KEYWORDS: [&str; 20] = [
    "anxiety",
    "depression",
    "stress",
    "worry",
    "sad",
    "happy",
    "angry",
    "therapy",
    "counseling",
    "help",
    "support",
    "feel",
    "emotion",
    "mood",
    "mental",
    "health",
    "cope",
    "struggle",
    "better",
    "worse",
];

pub const TOP_KEYWORDS: usize = 5;

pub fn engagement_level(user_messages: usize, questions: usize, exclamations: usize) -> EngagementLevel {
    if user_messages == 0 {
        return EngagementLevel::NoData;
    }
    let score = ratio((questions + exclamations) as f64, user_messages as f64);
    if score >= 0.3 {
        EngagementLevel::High
    } else if score >= 0.15 {
        EngagementLevel::Medium
    } else {
        EngagementLevel::Low
    }
}

pub fn length_category(average_words: f64) -> LengthCategory {
    if average_words < 5.0 {
        LengthCategory::VeryShort
    } else if average_words < 15.0 {
        LengthCategory::Short
    } else if average_words < 30.0 {
        LengthCategory::Medium
    } else if average_words < 50.0 {
        LengthCategory::Long
    } else {
        LengthCategory::VeryLong
    }
}

pub struct ChatUsageAnalyzer {
    calculator: TrendStatsCalculator,
}

impl ChatUsageAnalyzer {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            calculator: TrendStatsCalculator::from_config(config),
        }
    }

    pub fn analyze(&self, messages: &[ChatMessage]) -> ChatSnapshot {
        if messages.is_empty() {
            return ChatSnapshot::default();
        }

        let mut messages = messages.to_vec();
        messages.sort_by_key(|m| m.timestamp);

        let (bot, user): (Vec<&ChatMessage>, Vec<&ChatMessage>) =
            messages.iter().partition(|m| m.is_bot);
        let total = messages.len();

        let char_len = |m: &&ChatMessage| m.content.chars().count() as f64;
        let average_user_length = mean(&user.iter().map(char_len).collect::<Vec<_>>());
        let average_bot_length = mean(&bot.iter().map(char_len).collect::<Vec<_>>());
        let average_user_words = mean(
            &user
                .iter()
                .map(|m| m.word_count() as f64)
                .collect::<Vec<_>>(),
        );

        let hourly_distribution: PatternTable<u32> =
            group_by(&messages, |m| hour_of_day(&m.timestamp));
        let weekday_distribution = group_by(&messages, |m| weekday_name(&m.timestamp));
        let per_day = group_by(&messages, |m| day_of(&m.timestamp));
        let daily_counts: Vec<f64> = per_day.iter().map(|(_, c)| c as f64).collect();

        let user_texts: Vec<&str> = user.iter().map(|m| m.content.as_str()).collect();
        let keyword_mentions = count_keywords(&user_texts, &MENTAL_HEALTH_KEYWORDS);
        let questions = user_texts.iter().filter(|t| t.contains('?')).count();
        let exclamations = user_texts.iter().filter(|t| t.contains('!')).count();

        tracing::debug!(
            messages = total,
            user = user.len(),
            bot = bot.len(),
            days = daily_counts.len(),
            "analyzed chat window"
        );

        ChatSnapshot {
            total_messages: total,
            user_messages: user.len(),
            bot_messages: bot.len(),
            user_percentage: percentage(user.len(), total),
            bot_percentage: percentage(bot.len(), total),
            response_ratio: ratio(bot.len() as f64, user.len() as f64),
            average_user_length,
            average_bot_length,
            peak_hour: peak(&hourly_distribution),
            hourly_distribution,
            peak_weekday: peak(&weekday_distribution),
            weekday_distribution,
            daily_trend: self.calculator.compute(&daily_counts),
            top_keywords: top_n(&keyword_mentions, TOP_KEYWORDS),
            keyword_mentions,
            question_rate: ratio(questions as f64, user.len() as f64),
            engagement: engagement_level(user.len(), questions, exclamations),
            length_category: length_category(average_user_words),
        }
    }
}
