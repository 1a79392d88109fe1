use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{anyhow, Context, Result};
use mindcare_schema::{
    ReferenceRange, Thresholds, BLOOD_GLUCOSE, BLOOD_PRESSURE_DIASTOLIC, BLOOD_PRESSURE_SYSTOLIC,
    HEART_RATE, OXYGEN_SATURATION, PAIN_LEVEL, TEMPERATURE,
};
use serde::{Deserialize, Serialize};

fn default_trend_sensitivity() -> f64 {
    1.0
}

fn default_outlier_medium_z() -> f64 {
    2.5
}

fn default_outlier_high_z() -> f64 {
    3.0
}

fn default_min_outlier_samples() -> usize {
    5
}

fn default_window_days() -> u32 {
    30
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_trend_sensitivity")]
    pub trend_sensitivity: f64,
    #[serde(default = "default_outlier_medium_z")]
    pub outlier_medium_z: f64,
    #[serde(default = "default_outlier_high_z")]
    pub outlier_high_z: f64,
    #[serde(default = "default_min_outlier_samples")]
    pub min_outlier_samples: usize,
    #[serde(default = "default_window_days")]
    pub default_window_days: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            trend_sensitivity: default_trend_sensitivity(),
            outlier_medium_z: default_outlier_medium_z(),
            outlier_high_z: default_outlier_high_z(),
            min_outlier_samples: default_min_outlier_samples(),
            default_window_days: default_window_days(),
        }
    }
}

fn default_insights_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_insights_model() -> String {
    "mistral".to_string()
}

fn default_insights_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_insights_base_url")]
    pub base_url: String,
    #[serde(default = "default_insights_model")]
    pub model: String,
    #[serde(default = "default_insights_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_insights_base_url(),
            model: default_insights_model(),
            timeout_secs: default_insights_timeout_secs(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_path() -> String {
    "data/snapshots.db".to_string()
}

/// One year.
pub const MAX_CACHE_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

fn default_cache_ttl_seconds() -> u64 {
    3600
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Relative paths resolve against the config root.
    #[serde(default = "default_cache_path")]
    pub path: String,
    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            path: default_cache_path(),
            ttl_seconds: default_cache_ttl_seconds(),
        }
    }
}

/// Clinical critical bounds used when a metric has no configured entry.
pub fn default_thresholds() -> BTreeMap<String, Thresholds> {
    [
        (HEART_RATE, Thresholds::new(50.0, 120.0)),
        (BLOOD_PRESSURE_SYSTOLIC, Thresholds::new(90.0, 180.0)),
        (BLOOD_PRESSURE_DIASTOLIC, Thresholds::new(60.0, 110.0)),
        (TEMPERATURE, Thresholds::new(35.0, 38.5)),
        (BLOOD_GLUCOSE, Thresholds::new(60.0, 200.0)),
        (OXYGEN_SATURATION, Thresholds::new(90.0, 100.0)),
        (PAIN_LEVEL, Thresholds::new(0.0, 8.0)),
    ]
    .into_iter()
    .map(|(metric, t)| (metric.to_string(), t))
    .collect()
}

pub fn default_reference_ranges() -> BTreeMap<String, ReferenceRange> {
    [
        (
            BLOOD_PRESSURE_SYSTOLIC,
            ReferenceRange::new(90.0, 140.0).with_optimal(110.0, 120.0),
        ),
        (
            BLOOD_PRESSURE_DIASTOLIC,
            ReferenceRange::new(60.0, 90.0).with_optimal(70.0, 80.0),
        ),
        (
            HEART_RATE,
            ReferenceRange::new(60.0, 100.0).with_optimal(60.0, 80.0),
        ),
        (
            TEMPERATURE,
            ReferenceRange::new(36.1, 37.2).with_optimal(36.5, 37.0),
        ),
        (
            BLOOD_GLUCOSE,
            ReferenceRange::new(70.0, 140.0).with_optimal(80.0, 110.0),
        ),
        (
            OXYGEN_SATURATION,
            ReferenceRange::new(95.0, 100.0).with_optimal(97.0, 100.0),
        ),
        (
            PAIN_LEVEL,
            ReferenceRange::new(0.0, 10.0).with_optimal(0.0, 3.0),
        ),
    ]
    .into_iter()
    .map(|(metric, r)| (metric.to_string(), r))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MindcareConfig {
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    /// Per-metric overrides merged over [`default_thresholds`].
    #[serde(default)]
    pub thresholds: BTreeMap<String, Thresholds>,
    /// Per-metric overrides merged over [`default_reference_ranges`].
    #[serde(default)]
    pub reference_ranges: BTreeMap<String, ReferenceRange>,
    #[serde(default)]
    pub insights: InsightsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl MindcareConfig {
    pub fn effective_thresholds(&self) -> BTreeMap<String, Thresholds> {
        let mut merged = default_thresholds();
        merged.extend(self.thresholds.clone());
        merged
    }

    pub fn effective_reference_ranges(&self) -> BTreeMap<String, ReferenceRange> {
        let mut merged = default_reference_ranges();
        merged.extend(self.reference_ranges.clone());
        merged
    }
}

pub fn resolve_env_var(raw: &str) -> String {
    let mut output = String::new();
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);

        let candidate = &rest[start + 2..];
        let Some(end) = candidate.find('}') else {
            output.push_str(&rest[start..]);
            return output;
        };

        let key = &candidate[..end];
        output.push_str(&std::env::var(key).unwrap_or_default());
        rest = &candidate[end + 1..];
    }

    output.push_str(rest);
    output
}

/// Load `main.yaml` from `root`. A missing file yields the defaults.
pub fn load_config(root: &Path) -> Result<MindcareConfig> {
    let path = root.join("main.yaml");
    let mut config = if path.exists() {
        read_yaml_file::<MindcareConfig>(&path)?
    } else {
        tracing::warn!(
            "config file not found at {}, using defaults",
            path.display()
        );
        MindcareConfig::default()
    };

    resolve_config_env(&mut config);
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &MindcareConfig) -> Result<()> {
    let analytics = &config.analytics;
    if analytics.trend_sensitivity.is_nan() || analytics.trend_sensitivity <= 0.0 {
        return Err(anyhow!(
            "analytics.trend_sensitivity must be positive: {}",
            analytics.trend_sensitivity
        ));
    }
    if analytics.outlier_medium_z <= 0.0 || analytics.outlier_high_z < analytics.outlier_medium_z {
        return Err(anyhow!(
            "analytics.outlier_high_z ({}) must be >= outlier_medium_z ({}) and both positive",
            analytics.outlier_high_z,
            analytics.outlier_medium_z
        ));
    }
    if analytics.min_outlier_samples < 2 {
        return Err(anyhow!(
            "analytics.min_outlier_samples must be at least 2: {}",
            analytics.min_outlier_samples
        ));
    }
    if analytics.default_window_days == 0 {
        return Err(anyhow!("analytics.default_window_days must be non-zero"));
    }

    for (metric, t) in &config.thresholds {
        if t.low >= t.high {
            return Err(anyhow!(
                "thresholds.{metric}: low ({}) must be below high ({})",
                t.low,
                t.high
            ));
        }
    }

    for (metric, r) in &config.reference_ranges {
        if r.min >= r.max {
            return Err(anyhow!(
                "reference_ranges.{metric}: min ({}) must be below max ({})",
                r.min,
                r.max
            ));
        }
        if r.optimal_min.is_some() != r.optimal_max.is_some() {
            return Err(anyhow!(
                "reference_ranges.{metric}: optimal_min and optimal_max must be set together"
            ));
        }
    }

    if config.insights.timeout_secs == 0 {
        return Err(anyhow!("insights.timeout_secs must be non-zero"));
    }
    if config.insights.enabled && config.insights.base_url.trim().is_empty() {
        return Err(anyhow!("insights.base_url is empty but insights are enabled"));
    }

    if config.cache.enabled && config.cache.path.trim().is_empty() {
        return Err(anyhow!("cache.path is empty but the cache is enabled"));
    }
    if config.cache.ttl_seconds > MAX_CACHE_TTL_SECONDS {
        return Err(anyhow!(
            "cache.ttl_seconds must be at most {MAX_CACHE_TTL_SECONDS}: {}",
            config.cache.ttl_seconds
        ));
    }

    Ok(())
}

fn read_yaml_file<T>(path: &Path) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse yaml file: {}", path.display()))
}

fn resolve_config_env(config: &mut MindcareConfig) {
    config.insights.base_url = resolve_env_var(&config.insights.base_url);
    config.insights.model = resolve_env_var(&config.insights.model);
    config.cache.path = resolve_env_var(&config.cache.path);
}
