use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::Args;
use mindcare_core::{AnalysisInput, AnalyticsService, MindcareConfig};
use mindcare_provider::{InsightGenerator, OllamaProvider};
use mindcare_schema::{AnalysisReport, Domain, InsightSource};
use mindcare_store::{CacheKey, SnapshotCache};

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[arg(help = "Record domain: mood, health or chat")]
    pub domain: Domain,
    #[arg(long, short = 'i', help = "JSON file holding an array of records")]
    pub input: PathBuf,
    #[arg(long, default_value = "local", help = "Subject the records belong to")]
    pub subject: String,
    #[arg(long, help = "Days of history to analyze, ending at the newest record")]
    pub window_days: Option<u32>,
    #[arg(long, help = "Enrich insights through the configured Ollama model")]
    pub insights: bool,
    #[arg(long, help = "Skip the snapshot cache for this run")]
    pub no_cache: bool,
}

/// Resolve the cache path against the config root unless it is absolute.
pub fn cache_path(config_root: &Path, configured: &str) -> PathBuf {
    let path = PathBuf::from(configured);
    if path.is_absolute() {
        path
    } else {
        config_root.join(path)
    }
}

/// Cache TTL as a chrono duration.
pub fn cache_ttl(config: &MindcareConfig) -> Result<chrono::Duration> {
    i64::try_from(config.cache.ttl_seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| anyhow!("cache.ttl_seconds out of range: {}", config.cache.ttl_seconds))
}

pub async fn run_analyze(
    args: &AnalyzeArgs,
    config_root: &Path,
    config: &MindcareConfig,
) -> Result<AnalysisReport> {
    let window_days = args
        .window_days
        .unwrap_or(config.analytics.default_window_days);
    if window_days == 0 {
        bail!("--window-days must be at least 1");
    }
    let want_llm = args.insights || config.insights.enabled;

    let cache = if config.cache.enabled && !args.no_cache {
        Some(SnapshotCache::open(&cache_path(config_root, &config.cache.path))?)
    } else {
        None
    };

    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read input file: {}", args.input.display()))?;

    let key = CacheKey::for_input(args.subject.clone(), args.domain, window_days, &raw);
    if let Some(cache) = &cache {
        if let Some(cached) = cache.get_fresh(&key, cache_ttl(config)?, Utc::now()).await? {
            // a rules-only report does not satisfy a request for llm insights
            if !want_llm || cached.insights.source == InsightSource::Llm {
                tracing::info!(
                    subject_id = %key.subject_id,
                    domain = key.domain.as_str(),
                    "serving cached report"
                );
                return Ok(cached);
            }
        }
    }

    let mut input = AnalysisInput::from_json(args.domain, &raw)
        .with_context(|| format!("failed to parse records in {}", args.input.display()))?;
    if let Some(end) = input.latest_timestamp() {
        input.retain_window(window_days, end);
    }

    let service = AnalyticsService::new(config);
    let mut report = service.report(&args.subject, &input, window_days);

    if want_llm {
        let provider = OllamaProvider::new(&config.insights.base_url, &config.insights.model)
            .with_timeout(Duration::from_secs(config.insights.timeout_secs));
        let generator = InsightGenerator::new(Arc::new(provider));
        report.insights = generator
            .enrich(&report.snapshot, report.insights.clone())
            .await;
    }

    if let Some(cache) = &cache {
        cache.put(&key, &report).await?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindcare_schema::DomainSnapshot;
    use tempfile::TempDir;

    fn write_mood_records(dir: &Path) -> PathBuf {
        let path = dir.join("mood.json");
        std::fs::write(
            &path,
            r#"[
                {"score": 2, "timestamp": "2024-01-01T09:00:00Z"},
                {"score": 5, "timestamp": "2024-03-01T09:00:00Z"},
                {"score": 6, "timestamp": "2024-03-02T09:00:00Z"},
                {"score": 7, "timestamp": "2024-03-03T09:00:00Z"}
            ]"#,
        )
        .unwrap();
        path
    }

    fn args(input: PathBuf) -> AnalyzeArgs {
        AnalyzeArgs {
            domain: Domain::Mood,
            input,
            subject: "subject-1".into(),
            window_days: Some(30),
            insights: false,
            no_cache: false,
        }
    }

    #[test]
    fn relative_cache_path_joins_config_root() {
        let root = Path::new("/srv/mindcare");
        assert_eq!(
            cache_path(root, "data/snapshots.db"),
            PathBuf::from("/srv/mindcare/data/snapshots.db")
        );
        assert_eq!(
            cache_path(root, "/var/cache/m.db"),
            PathBuf::from("/var/cache/m.db")
        );
    }

    #[tokio::test]
    async fn analyze_windows_records_and_caches_report() {
        let tmp = TempDir::new().unwrap();
        let input = write_mood_records(tmp.path());
        let config = MindcareConfig::default();

        let first = run_analyze(&args(input.clone()), tmp.path(), &config)
            .await
            .unwrap();
        let DomainSnapshot::Mood(snap) = &first.snapshot else {
            panic!("expected mood snapshot");
        };
        assert_eq!(snap.total_logs, 3);
        assert!(tmp.path().join("data/snapshots.db").exists());

        let second = run_analyze(&args(input), tmp.path(), &config)
            .await
            .unwrap();
        assert_eq!(second.report_id, first.report_id);
    }

    #[tokio::test]
    async fn different_input_file_is_not_served_from_cache() {
        let tmp = TempDir::new().unwrap();
        let config = MindcareConfig::default();
        let a = tmp.path().join("a.json");
        let b = tmp.path().join("b.json");
        std::fs::write(&a, r#"[{"score": 2, "timestamp": "2024-03-01T09:00:00Z"}]"#).unwrap();
        std::fs::write(
            &b,
            r#"[
                {"score": 9, "timestamp": "2024-03-01T09:00:00Z"},
                {"score": 9, "timestamp": "2024-03-02T09:00:00Z"}
            ]"#,
        )
        .unwrap();

        run_analyze(&args(a), tmp.path(), &config).await.unwrap();
        let report = run_analyze(&args(b), tmp.path(), &config).await.unwrap();
        let DomainSnapshot::Mood(snap) = &report.snapshot else {
            panic!("expected mood snapshot");
        };
        assert_eq!(snap.total_logs, 2);
        assert_eq!(snap.summary.mean, 9.0);
    }

    #[test]
    fn oversized_ttl_is_an_error() {
        let mut config = MindcareConfig::default();
        assert_eq!(cache_ttl(&config).unwrap(), chrono::Duration::hours(1));
        config.cache.ttl_seconds = u64::MAX;
        assert!(cache_ttl(&config).is_err());
    }

    #[tokio::test]
    async fn no_cache_always_recomputes() {
        let tmp = TempDir::new().unwrap();
        let input = write_mood_records(tmp.path());
        let config = MindcareConfig::default();
        let mut run = args(input);
        run.no_cache = true;

        let first = run_analyze(&run, tmp.path(), &config).await.unwrap();
        let second = run_analyze(&run, tmp.path(), &config).await.unwrap();
        assert_ne!(first.report_id, second.report_id);
        assert!(!tmp.path().join("data/snapshots.db").exists());
    }

    #[tokio::test]
    async fn zero_window_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut run = args(write_mood_records(tmp.path()));
        run.window_days = Some(0);
        assert!(run_analyze(&run, tmp.path(), &MindcareConfig::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn missing_input_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mut run = args(tmp.path().join("absent.json"));
        run.no_cache = true;
        let err = run_analyze(&run, tmp.path(), &MindcareConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to read input file"));
    }
}
