//! SQLite cache of finished analysis reports

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use mindcare_schema::{AnalysisReport, Domain, InsightSource};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

/// Identity of a cached report.
///
/// `input_digest` ties the report to the exact records it was built from, so
/// a different export for the same subject never hits an earlier report.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub subject_id: String,
    pub domain: Domain,
    pub window_days: u32,
    pub input_digest: String,
}

impl CacheKey {
    pub fn new(
        subject_id: impl Into<String>,
        domain: Domain,
        window_days: u32,
        input_digest: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            domain,
            window_days,
            input_digest: input_digest.into(),
        }
    }

    /// Key for a report built from the raw record payload `raw`.
    pub fn for_input(
        subject_id: impl Into<String>,
        domain: Domain,
        window_days: u32,
        raw: &str,
    ) -> Self {
        Self::new(subject_id, domain, window_days, input_digest(raw))
    }
}

/// Report cache keyed by subject, domain, window and input digest. A report's
/// freshness is measured from its `generated_at`.
pub struct SnapshotCache {
    conn: Arc<Mutex<Connection>>,
}

impl SnapshotCache {
    /// Open or create the database at the given path
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create cache directory: {}", parent.display())
            })?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open cache: {}", db_path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reports
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a report, replacing any earlier report under the same key.
    pub async fn put(&self, key: &CacheKey, report: &AnalysisReport) -> Result<()> {
        let json = serde_json::to_string(report).context("failed to serialize report")?;
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT OR REPLACE INTO snapshots
               (subject_id, domain, window_days, input_digest, report_id, generated_at_ms,
                insight_source, report_json)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                key.subject_id,
                key.domain.as_str(),
                key.window_days as i64,
                key.input_digest,
                report.report_id.to_string(),
                report.generated_at.timestamp_millis(),
                format_insight_source(report),
                json,
            ],
        )?;
        tracing::debug!(
            subject_id = %key.subject_id,
            domain = key.domain.as_str(),
            window_days = key.window_days,
            "cached analysis report"
        );
        Ok(())
    }

    /// The cached report for `key` if it was generated within `ttl` of `now`.
    pub async fn get_fresh(
        &self,
        key: &CacheKey,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<AnalysisReport>> {
        let cutoff = (now - ttl).timestamp_millis();
        let conn = self.conn.lock().await;
        let json: Option<String> = conn
            .query_row(
                r#"SELECT report_json FROM snapshots
                   WHERE subject_id = ?1 AND domain = ?2 AND window_days = ?3
                     AND input_digest = ?4 AND generated_at_ms >= ?5"#,
                params![
                    key.subject_id,
                    key.domain.as_str(),
                    key.window_days as i64,
                    key.input_digest,
                    cutoff
                ],
                |row| row.get(0),
            )
            .optional()?;

        let Some(json) = json else {
            return Ok(None);
        };
        match serde_json::from_str::<AnalysisReport>(&json) {
            Ok(report) => Ok(Some(report)),
            Err(e) => {
                tracing::warn!(
                    subject_id = %key.subject_id,
                    domain = key.domain.as_str(),
                    "discarding unreadable cached report: {e}"
                );
                conn.execute(
                    r#"DELETE FROM snapshots
                       WHERE subject_id = ?1 AND domain = ?2 AND window_days = ?3
                         AND input_digest = ?4"#,
                    params![
                        key.subject_id,
                        key.domain.as_str(),
                        key.window_days as i64,
                        key.input_digest
                    ],
                )?;
                Ok(None)
            }
        }
    }

    /// Delete reports older than `ttl`. Returns the number removed.
    pub async fn purge_expired(&self, ttl: Duration, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = (now - ttl).timestamp_millis();
        let conn = self.conn.lock().await;
        let removed = conn.execute(
            "DELETE FROM snapshots WHERE generated_at_ms < ?1",
            [cutoff],
        )?;
        Ok(removed)
    }

    /// Delete every cached report. Returns the number removed.
    pub async fn clear(&self) -> Result<usize> {
        let conn = self.conn.lock().await;
        let removed = conn.execute("DELETE FROM snapshots", [])?;
        Ok(removed)
    }

    pub async fn len(&self) -> Result<usize> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"CREATE TABLE IF NOT EXISTS __snapshot_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );"#,
    )?;

    let applied: std::collections::HashSet<i64> = {
        let mut stmt = conn.prepare("SELECT version FROM __snapshot_schema_version")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        rows.filter_map(|r| r.ok()).collect()
    };

    let migrations: Vec<(i64, &str)> = vec![
        (
            1,
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                subject_id TEXT NOT NULL,
                domain TEXT NOT NULL,
                window_days INTEGER NOT NULL,
                report_id TEXT NOT NULL,
                generated_at_ms INTEGER NOT NULL,
                report_json TEXT NOT NULL,
                PRIMARY KEY (subject_id, domain, window_days)
            );

            CREATE INDEX IF NOT EXISTS idx_snapshots_generated ON snapshots(generated_at_ms);
            "#,
        ),
        (
            2,
            r#"
            ALTER TABLE snapshots ADD COLUMN insight_source TEXT NOT NULL DEFAULT 'rules';
            "#,
        ),
        (
            // rows from before the digest column cannot be matched to their input
            3,
            r#"
            DROP INDEX IF EXISTS idx_snapshots_generated;
            DROP TABLE IF EXISTS snapshots;

            CREATE TABLE snapshots (
                subject_id TEXT NOT NULL,
                domain TEXT NOT NULL,
                window_days INTEGER NOT NULL,
                input_digest TEXT NOT NULL,
                report_id TEXT NOT NULL,
                generated_at_ms INTEGER NOT NULL,
                insight_source TEXT NOT NULL DEFAULT 'rules',
                report_json TEXT NOT NULL,
                PRIMARY KEY (subject_id, domain, window_days, input_digest)
            );

            CREATE INDEX IF NOT EXISTS idx_snapshots_generated ON snapshots(generated_at_ms);
            "#,
        ),
    ];

    for (version, sql) in migrations {
        if applied.contains(&version) {
            continue;
        }
        conn.execute_batch(sql)?;
        conn.execute(
            "INSERT INTO __snapshot_schema_version(version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Hex SHA-256 of a raw record payload.
pub fn input_digest(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn format_insight_source(report: &AnalysisReport) -> &'static str {
    match report.insights.source {
        InsightSource::Rules => "rules",
        InsightSource::Llm => "llm",
        InsightSource::Fallback => "fallback",
    }
}
