use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use mindcare_core::MindcareConfig;
use mindcare_store::SnapshotCache;

use super::analyze::{cache_path, cache_ttl};

#[derive(Subcommand)]
pub enum CacheCommands {
    #[command(about = "Remove snapshots older than the configured TTL")]
    Purge,
    #[command(about = "Remove every cached snapshot")]
    Clear,
}

pub async fn handle_cache_command(
    cmd: CacheCommands,
    config_root: &Path,
    config: &MindcareConfig,
) -> Result<usize> {
    let path = cache_path(config_root, &config.cache.path);
    let cache = SnapshotCache::open(&path)?;

    let removed = match cmd {
        CacheCommands::Purge => {
            let removed = cache.purge_expired(cache_ttl(config)?, Utc::now()).await?;
            println!("Purged {removed} expired snapshot(s) from {}", path.display());
            removed
        }
        CacheCommands::Clear => {
            let removed = cache.clear().await?;
            println!("Cleared {removed} snapshot(s) from {}", path.display());
            removed
        }
    };
    tracing::info!(removed, "snapshot cache maintenance done");
    Ok(removed)
}
