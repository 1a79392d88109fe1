use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use mindcare_core::load_config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

use commands::analyze::{run_analyze, AnalyzeArgs};
use commands::cache::{handle_cache_command, CacheCommands};
use commands::validate::validate_summary;

#[derive(Parser)]
#[command(name = "mindcare", version, about = "mindcare statistics and insight reports")]
struct Cli {
    #[arg(
        long,
        default_value = "~/.mindcare",
        help = "Config root directory (contains config/, data/ and logs/)"
    )]
    config_root: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Analyze a JSON file of records and print the report")]
    Analyze(AnalyzeArgs),
    #[command(about = "Validate config files")]
    Validate,
    #[command(subcommand, about = "Snapshot cache maintenance")]
    Cache(CacheCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Expand ~ to home directory
    if cli.config_root.starts_with("~") {
        if let Some(home) = std::env::var_os("HOME") {
            cli.config_root = PathBuf::from(home).join(
                cli.config_root
                    .strip_prefix("~")
                    .unwrap_or(&cli.config_root),
            );
        }
    }

    let log_dir = cli.config_root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "mindcare.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = load_config(&cli.config_root.join("config"))?;

    match command {
        Commands::Analyze(args) => {
            let report = run_analyze(&args, &cli.config_root, &config).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Validate => {
            println!("{}", validate_summary(&config).await);
        }
        Commands::Cache(cmd) => {
            handle_cache_command(cmd, &cli.config_root, &config).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindcare_schema::Domain;

    #[test]
    fn parses_analyze_subcommand() {
        let cli = Cli::try_parse_from([
            "mindcare",
            "analyze",
            "medical",
            "--input",
            "records.json",
            "--window-days",
            "7",
            "--insights",
        ])
        .unwrap();
        let Some(Commands::Analyze(args)) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.domain, Domain::Health);
        assert_eq!(args.window_days, Some(7));
        assert_eq!(args.subject, "local");
        assert!(args.insights);
        assert!(!args.no_cache);
    }

    #[test]
    fn rejects_unknown_domain() {
        assert!(Cli::try_parse_from(["mindcare", "analyze", "journal", "-i", "x.json"]).is_err());
    }

    #[test]
    fn parses_cache_purge_subcommand() {
        let cli = Cli::try_parse_from(["mindcare", "cache", "purge"]).unwrap();
        assert!(matches!(
            cli.command.unwrap(),
            Commands::Cache(CacheCommands::Purge)
        ));
    }

    #[test]
    fn parses_validate_with_config_root() {
        let cli = Cli::try_parse_from(["mindcare", "--config-root", "/tmp/mc", "validate"]).unwrap();
        assert_eq!(cli.config_root, PathBuf::from("/tmp/mc"));
        assert!(matches!(cli.command.unwrap(), Commands::Validate));
    }
}
