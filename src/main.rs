use anyhow::{Context, Result};
use clap::{Args, Parser};
use share_scanner::archive::ArchiveProvider;
use share_scanner::report::write_report;
use share_scanner::{
    run, Credential, PlatformTable, ReportFormat, RunMode, RunOutcome, ScanConfig,
    ScanOrchestrator, DEFAULT_OUTPUT_PATH, DEFAULT_RESULT_LIMIT,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Dumps share-sheet links (Instagram, TikTok, Facebook) posted by each user
/// of one or all communities.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    mode: ModeArgs,

    /// Output file path for the scan
    #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
    outfile: PathBuf,

    /// Maximum number of messages to retrieve per search
    #[arg(long, default_value_t = DEFAULT_RESULT_LIMIT)]
    limit: usize,

    /// JSON message archive to scan
    #[arg(long)]
    archive: PathBuf,

    /// JSON platform table replacing the built-in one
    #[arg(long)]
    patterns: Option<PathBuf>,

    /// Number of communities scanned at once
    #[arg(long, default_value = "1")]
    concurrency: usize,

    /// Give up on a single platform search after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Report format (text|json)
    #[arg(long, default_value = "text")]
    format: String,

    /// Account token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true, default_value = "")]
    token: String,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ModeArgs {
    /// List the account's communities with their IDs
    #[arg(long)]
    list_servers: bool,

    /// Community ID to scan
    #[arg(long)]
    guild_id: Option<u64>,

    /// Scan every community of the account
    #[arg(long)]
    all: bool,
}

impl ModeArgs {
    fn run_mode(&self) -> RunMode {
        match (self.list_servers, self.guild_id) {
            (true, _) => RunMode::ListCommunities,
            (false, Some(id)) => RunMode::ScanOne(id),
            (false, None) => RunMode::ScanAll,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let credential = Credential::new(cli.token.as_str())
        .context("define your account token via DISCORD_TOKEN or --token")?;

    let format: ReportFormat = cli.format.parse()?;
    let config = ScanConfig::default()
        .with_result_limit(cli.limit)
        .with_output_path(cli.outfile.clone())
        .with_concurrency(cli.concurrency)
        .with_query_timeout_secs(cli.timeout_secs)
        .with_report_format(format);

    let table = match &cli.patterns {
        Some(path) => PlatformTable::load(path)
            .await
            .with_context(|| format!("failed to load platforms from {}", path.display()))?,
        None => PlatformTable::builtin()?,
    };
    let orchestrator = ScanOrchestrator::from_config(Arc::new(table), &config);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with partial results");
            ctrl_c.cancel();
        }
    });

    let provider = ArchiveProvider::new(&cli.archive);
    let outcome = run(
        &provider,
        &credential,
        cli.mode.run_mode(),
        &orchestrator,
        &cancel,
    )
    .await?;

    match outcome {
        RunOutcome::Listed(communities) => {
            println!("List of communities you belong to:");
            for community in communities {
                println!("- {} (ID: {})", community.name, community.id);
            }
        }
        RunOutcome::Scanned(aggregate) => {
            write_report(
                &config.output_path,
                &aggregate,
                orchestrator.table(),
                config.report_format,
            )
            .with_context(|| format!("failed to write {}", config.output_path.display()))?;

            for event in &aggregate.events {
                println!("warning: {}", event);
            }
            println!("{}", aggregate.stats);
            if aggregate.cancelled {
                println!("Scan interrupted, report holds partial results.");
            }
            println!(
                "Scan completed. Results written in '{}'.",
                config.output_path.display()
            );
        }
    }

    Ok(())
}
