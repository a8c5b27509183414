use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use quakefeed_core::{FeedConfig, Ingestor, MalformedPolicy};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Earthquake feed ingestion client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the feed once and print the ingested records
    Fetch(FetchArgs),
    /// Reload the feed on an interval, logging store activity until ctrl-c
    Watch(WatchArgs),
}

#[derive(Args, Debug, Default)]
struct FeedArgs {
    /// Feed URL (overrides QUAKEFEED_FEED_URL)
    #[arg(long)]
    url: Option<String>,

    /// Records per published batch (overrides QUAKEFEED_BATCH_SIZE)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Skip malformed lines instead of failing the reload
    #[arg(long)]
    skip_malformed: bool,
}

#[derive(Args, Debug, Default)]
struct FetchArgs {
    #[command(flatten)]
    feed: FeedArgs,

    /// Print at most this many records
    #[arg(long)]
    limit: Option<usize>,

    /// Emit records as JSON lines
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct WatchArgs {
    #[command(flatten)]
    feed: FeedArgs,

    /// Seconds between reloads
    #[arg(long, default_value_t = 300)]
    interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Fetch(args) => fetch(args).await,
        Command::Watch(args) => watch(args).await,
    }
}

fn build_ingestor(args: &FeedArgs) -> Result<Ingestor> {
    let mut config = FeedConfig::from_env()?;
    if let Some(url) = &args.url {
        config.feed_url = url.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if args.skip_malformed {
        config.on_malformed = MalformedPolicy::Skip;
    }
    Ingestor::new(config).context("failed to construct ingestor")
}

async fn fetch(args: FetchArgs) -> Result<()> {
    let ingestor = build_ingestor(&args.feed)?;

    let report = ingestor.reload().await.context("reload failed")?;
    info!(
        records = report.records,
        batches = report.batches,
        skipped = report.skipped,
        "feed ingested"
    );

    let snapshot = ingestor.store().snapshot();
    let shown = args.limit.unwrap_or(snapshot.len());
    for quake in snapshot.iter().take(shown) {
        if args.json {
            println!("{}", serde_json::to_string(quake)?);
        } else {
            println!("{quake}");
        }
    }
    if shown < snapshot.len() {
        info!("... {} more records not shown", snapshot.len() - shown);
    }
    Ok(())
}

async fn watch(args: WatchArgs) -> Result<()> {
    let ingestor = build_ingestor(&args.feed)?;

    // Stand-in for the rendering collaborator: follow store notifications.
    let mut events = ingestor.store().subscribe();
    let observer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(?event, "store updated");
        }
    });

    let mut interval = tokio::time::interval(Duration::from_secs(args.interval.max(1)));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                // A failed reload keeps whatever batches it already published.
                if let Err(err) = ingestor.reload().await {
                    warn!(error = %err, total = ingestor.store().len(), "reload failed");
                } else {
                    info!(total = ingestor.store().len(), "collection refreshed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    ingestor.cancel();
    observer.abort();
    Ok(())
}
