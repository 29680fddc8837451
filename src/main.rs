use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use umcs_schedule::cli::Args;
use umcs_schedule::config::Config;
use umcs_schedule::crawler::Crawler;
use umcs_schedule::logging::setup_logging;
use umcs_schedule::net::HttpFetcher;
use umcs_schedule::output::write_json_lines;
use umcs_schedule::utils::fmt_duration;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config and setup logging before anything else so startup errors are never silently dropped
    let mut config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(letters) = &args.letters {
        config.alphabet = letters.clone();
    }
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        "starting umcs-schedule"
    );

    match run(&config, &args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "Crawl failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config, args: &Args) -> anyhow::Result<()> {
    let settings = config.crawl_settings()?;
    let fetcher = HttpFetcher::new(config.request_timeout, config.rate_limit()?)
        .context("Failed to build HTTP client")?;
    let crawler = Crawler::new(Arc::new(fetcher), settings);

    let sink: Box<dyn AsyncWrite + Unpin + Send> = match &args.output {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let writer = tokio::spawn(write_json_lines(rx, sink));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling crawl");
                cancel.cancel();
            }
        }
    });

    let start = Instant::now();
    let stats = crawler.run(tx, cancel).await;
    let written = writer.await.context("Output writer panicked")??;

    info!(
        duration = fmt_duration(start.elapsed()),
        written,
        pages_fetched = stats.pages_fetched,
        fetch_failures = stats.fetch_failures,
        tables = stats.tables_decoded,
        blocks_skipped = stats.blocks_skipped,
        links_ignored = stats.links_ignored,
        unknown_table_codes = stats.unknown_table_codes,
        duplicate_requests = stats.duplicate_requests,
        cancelled = stats.cancelled,
        "Crawl finished"
    );
    Ok(())
}
