//! `scrape`: run a batch of URLs through a site profile and write the dataset.
mod config;
mod input;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use scrape_engine::{
    ensure_output_dir, write_report, BatchRunner, Clock, JsonLinesSink, Pipeline, ReqwestFetcher,
    StaticProxyPool,
};
use scrape_logging::{scrape_info, scrape_warn, LevelFilter, LogDestination};

use crate::config::AppConfig;

const DATASET_FILE: &str = "dataset.jsonl";

#[derive(Parser)]
#[command(name = "scrape", about = "Extract structured records from embedded page data", version)]
struct Cli {
    /// JSON array of `{ "url": "..." }` entries.
    #[arg(short, long)]
    input: PathBuf,

    /// RON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site profile (tiktok, aliexpress).
    #[arg(long)]
    site: Option<String>,

    /// Output directory for dataset.jsonl and report.json.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    concurrency: Option<usize>,

    /// Proxy URL; repeat to rotate through several.
    #[arg(long = "proxy")]
    proxies: Vec<String>,

    /// Whole-batch deadline in milliseconds.
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,
}

fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value.parse().map_err(|_| {
        format!("unknown log level {value:?}; expected off, error, warn, info, debug or trace")
    })
}

impl Cli {
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(site) = &self.site {
            config.site = site.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if !self.proxies.is_empty() {
            config.proxies = self.proxies.clone();
        }
        if self.deadline_ms.is_some() {
            config.deadline_ms = self.deadline_ms;
        }
    }
}

fn utc_clock() -> Clock {
    Arc::new(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    cli.apply_to(&mut config);

    let destination = match &config.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    if !scrape_logging::initialize(destination, cli.log_level) {
        eprintln!("warning: logging could not be initialized; continuing without log output");
    }

    let site = Arc::new(config.site_profile()?);
    let urls = input::read_targets(&cli.input)?;
    ensure_output_dir(&config.output_dir)
        .with_context(|| format!("preparing output directory {:?}", config.output_dir))?;
    let sink = JsonLinesSink::open(config.output_dir.join(DATASET_FILE))
        .context("opening dataset file")?;

    let fetcher = Arc::new(ReqwestFetcher::new(config.fetch_settings(site.referer())));
    let proxies = Arc::new(StaticProxyPool::new(config.proxies.clone()));
    let pipeline = Pipeline::new(fetcher, site, utc_clock()).with_proxies(proxies);
    let runner = BatchRunner::new(pipeline, config.batch_settings());

    let token = runner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            scrape_warn!("Interrupted; failing unfinished targets");
            token.cancel();
        }
    });

    let report = runner.run_with_sink(urls, &sink).await?;
    let report_path = write_report(&config.output_dir, &report).context("writing report")?;

    scrape_info!(
        "{} of {} target(s) extracted; dataset {:?}, report {:?}",
        report.summary.succeeded,
        report.summary.total,
        sink.path(),
        report_path
    );
    for (kind, count) in &report.summary.by_kind {
        scrape_info!("  {kind}: {count}");
    }
    Ok(())
}
