use anyhow::Context;
use chrono::{NaiveDate, Utc};
use stationboard::{
    prelude::*,
    publish,
    schedule::{self, encode::FORMAT_VERSION},
    shared::time::today,
};
use std::{path::PathBuf, time::Instant};
use tracing::info;

#[derive(clap::Args, Debug)]
pub struct CompactArgs {
    /// GTFS zip archive or directory
    #[arg(long)]
    feed: PathBuf,
    /// CSV with `date,service_id` rows
    #[arg(long)]
    service_days: PathBuf,
    /// JSON station roster; derived from parent stations when omitted
    #[arg(long)]
    roster: Option<PathBuf>,
    /// First day of the window, defaults to today
    #[arg(long)]
    start_date: Option<NaiveDate>,
    #[arg(long, default_value_t = 7)]
    days: u32,
    /// Output root
    #[arg(long)]
    out: PathBuf,
    #[arg(long, default_value_t = 3)]
    keep_versions: usize,
    /// Version name, defaults to the current UTC time
    #[arg(long)]
    version: Option<String>,
}

pub async fn run(args: CompactArgs) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || compact(args)).await?
}

fn compact(args: CompactArgs) -> anyhow::Result<()> {
    info!("Loading data...");
    let now = Instant::now();
    let reader = GtfsReader::new()
        .from_path(&args.feed)
        .with_context(|| format!("Failed to open feed {}", args.feed.display()))?;
    let repository = Repository::new()
        .load_gtfs(reader)
        .context("Failed to load feed")?;
    let services = ServiceDays::from_path(&args.service_days).with_context(|| {
        format!(
            "Failed to read service days {}",
            args.service_days.display()
        )
    })?;
    let roster = match &args.roster {
        Some(path) => StationRoster::from_path(path)
            .with_context(|| format!("Failed to read roster {}", path.display()))?,
        None => StationRoster::from_repository(&repository),
    };
    let stations = StationResolver::new(&roster, &repository).context("Invalid station roster")?;
    info!("Loading data took {:?}", now.elapsed());

    let config = schedule::Config {
        start_date: args.start_date.unwrap_or_else(today),
        day_count: args.days,
        format_version: FORMAT_VERSION.to_string(),
    };
    let compaction = Compactor::new(&repository, &stations)
        .with_config(config)
        .compact(&services)
        .context("Compaction failed")?;
    compaction.diagnostics.log_summary();

    let version = args
        .version
        .unwrap_or_else(|| Utc::now().format("%Y%m%dT%H%M%SZ").to_string());
    let publisher = Publisher::new(&args.out).with_config(publish::Config {
        output_dir: args.out.clone(),
        keep_versions: args.keep_versions,
    });
    let manifest = publisher
        .publish(&compaction.artifacts, &version)
        .with_context(|| format!("Failed to publish to {}", args.out.display()))?;
    info!(
        "Version {} is live with {} origins",
        manifest.version,
        manifest.origins.len()
    );
    Ok(())
}
