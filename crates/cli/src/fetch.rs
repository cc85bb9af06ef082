use anyhow::{Context, bail};
use futures_util::StreamExt;
use reqwest::header::ACCEPT_ENCODING;
use stationboard::prelude::*;
use std::{path::PathBuf, time::Instant};
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::info;

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    #[arg(long)]
    url: String,
    /// Where to store the archive
    #[arg(long)]
    to: PathBuf,
}

pub async fn run(args: FetchArgs) -> anyhow::Result<()> {
    info!("Fetching {}...", args.url);
    let now = Instant::now();
    let response = reqwest::Client::new()
        .get(&args.url)
        .header(ACCEPT_ENCODING, "gzip, deflate")
        .send()
        .await
        .context("Failed to fetch")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        bail!("Response is not success ({status}): {body}");
    }

    let partial = args.to.with_extension("part");
    let mut file = File::create(&partial)
        .await
        .with_context(|| format!("Failed to create {}", partial.display()))?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let data = chunk.context("Failed to fetch chunk")?;
        file.write_all(&data)
            .await
            .context("Failed to write to file")?;
    }
    file.flush().await.context("Failed to flush file")?;
    drop(file);

    GtfsReader::new()
        .from_zip(&partial)
        .context("Downloaded file is not a zip archive")?;
    tokio::fs::rename(&partial, &args.to).await?;
    info!(
        "Fetching {} took {:?}, saved to {}",
        args.url,
        now.elapsed(),
        args.to.display()
    );
    Ok(())
}
