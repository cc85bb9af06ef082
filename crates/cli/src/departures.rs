use anyhow::Context;
use chrono::NaiveDate;
use stationboard::{prelude::*, shared::time::today};
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
pub struct DeparturesArgs {
    /// Output root used by `compact`
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    origin: String,
    #[arg(long)]
    destination: String,
    /// Defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,
}

pub fn run(args: DeparturesArgs) -> anyhow::Result<()> {
    let origin = slugify(&args.origin);
    let destination = slugify(&args.destination);
    let date = args.date.unwrap_or_else(today);

    let (schedule, patterns) = Publisher::new(&args.out)
        .load_current_station(&origin)
        .with_context(|| format!("No published schedule for {origin}"))?;
    let departures = decode_departures(&schedule, &patterns, &destination, date)?;
    if departures.is_empty() {
        println!("No departures from {origin} to {destination} on {date}");
        return Ok(());
    }

    for departure in departures {
        let platform = departure.origin_platform.as_deref().unwrap_or("-");
        println!(
            "{} -> {}  {:<10} platform {:<4} {} ({})",
            departure.departure,
            departure.arrival,
            departure.trip_id,
            platform,
            departure.route_name,
            departure.stops.len()
        );
    }
    Ok(())
}
