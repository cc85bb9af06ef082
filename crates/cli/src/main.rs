mod compact;
mod departures;
mod fetch;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Compact a GTFS feed and publish it as a new version
    Compact(compact::CompactArgs),
    /// Print departures between two stations from the live version
    Departures(departures::DeparturesArgs),
    /// Download a GTFS archive
    Fetch(fetch::FetchArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match Args::parse().cmd {
        Command::Compact(args) => compact::run(args).await,
        Command::Departures(args) => departures::run(args),
        Command::Fetch(args) => fetch::run(args).await,
    }
}
