use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use threatwatch_api::{start_server, ApiConfig};

#[derive(Debug, Parser)]
#[command(
    name = "threatwatch-server",
    about = "Attack-surface scanning and risk scoring API server"
)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Database file path (defaults to ~/.threatwatch/threatwatch.db).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// API key clients must present as a bearer token. Unauthenticated if
    /// omitted.
    #[arg(long, env = "THREATWATCH_API_KEY")]
    api_key: Option<String>,

    /// Seconds between scheduler passes over due targets.
    #[arg(long, default_value_t = 300)]
    scheduler_interval: u64,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    start_server(ApiConfig {
        listen_addr: args.listen,
        db_path: args.db_path,
        api_key: args.api_key,
        scheduler_interval: Duration::from_secs(args.scheduler_interval),
    })
    .await
}
