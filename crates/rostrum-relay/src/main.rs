use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rostrum_relay::{serve, AppState, DebateStore, RelayHub};

#[derive(Parser, Debug)]
#[command(name = "rostrum-relay", about = "Debate relay and persistence service")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: String,

    /// Directory for persisted debate snapshots.
    #[arg(long, default_value = "./storage")]
    storage_dir: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let store = Arc::new(DebateStore::new(&args.storage_dir)?);
    let state = AppState {
        hub: Arc::new(RelayHub::new(store.clone())),
        store,
    };
    serve(state, &args.bind).await
}
