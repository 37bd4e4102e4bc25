//! Application entrypoint and state wiring.

mod chain;
mod crypto;
mod error;
mod model;
mod routes;

use std::net::SocketAddr;

use anyhow::Context;
use chain::{HashChain, SharedChain};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub chain: SharedChain,
}

#[derive(Parser, Debug)]
#[command(name = "book-ledger", version, about = "Hash-linked book checkout ledger")]
struct Args {
    /// Address to listen on
    #[arg(short, long, env = "LEDGER_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    // 1) chain with genesis
    let chain = SharedChain::new(HashChain::initialize());
    info!("Chain initialized with {} block(s)", chain.len());

    // 2) one-shot dump of the chain in the background
    tokio::spawn(report_chain(chain.clone()));

    // 3) router
    let app = routes::router(AppState { chain });

    // 4) serve
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("bind {}", args.bind))?;
    info!("Listening on http://{}", args.bind);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn init_tracing(verbosity: u8) {
    // RUST_LOG wins over -v
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::new(format!("book_ledger={level},tower_http={level}"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn report_chain(chain: SharedChain) {
    for block in chain.snapshot() {
        let data = serde_json::to_string_pretty(&block.payload).unwrap_or_default();
        info!(
            position = block.position,
            "Prev. hash: {}\nData: {}\nHash: {}",
            block.prev_hash,
            data,
            block.hash
        );
    }
}
