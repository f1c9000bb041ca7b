use anyhow::Result;
use axum::Router;
use clap::Parser;
use minisearch_core::rank::{RankParams, DEFAULT_DAMPING, DEFAULT_ITERATIONS};
use server::build_app_from_dir;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Data directory written by the indexer
    #[arg(long, default_value = "./data")]
    data: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Iterations used when authority scores are recomputed
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,
    /// Damping factor used when authority scores are recomputed
    #[arg(long, default_value_t = DEFAULT_DAMPING)]
    damping: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let params = RankParams::new(args.iterations, args.damping)?;
    let app: Router = build_app_from_dir(&args.data, params)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
