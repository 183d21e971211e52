use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::routes::api_routes;
use crate::state::AppState;

mod error;
mod handlers;
mod routes;
mod state;

/// HTTP service wrapping the style transfer engine.
#[derive(Parser)]
struct Args {
    /// Pretrained VGG19 weight record (named MessagePack)
    #[arg(short, long)]
    weights: PathBuf,

    /// Directory for uploaded images and results
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8000")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    // Weight loading failure means the service can never answer a request;
    // bail before binding the socket.
    let state = AppState::new(&args.weights, args.data_dir)
        .context("Failed to initialize service state")?;

    let app = Router::new()
        .merge(api_routes())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(32 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Listening on http://{}", args.addr);
    let listener = TcpListener::bind(args.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
