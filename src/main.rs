//! Clinical shift scheduling server.
//!
//! Run with: cargo run
//! Then open: http://localhost:7860

use std::net::SocketAddr;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use shift_scheduling::api::{self, ServerState};
use shift_scheduling::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_level))
        .init();

    let addr: SocketAddr = config.bind_addr.parse()?;
    let bind_addr = config.bind_addr.clone();
    let state = ServerState::new(config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router(state).layer(cors).layer(TraceLayer::new_for_http());

    tracing::info!(%bind_addr, "starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
