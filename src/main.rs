//! `eol-sentineld`: the long-running HTTP server binary.

use anyhow::Result;
use clap::Parser;
use eol_sentinel::{App, AppConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::parse();
    eol_sentinel::observability::init_tracing(config.log_json)?;

    let bind_addr = config.bind_addr;
    let app = Arc::new(App::new(config).await?);
    let _cache_warmer = app.spawn_cache_warmer(std::time::Duration::from_secs(6 * 60 * 60));

    let router = eol_sentinel::server::create_router(app);
    let listener = TcpListener::bind(bind_addr).await?;
    info!(%bind_addr, "eol-sentineld listening");

    axum::serve(listener, router).await?;

    Ok(())
}
