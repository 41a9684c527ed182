mod app;
mod color;
mod config;
mod data;
mod error;
mod state;
mod ui;
mod view;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use tokio::net::TcpListener;

use app::AppState;
use config::Config;
use data::cache::DatasetCache;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Config::parse();
    let state = AppState::new(DatasetCache::new(config::dataset_source()));

    // Load up front so the first visitor does not wait. A failure is kept
    // and shown on the page rather than stopping the server.
    if let Err(e) = state.cache().get() {
        log::warn!("Serving the load error page: {e}");
    }

    let listener = TcpListener::bind((cli.host.as_str(), cli.port))
        .await
        .with_context(|| format!("cannot listen on {}:{}", cli.host, cli.port))?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    log::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
