//! Slotwise - scheduling and booking synchronization service
//!
//! Main entry point for the HTTP server.

use std::sync::Arc;

use slotwise_infra::BackfillScheduler;
use slotwise_lib::{router, AppContext};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match dotenvy::dotenv() {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!("no .env file found"),
    }

    let config = slotwise_infra::config::load()?;
    let ctx = Arc::new(AppContext::new(config)?);

    // Optional in-process reconciliation schedule; /sync stays available
    // either way.
    let mut scheduler = match (&ctx.config.sync_cron, &ctx.backfill) {
        (Some(cron), Some(backfill)) => {
            let mut scheduler = BackfillScheduler::new(cron.clone(), backfill.clone());
            scheduler.start().await?;
            Some(scheduler)
        }
        (Some(_), None) => {
            warn!("sync cron configured but scheduling provider is not; ignoring");
            None
        }
        _ => None,
    };

    let addr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "slotwise listening");

    axum::serve(listener, router(ctx)).await?;

    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.stop().await {
            warn!(error = %e, "failed to stop backfill scheduler");
        }
    }

    Ok(())
}
