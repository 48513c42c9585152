//! Frame relay demo pipeline: synthetic decoder -> relay -> headless renderer

use std::future;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use frame_relay::pipeline::runner;
use frame_relay::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("frame_relay=debug")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("Frame relay launching...");

    // Load configuration
    let config = Config::from_env()?;
    frame_relay::CONFIG.store(Arc::new(config));
    let config = frame_relay::CONFIG.load_full();
    info!("Configuration: {:?}", config);

    let threads = runner::spawn(&config)?;

    let run_timer = async {
        match config.pipeline.run_duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => future::pending().await,
        }
    };

    let decoder_done = async {
        while !threads.is_decoder_finished() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Ctrl-C received");
        }
        _ = run_timer => info!("Run duration elapsed"),
        _ = decoder_done => info!("Decoder finished"),
    }

    let summary = tokio::task::spawn_blocking(move || threads.join())
        .await
        .map_err(|e| eyre!("Join task failed: {}", e))??;

    info!(
        produced = summary.decoder.frames_produced,
        rendered = summary.renderer.frames_rendered,
        skipped = summary.renderer.frames_skipped,
        out_of_order = summary.renderer.out_of_order,
        "Frame relay shutting down"
    );
    Ok(())
}
