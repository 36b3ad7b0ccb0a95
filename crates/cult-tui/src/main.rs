mod action;
mod app;
mod app_state;
mod artwork;
mod component;
mod components;
mod mpv;
mod playback;
mod theme;

use std::sync::Arc;

use cult_proto::client::StatusClient;
use cult_proto::config::Config;
use cult_proto::store::StatusStore;

use crate::mpv::MpvBackend;
use crate::playback::PlaybackController;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = cult_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("cultradio.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep connection-level DEBUG from the HTTP
    // client internals out of the file.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("cultradio log: {}", log_path.display());
    tracing::info!("cultradio starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(
                "ignoring {}: {:#}",
                Config::config_path().display(),
                e
            );
            Config::default()
        }
    };

    // ── Shared HTTP client (status + artwork) ────────────────────────────────
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .user_agent(config.http.user_agent.clone())
        .build()?;

    let source = Arc::new(StatusClient::from_config(http.clone(), &config)?);
    tracing::info!("status endpoint: {}", source.status_url());

    let playback = PlaybackController::spawn(
        MpvBackend::new(),
        config.station.stream_url.clone(),
        config.volume(),
    );

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(
        http,
        source,
        StatusStore::new(),
        config.poll_interval(),
        playback,
    );
    app.run().await?;

    Ok(())
}
