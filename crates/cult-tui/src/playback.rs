//! PlaybackController — play/pause against the one stream URL.
//!
//! The controller flips `is_playing` synchronously and hands the actual
//! player work to a dedicated task that owns the [`PlayerBackend`]
//! exclusively.  Spawning mpv can take a few seconds; the UI never waits on
//! it.  There is no confirmation path: a failed open or pause is logged and
//! the toggle state stays where the user put it.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A media player that can stream one URL at a time.
#[async_trait]
pub trait PlayerBackend: Send + 'static {
    /// Open `url` from scratch and start playing at `volume` (0.0..=1.0).
    async fn open(&mut self, url: &str, volume: f32) -> anyhow::Result<()>;

    /// Pause the current stream, keeping the player alive.
    async fn pause(&mut self) -> anyhow::Result<()>;

    /// Tear the player down.
    async fn stop(&mut self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Open { url: String, volume: f32 },
    Pause,
    Shutdown,
}

pub struct PlaybackController {
    stream_url: String,
    volume: f32,
    is_playing: bool,
    cmd_tx: mpsc::Sender<PlayerCommand>,
    task: Option<JoinHandle<()>>,
}

impl PlaybackController {
    /// Spawn the player task around `backend`.
    pub fn spawn<B: PlayerBackend>(backend: B, stream_url: String, volume: f32) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let task = tokio::spawn(run_player(backend, cmd_rx));
        Self {
            stream_url,
            volume,
            is_playing: false,
            cmd_tx,
            task: Some(task),
        }
    }

    /// Controller without a player task; commands go to `cmd_tx` only.
    #[cfg(test)]
    pub fn with_sender(
        cmd_tx: mpsc::Sender<PlayerCommand>,
        stream_url: String,
        volume: f32,
    ) -> Self {
        Self {
            stream_url,
            volume,
            is_playing: false,
            cmd_tx,
            task: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Open the stream when paused, pause it when playing.  Returns the new
    /// `is_playing`.
    pub async fn toggle_playback(&mut self) -> bool {
        let cmd = if self.is_playing {
            PlayerCommand::Pause
        } else {
            PlayerCommand::Open {
                url: self.stream_url.clone(),
                volume: self.volume,
            }
        };
        if self.cmd_tx.send(cmd).await.is_err() {
            warn!("[playback] player task gone, toggle has no effect on audio");
        }
        self.is_playing = !self.is_playing;
        info!("[playback] is_playing → {}", self.is_playing);
        self.is_playing
    }

    /// Stop the player and wait for its task to finish.
    pub async fn shutdown(mut self) {
        let _ = self.cmd_tx.send(PlayerCommand::Shutdown).await;
        if let Some(task) = self.task.take() {
            if tokio::time::timeout(std::time::Duration::from_secs(3), task)
                .await
                .is_err()
            {
                warn!("[playback] player task did not stop in time");
            }
        }
    }
}

/// Single owner of the backend: executes commands in arrival order.
pub async fn run_player<B: PlayerBackend>(
    mut backend: B,
    mut cmd_rx: mpsc::Receiver<PlayerCommand>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        debug!("[player] {:?}", cmd);
        let result = match cmd {
            PlayerCommand::Open { url, volume } => backend.open(&url, volume).await,
            PlayerCommand::Pause => backend.pause().await,
            PlayerCommand::Shutdown => break,
        };
        if let Err(e) = result {
            warn!("[player] command failed: {:#}", e);
        }
    }
    if let Err(e) = backend.stop().await {
        warn!("[player] stop failed: {:#}", e);
    }
    debug!("[player] task exiting");
}
