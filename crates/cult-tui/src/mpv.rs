//! mpv playback backend over the JSON IPC socket.
//!
//! ```text
//!   MpvBackend::open()
//!         │  (first use / process died)
//!         ├── spawn `mpv --idle=yes --no-video --input-ipc-server=…`
//!         └── connect ──► writer_task ← MpvRequest via mpsc, writes JSON lines
//!                         reader_task → response (request_id) → oneshot reply
//!                                     → event → logged
//! ```
//!
//! The process is started lazily on the first `open` and kept until `stop`,
//! so pausing and resuming reuse the same player.
//!
//! Platform notes:
//! - Unix:    Unix domain socket in the temp dir
//! - Windows: named pipe  \\.\pipe\<name>
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::playback::PlayerBackend;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

const IPC_TIMEOUT: Duration = Duration::from_secs(5);

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

struct MpvRequest {
    req_id: u64,
    /// Serialised JSON line, newline included.
    payload: String,
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

/// Cloneable handle to the writer task.
#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<MpvRequest>,
}

impl MpvHandle {
    /// Wire up reader/writer tasks over any duplex byte stream.
    pub fn start<R, W>(read_half: R, write_half: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (tx, rx) = mpsc::channel::<MpvRequest>(64);
        tokio::spawn(writer_task(write_half, rx, pending.clone()));
        tokio::spawn(reader_task(BufReader::new(read_half), pending));
        Self { tx }
    }

    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let mut payload = serde_json::to_string(&json!({
            "command": command,
            "request_id": req_id,
        }))?;
        payload.push('\n');

        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(MpvRequest {
                req_id,
                payload,
                reply,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(IPC_TIMEOUT, reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }

    /// Replace whatever is loaded with `url`, unpaused, at `volume`.
    pub async fn load_stream(&self, url: &str, volume: f32) -> anyhow::Result<()> {
        self.send(json!(["loadfile", url, "replace"])).await?;
        self.set_volume(volume).await?;
        self.set_pause(false).await
    }

    pub async fn set_volume(&self, volume: f32) -> anyhow::Result<()> {
        let pct = (volume * 100.0).clamp(0.0, 100.0);
        self.send(json!(["set_property", "volume", pct])).await?;
        Ok(())
    }

    pub async fn set_pause(&self, paused: bool) -> anyhow::Result<()> {
        self.send(json!(["set_property", "pause", paused])).await?;
        Ok(())
    }

    pub async fn quit(&self) -> anyhow::Result<()> {
        self.send(json!(["quit"])).await?;
        Ok(())
    }
}

async fn reader_task<R>(mut reader: BufReader<R>, pending: PendingMap)
where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_pending(&pending, "mpv IPC connection closed").await;
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };
                match val.get("request_id").and_then(Value::as_u64) {
                    Some(req_id) => {
                        let Some(tx) = pending.lock().await.remove(&req_id) else {
                            debug!("mpv reader: response for unknown req={}", req_id);
                            continue;
                        };
                        let result = if val["error"].as_str() == Some("success") {
                            Ok(val)
                        } else {
                            let err = val["error"].as_str().unwrap_or("unknown error");
                            Err(anyhow::anyhow!("mpv error: {}", err))
                        };
                        let _ = tx.send(result);
                    }
                    None => log_event(&val),
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_pending(&pending, "mpv IPC read error").await;
                break;
            }
        }
    }
}

/// Stream drops are only reported; reconnecting is left to the next toggle.
fn log_event(val: &Value) {
    match val.get("event").and_then(Value::as_str) {
        Some("end-file") => {
            let reason = val.get("reason").and_then(Value::as_str).unwrap_or("unknown");
            if reason == "error" || reason == "network" {
                warn!("mpv: stream ended, reason={}", reason);
            } else {
                info!("mpv: end-file reason={}", reason);
            }
        }
        Some(name) => debug!("mpv: event {}", name),
        None => debug!("mpv reader: unexpected message {}", val),
    }
}

async fn fail_pending(pending: &PendingMap, why: &str) {
    for (_, tx) in pending.lock().await.drain() {
        let _ = tx.send(Err(anyhow::anyhow!("{}", why)));
    }
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<MpvRequest>, pending: PendingMap)
where
    W: AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // register before writing so the reader can always match the reply
        pending.lock().await.insert(req.req_id, req.reply);
        debug!("mpv writer: req={} {}", req.req_id, req.payload.trim());
        let written = async {
            writer.write_all(req.payload.as_bytes()).await?;
            writer.flush().await
        }
        .await;
        if let Err(e) = written {
            warn!("mpv writer: write error: {}", e);
            if let Some(tx) = pending.lock().await.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

/// Production [`PlayerBackend`]: one mpv child process.
pub struct MpvBackend {
    socket_name: String,
    process: Option<tokio::process::Child>,
    handle: Option<MpvHandle>,
}

impl MpvBackend {
    pub fn new() -> Self {
        Self {
            socket_name: cult_proto::platform::mpv_socket_name(),
            process: None,
            handle: None,
        }
    }

    fn process_alive(&mut self) -> bool {
        match self.process.as_mut().map(|child| child.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                warn!("mpv process exited: {}", status);
                false
            }
            Some(Err(e)) => {
                warn!("mpv process check failed: {}", e);
                false
            }
            None => false,
        }
    }

    /// Live handle, spawning mpv if it isn't running.
    async fn ensure_running(&mut self) -> anyhow::Result<MpvHandle> {
        if self.process_alive() {
            if let Some(handle) = self.handle.clone() {
                return Ok(handle);
            }
        }
        self.handle = None;
        let handle = self.spawn_and_connect().await?;
        self.handle = Some(handle.clone());
        Ok(handle)
    }

    async fn spawn_and_connect(&mut self) -> anyhow::Result<MpvHandle> {
        if let Some(mut stale) = self.process.take() {
            let _ = stale.kill().await;
        }

        let mpv_binary = cult_proto::platform::find_mpv_binary()
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found on PATH"))?;

        #[cfg(unix)]
        let _ = tokio::fs::remove_file(&self.socket_name).await;

        let stderr_path = cult_proto::platform::data_dir().join("mpv-stderr.log");
        let stderr_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&stderr_path)?;

        let child = tokio::process::Command::new(&mpv_binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg("--quiet")
            .arg(cult_proto::platform::mpv_socket_arg())
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(stderr_file)
            .kill_on_drop(true)
            .spawn()?;
        info!(
            "mpv: spawned {} pid={:?}, stderr → {}",
            mpv_binary.display(),
            child.id(),
            stderr_path.display()
        );
        self.process = Some(child);

        self.connect().await
    }

    #[cfg(unix)]
    async fn connect(&self) -> anyhow::Result<MpvHandle> {
        let socket_path = std::path::Path::new(&self.socket_name);
        for _ in 0..50 {
            if socket_path.exists() {
                if let Ok(stream) = tokio::net::UnixStream::connect(socket_path).await {
                    info!("mpv: connected to {}", self.socket_name);
                    let (read_half, write_half) = stream.into_split();
                    return Ok(MpvHandle::start(read_half, write_half));
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("mpv IPC socket {} did not appear", self.socket_name)
    }

    #[cfg(windows)]
    async fn connect(&self) -> anyhow::Result<MpvHandle> {
        use tokio::net::windows::named_pipe::ClientOptions;

        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            if let Ok(client) = ClientOptions::new().open(&pipe_path) {
                info!("mpv: connected to {}", pipe_path);
                let (read_half, write_half) = tokio::io::split(client);
                return Ok(MpvHandle::start(read_half, write_half));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("mpv named pipe {} did not appear", pipe_path)
    }
}

#[async_trait]
impl PlayerBackend for MpvBackend {
    async fn open(&mut self, url: &str, volume: f32) -> anyhow::Result<()> {
        let handle = self.ensure_running().await?;
        info!("mpv: loading {}", url);
        handle.load_stream(url, volume).await
    }

    async fn pause(&mut self) -> anyhow::Result<()> {
        match &self.handle {
            Some(handle) => handle.set_pause(true).await,
            None => Ok(()),
        }
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.quit().await {
                debug!("mpv: quit failed: {}", e);
            }
        }
        if let Some(mut child) = self.process.take() {
            if tokio::time::timeout(Duration::from_secs(1), child.wait())
                .await
                .is_err()
            {
                let _ = child.kill().await;
            }
        }
        #[cfg(unix)]
        let _ = tokio::fs::remove_file(&self.socket_name).await;
        Ok(())
    }
}
