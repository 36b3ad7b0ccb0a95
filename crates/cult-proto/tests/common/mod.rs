//! Shared fixtures for the status/poll integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cult_proto::client::StatusSource;
use cult_proto::error::FetchError;
use cult_proto::status::{SourceInfo, StationStatus, TrackInfo, TrackSummary};

pub const SAMPLE_JSON: &str = r#"{"status":"online","source":{"type":"live"},"current_track":{"title":"Song A","start_time":"2024-01-01T00:00:00Z","artwork_url_large":"https://x/a.png"},"history":[{"title":"Song B"}]}"#;

pub fn status_titled(title: &str) -> StationStatus {
    StationStatus {
        status: "online".to_string(),
        source: SourceInfo {
            kind: "live".to_string(),
            collaborator: None,
            relay: None,
        },
        current_track: TrackInfo {
            title: title.to_string(),
            start_time: "2024-01-01T00:00:00Z".to_string(),
            artwork_url_large: format!("https://x/{}.png", title),
        },
        history: vec![TrackSummary {
            title: "previous".to_string(),
        }],
    }
}

pub fn decode_error() -> FetchError {
    serde_json::from_str::<StationStatus>("{}")
        .unwrap_err()
        .into()
}

type Script = Box<dyn Fn(usize) -> (Duration, Result<StationStatus, FetchError>) + Send + Sync>;

/// A status source whose n-th call (1-based) sleeps and returns whatever the
/// script says.
pub struct ScriptedSource {
    calls: AtomicUsize,
    script: Script,
}

impl ScriptedSource {
    pub fn new(
        script: impl Fn(usize) -> (Duration, Result<StationStatus, FetchError>)
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: Box::new(script),
        }
    }

    /// Instant success, title = call number.
    pub fn counting() -> Self {
        Self::new(|n| (Duration::ZERO, Ok(status_titled(&n.to_string()))))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for ScriptedSource {
    async fn fetch_status(&self) -> Result<StationStatus, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let (delay, result) = (self.script)(n);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}
