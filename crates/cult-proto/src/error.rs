//! Error taxonomy for the status endpoint.

/// Why a status fetch produced no snapshot.
///
/// None of these are fatal: the poller logs them and the previous snapshot
/// stays on screen until the next tick.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connect/timeout/body read failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("status endpoint returned HTTP {0}")]
    Status(u16),

    /// Body was not a `StationStatus`.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// Short tag for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Status(_) => "status",
            Self::Decode(_) => "decode",
        }
    }
}
