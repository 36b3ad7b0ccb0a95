//! AppState — everything the view reads.  Only the App event loop writes it.

use std::sync::Arc;

use cult_proto::status::StationStatus;

use crate::artwork::ArtworkPhase;

#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Latest snapshot from the store; `None` until the first good poll.
    pub status: Option<Arc<StationStatus>>,
    pub is_playing: bool,
    pub artwork: ArtworkPhase,
    /// Advanced by the UI tick; drives every spinner.
    pub spinner_frame: usize,
}

impl AppState {
    pub fn artwork_url(&self) -> Option<&str> {
        self.status
            .as_deref()
            .map(|s| s.current_track.artwork_url_large.as_str())
            .filter(|u| !u.trim().is_empty())
    }
}
