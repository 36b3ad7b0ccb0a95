//! Wire schema of the station status endpoint.
//!
//! Field names follow the JSON exactly (snake_case).  Unknown fields are
//! ignored so new keys on the server side never break decoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One decoded snapshot of the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationStatus {
    pub status: String,
    pub source: SourceInfo,
    pub current_track: TrackInfo,
    pub history: Vec<TrackSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// "live", "automated", ...
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub collaborator: Option<String>,
    #[serde(default)]
    pub relay: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub title: String,
    /// Kept verbatim; see [`TrackInfo::started_at`] for the parsed form.
    pub start_time: String,
    pub artwork_url_large: String,
}

/// History entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub title: String,
}

impl StationStatus {
    /// Title line shown under the artwork.
    pub fn display_title(&self) -> String {
        format!("Playing: {}", self.current_track.title)
    }

    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}

impl SourceInfo {
    /// Short badge text, e.g. `live · DJ Name`.
    pub fn label(&self) -> String {
        match self.collaborator.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(c) => format!("{} · {}", self.kind, c.trim()),
            None => self.kind.clone(),
        }
    }
}

impl TrackInfo {
    /// `start_time` as a UTC timestamp, `None` if the server sent something
    /// that isn't RFC 3339.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(self.start_time.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}
