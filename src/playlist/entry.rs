//! Playlist entries: the schedulable units owned by the scheduler.

use serde::{Deserialize, Serialize};

use super::PlaybackPolicy;
use crate::time::{LinearTime, ManifestTime};

/// Scheduler-issued entry identity.
///
/// Issued from a single increasing counter starting at 1 and never reused, so
/// a stale id can only miss, never alias a newer entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u32);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an entry's URI points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistEntryType {
    /// Single-segment playable media
    Media,
    /// Non-media interstitial (static page)
    Static,
    /// Unresolved ad manifest reference; must be resolved before it can play
    VastReference,
    /// Restart point for live streams (no URI for on-demand content)
    SeekToStart,
}

impl std::fmt::Display for PlaylistEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Media => "media",
            Self::Static => "static",
            Self::VastReference => "vast",
            Self::SeekToStart => "seek-to-start",
        };
        f.write_str(name)
    }
}

/// One entry of the ordered playlist.
///
/// Content entries cover `linear_duration` seconds of the linear timeline;
/// ads and markers have zero linear duration and sit at `linear_start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub entry_id: EntryId,
    /// Identity reported to callers; survives reference resolution and splits
    pub original_id: EntryId,
    /// Content family this entry was split from (its own id when never split)
    pub split_from: EntryId,
    pub kind: PlaylistEntryType,
    pub linear_start: LinearTime,
    pub linear_duration: f64,
    pub clip_uri: Option<String>,
    /// Rendering window inside the clip's media
    pub render_time: ManifestTime,
    pub is_advertisement: bool,
    pub delete_after_playing: bool,
    pub playback_policy: PlaybackPolicy,
}

impl PlaylistEntry {
    /// Whether the renderer can be handed this entry.
    pub fn is_playable(&self) -> bool {
        self.kind != PlaylistEntryType::VastReference && self.clip_uri.is_some()
    }

    /// Content (non-ad) entry occupying linear time.
    pub fn is_content(&self) -> bool {
        !self.is_advertisement && self.linear_duration > 0.0
    }

    pub fn linear_end(&self) -> f64 {
        self.linear_start.as_secs() + self.linear_duration
    }

    /// Whether `time` falls on this entry: at its start (within `tolerance`) or
    /// strictly inside its linear range.
    pub fn contains_linear(&self, time: f64, tolerance: f64) -> bool {
        let start = self.linear_start.as_secs();
        (start - time).abs() < tolerance || (start <= time && time < self.linear_end())
    }

    /// Length of the rendering window.
    pub fn render_duration(&self) -> f64 {
        self.render_time.duration()
    }
}
