//! Playback segments: what the playback loop hands to the renderer.

use serde::Serialize;

use super::{EntryId, PlaylistEntry};
use crate::time::LinearTime;

/// Renderer-facing state of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    /// The initial state
    Stopped,
    /// Content is still loading
    Loading,
    /// Content must start playback but is still loading
    Waiting,
    /// Content is loaded but its start time is still in the future
    Ready,
    /// Content is loaded and playing
    Playing,
}

/// Snapshot of a playlist entry selected for playback.
///
/// The segment owns a copy of the entry taken when it was selected. It is
/// never a live reference into the scheduler; [`PlaybackSegment::is_stale`]
/// tells whether the scheduler has since changed the entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSegment {
    pub clip: PlaylistEntry,
    /// Manifest time to start rendering at
    pub initial_playback_time: f64,
    pub initial_playback_rate: f64,
    pub segment_id: EntryId,
    pub error: Option<String>,
    pub status: SegmentStatus,
    /// Seek target deferred until this (non-skippable) ad has played
    pub resume_at: Option<LinearTime>,
}

impl PlaybackSegment {
    pub fn new(clip: PlaylistEntry, initial_playback_time: f64, initial_playback_rate: f64) -> Self {
        Self {
            segment_id: clip.entry_id,
            clip,
            initial_playback_time,
            initial_playback_rate,
            error: None,
            status: SegmentStatus::Stopped,
            resume_at: None,
        }
    }

    pub(crate) fn with_status(mut self, status: SegmentStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether `current` (the scheduler's version of this entry) differs from the snapshot.
    pub fn is_stale(&self, current: Option<&PlaylistEntry>) -> bool {
        current != Some(&self.clip)
    }

    /// Replace the snapshot with an updated entry of the same content family.
    pub(crate) fn refresh(&mut self, clip: PlaylistEntry) {
        self.segment_id = clip.entry_id;
        self.clip = clip;
    }
}
