//! Scheduling errors.

use crate::playlist::{EntryId, PlaylistEntryType};
use crate::time::TimeError;

/// Errors reported synchronously by scheduler operations.
///
/// A failed operation never changes the playlist.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulerError {
    #[error("Unknown playlist entry {0}")]
    UnknownEntry(EntryId),

    #[error("Entry {0} is currently playing; stop playback before cancelling it")]
    EntryActive(EntryId),

    #[error("Cannot schedule at {requested:.3}s, playback is already at {playhead:.3}s")]
    ScheduledInPast { requested: f64, playhead: f64 },

    #[error("Linear time {0:.3}s is outside the playlist")]
    OutsidePlaylist(f64),

    #[error("Clip duration {duration:.3}s is shorter than the minimum {minimum:.3}s")]
    ClipTooShort { duration: f64, minimum: f64 },

    #[error("Entries of type '{0}' cannot be scheduled this way")]
    InvalidEntryType(PlaylistEntryType),

    #[error("Pod ad has no entry to append to")]
    MissingAppendTarget,

    #[error("Cannot append a pod ad after entry {0}")]
    InvalidAppendTarget(EntryId),

    #[error("Entry {0} is program content and cannot be cancelled")]
    ContentNotCancellable(EntryId),

    #[error("Entry {0} is not an unresolved ad reference")]
    NotAReference(EntryId),

    #[error("Playlist has no content to anchor a seek-to-start entry")]
    NoContent,

    #[error("Content clips need a bounded manifest window")]
    UnboundedContent,

    #[error(transparent)]
    Time(#[from] TimeError),
}
