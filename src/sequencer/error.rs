//! Sequencing errors.

use crate::playlist::EntryId;
use crate::time::TimeError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SequencerError {
    #[error("Seeking is not allowed while entry {0} plays")]
    SeekNotAllowed(EntryId),

    #[error("Linear time {0:.3}s is outside the playlist")]
    OutsidePlaylist(f64),

    #[error("Seek target {position:.3}s is outside the seekbar window [{min:.3}, {max:.3}]")]
    OutsideSeekbarWindow { position: f64, min: f64, max: f64 },

    #[error("Seek target {position:.3}s is past the end of the ad ({duration:.3}s)")]
    OutsideSegment { position: f64, duration: f64 },

    #[error("Playback of entry {entry} failed: {message}")]
    Playback { entry: EntryId, message: String },

    #[error(transparent)]
    Time(#[from] TimeError),
}
