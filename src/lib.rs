//! adseq: playback sequencing for linear streams with inserted ad breaks.
//!
//! The [`Scheduler`] owns the playlist, the [`Sequencer`] decides what plays
//! next and maps between manifest, linear and seekbar time, and
//! [`PlaybackSession`] serializes renderer callbacks, user input and ad
//! resolution results into one decision loop.

pub mod cli;
pub mod config;
pub mod playlist;
pub mod resolver;
pub mod scheduler;
pub mod sequencer;
pub mod session;
pub mod simulate;
pub mod time;

pub use config::Config;
pub use playlist::{
    AdDescriptor, AdType, EntryId, PlaybackPolicy, PlaybackSegment, PlaylistEntry,
    PlaylistEntryType, SegmentStatus,
};
pub use scheduler::{Scheduler, SchedulerError};
pub use sequencer::{SeekbarReading, Sequencer, SequencerError, SequencerEvent, Transition};
pub use session::{PlaybackSession, PlaybackState, Renderer, RendererError, SessionError, SessionInput};
pub use time::{LinearTime, ManifestTime, SeekbarTime, TimeError};
