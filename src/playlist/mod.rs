//! Playlist data types shared by the scheduler and the sequencer.
//!
//! - `policy`: per-entry playback restrictions
//! - `entry`: schedulable units owned by the scheduler
//! - `ad`: ad descriptors produced by ad resolution
//! - `segment`: runtime snapshots handed to the playback loop

mod ad;
mod entry;
mod policy;
mod segment;

pub use ad::{AdDescriptor, AdType};
pub use entry::{EntryId, PlaylistEntry, PlaylistEntryType};
pub use policy::PlaybackPolicy;
pub use segment::{PlaybackSegment, SegmentStatus};
