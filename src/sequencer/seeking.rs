//! Seek resolution.
//!
//! A seek lands on the first playable entry at the target linear time. When
//! the seek crosses an ad whose policy forbids skipping in that direction, the
//! seek lands on that ad instead and the original target is carried along as
//! `resume_at`, to be resumed once the ad has played.

use tracing::debug;

use super::{entry_start, find_playable, Result, Sequencer, SequencerError};
use crate::playlist::{PlaybackSegment, SegmentStatus};
use crate::scheduler::Scheduler;
use crate::time::{LinearTime, SeekbarTime};

impl Sequencer {
    /// Segment to load for a seek to `target` on the linear timeline.
    ///
    /// Fails without touching `current` when its policy forbids seeking.
    pub fn segment_after_seek(
        &self,
        scheduler: &Scheduler,
        target: LinearTime,
        current: Option<&PlaybackSegment>,
    ) -> Result<PlaybackSegment> {
        if let Some(current) = current {
            if !current.clip.playback_policy.allow_seek {
                return Err(SequencerError::SeekNotAllowed(current.segment_id));
            }
        }
        let rate = current.map_or(1.0, |s| s.initial_playback_rate);
        let from = current.and_then(|s| scheduler.index_of(s.segment_id));
        self.resolve_seek(scheduler, target, from, rate)
    }

    /// Segment to load for a seek chosen on the seekbar.
    ///
    /// `seekbar` carries the target as its position together with the window
    /// it was picked from. On content the seekbar is the linear timeline; on
    /// an ad it is the position inside the ad clip.
    pub fn segment_after_seekbar_seek(
        &self,
        scheduler: &Scheduler,
        seekbar: &SeekbarTime,
        current: &PlaybackSegment,
    ) -> Result<PlaybackSegment> {
        if !current.clip.playback_policy.allow_seek {
            return Err(SequencerError::SeekNotAllowed(current.segment_id));
        }
        if !seekbar.contains(self.config.time_tolerance) {
            return Err(SequencerError::OutsideSeekbarWindow {
                position: seekbar.current(),
                min: seekbar.min(),
                max: seekbar.max(),
            });
        }
        let target = seekbar.current().max(0.0);

        if current.clip.is_advertisement {
            let clip = &current.clip;
            let duration = clip.render_duration();
            if target > duration + self.config.time_tolerance {
                return Err(SequencerError::OutsideSegment {
                    position: target,
                    duration,
                });
            }
            let start = clip.render_time.min() + target.min(duration);
            debug!(id = %clip.entry_id, start, "Seeking inside ad");
            return Ok(PlaybackSegment::new(clip.clone(), start, current.initial_playback_rate)
                .with_status(SegmentStatus::Loading));
        }

        self.segment_after_seek(scheduler, LinearTime::saturating(target), Some(current))
    }

    /// Resolve a seek to `target`, starting the blocker search at playlist
    /// index `from` (the entry the seek leaves, when known).
    pub(super) fn resolve_seek(
        &self,
        scheduler: &Scheduler,
        target: LinearTime,
        from: Option<usize>,
        rate: f64,
    ) -> Result<PlaybackSegment> {
        let entries = scheduler.entries();
        let time = target.as_secs();
        let found = scheduler
            .index_at_time(time)
            .and_then(|i| find_playable(entries, i, true))
            .ok_or(SequencerError::OutsidePlaylist(time))?;

        if let Some(blocker) = from.and_then(|from| blocking_ad(scheduler, from, found)) {
            let entry = &entries[blocker];
            debug!(
                ad = %entry.entry_id,
                target = %target,
                "Seek crosses a non-skippable ad"
            );
            let mut segment = PlaybackSegment::new(entry.clone(), entry_start(entry, rate), rate)
                .with_status(SegmentStatus::Loading);
            segment.resume_at = Some(target);
            return Ok(segment);
        }

        let entry = &entries[found];
        let start = if entry.is_content() {
            entry.render_time.min() + (time - entry.linear_start.as_secs()).max(0.0)
        } else {
            entry.render_time.min()
        };
        debug!(id = %entry.entry_id, target = %target, start, "Resolved seek");
        Ok(PlaybackSegment::new(entry.clone(), start, rate).with_status(SegmentStatus::Loading))
    }
}

/// Nearest playable ad strictly between `from` and `to` that may not be
/// skipped in the direction of travel.
fn blocking_ad(scheduler: &Scheduler, from: usize, to: usize) -> Option<usize> {
    let entries = scheduler.entries();
    let blocks = |i: &usize| {
        let entry = &entries[*i];
        entry.is_advertisement
            && entry.is_playable()
            && !entry.playback_policy.allows_skip(to > from)
    };
    if to > from {
        (from + 1..to).find(blocks)
    } else {
        (to + 1..from).rev().find(blocks)
    }
}
