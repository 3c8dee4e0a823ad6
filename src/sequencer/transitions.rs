//! Segment transitions driven by renderer callbacks.

use tracing::{debug, warn};

use super::{entry_start, find_playable, Result, Sequencer, SequencerError, SequencerEvent};
use crate::playlist::{PlaybackSegment, SegmentStatus};
use crate::scheduler::Scheduler;

/// Outcome of a finished or failed segment.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Next(PlaybackSegment),
    EndOfSequence,
}

impl Sequencer {
    /// Decide what follows `segment` once it has played out.
    ///
    /// One-shot entries are consumed unless `is_not_played` is set. A segment
    /// that carries a deferred seek resumes that seek instead of moving to its
    /// neighbour.
    pub fn segment_on_end_of_media(
        &mut self,
        scheduler: &mut Scheduler,
        segment: &PlaybackSegment,
        rate: f64,
        is_not_played: bool,
        is_end_of_sequence: bool,
    ) -> Result<Transition> {
        if is_end_of_sequence {
            if !is_not_played {
                scheduler.mark_played(segment.segment_id);
            }
            debug!(id = %segment.segment_id, "End of sequence");
            return Ok(Transition::EndOfSequence);
        }

        let next = match segment.resume_at {
            Some(target) => {
                let from = scheduler.index_of(segment.segment_id);
                debug!(id = %segment.segment_id, target = %target, "Resuming deferred seek");
                Some(self.resolve_seek(scheduler, target, from, rate)?)
            }
            None => self.next_segment(scheduler, segment, rate),
        };

        if !is_not_played {
            scheduler.mark_played(segment.segment_id);
        }

        match next.and_then(|next| self.rebind(scheduler, next)) {
            Some(next) => {
                debug!(from = %segment.segment_id, to = %next.segment_id, "Next segment");
                Ok(Transition::Next(next.with_status(SegmentStatus::Waiting)))
            }
            None => Ok(Transition::EndOfSequence),
        }
    }

    /// Segment to prefetch once `segment` has buffered, if any.
    ///
    /// Nothing is prefetched while paused or at rates above
    /// `max_prefetch_rate`, where the following segment would be reached
    /// before it could load.
    pub fn segment_on_end_of_buffering(
        &self,
        scheduler: &Scheduler,
        segment: &PlaybackSegment,
        rate: f64,
    ) -> Option<PlaybackSegment> {
        if rate == 0.0 || rate.abs() > self.config.max_prefetch_rate || segment.resume_at.is_some() {
            return None;
        }
        self.next_segment(scheduler, segment, rate)
            .map(|next| next.with_status(SegmentStatus::Ready))
    }

    /// Record a playback failure on `segment` and skip past it when possible.
    ///
    /// Skipping needs the segment to be unplayed and something playable after
    /// it. A skipped one-shot entry is consumed. Otherwise a `SequencingError`
    /// is published and the failure is returned.
    pub fn segment_on_error(
        &mut self,
        scheduler: &mut Scheduler,
        segment: &mut PlaybackSegment,
        rate: f64,
        message: impl Into<String>,
        is_not_played: bool,
        is_end_of_sequence: bool,
    ) -> Result<Transition> {
        let message = message.into();
        segment.error = Some(message.clone());

        if !is_not_played || is_end_of_sequence {
            return Err(self.playback_failed(segment, message));
        }

        let Some(next) = self.next_segment(scheduler, segment, rate) else {
            return Err(self.playback_failed(segment, message));
        };

        warn!(id = %segment.segment_id, error = %message, "Skipping entry after playback error");
        if segment.clip.delete_after_playing {
            scheduler.mark_played(segment.segment_id);
        }
        // Consuming the entry may weld the content the next segment points at.
        match self.rebind(scheduler, next) {
            Some(next) => Ok(Transition::Next(next.with_status(SegmentStatus::Waiting))),
            None => Err(self.playback_failed(segment, message)),
        }
    }

    /// Publish a terminal failure of `segment`.
    fn playback_failed(&mut self, segment: &PlaybackSegment, message: String) -> SequencerError {
        warn!(id = %segment.segment_id, error = %message, "Playback failed");
        self.publish(SequencerEvent::SequencingError {
            entry: Some(segment.clip.original_id),
            message: message.clone(),
        });
        SequencerError::Playback {
            entry: segment.segment_id,
            message,
        }
    }

    /// Neighbouring playable entry in the direction of `rate`.
    fn next_segment(
        &self,
        scheduler: &Scheduler,
        segment: &PlaybackSegment,
        rate: f64,
    ) -> Option<PlaybackSegment> {
        let forward = rate >= 0.0;
        let entries = scheduler.entries();
        let from = match scheduler.index_of(segment.segment_id) {
            Some(i) if forward => i + 1,
            Some(i) => i.checked_sub(1)?,
            // The entry is gone: continue from where it used to be.
            None => {
                let clip = &segment.clip;
                let time = if forward {
                    clip.linear_end()
                } else {
                    clip.linear_start.as_secs()
                };
                match scheduler.index_at_time(time) {
                    Some(i) if forward => i,
                    Some(i) => i.checked_sub(1)?,
                    None if forward => entries.len(),
                    None => entries.len().checked_sub(1)?,
                }
            }
        };
        let index = find_playable(entries, from, forward)?;
        let entry = &entries[index];
        Some(PlaybackSegment::new(entry.clone(), entry_start(entry, rate), rate))
    }

    /// Re-point `next` at the scheduler's current entry after a weld removed
    /// or resized it. Keeps the chosen start time.
    fn rebind(&self, scheduler: &Scheduler, mut next: PlaybackSegment) -> Option<PlaybackSegment> {
        let current = scheduler.entry(next.segment_id);
        if !next.is_stale(current) {
            return Some(next);
        }
        let entry = match current {
            Some(entry) => entry,
            None => scheduler.entry_at_time(next.clip.linear_start.as_secs())?,
        };
        debug!(from = %next.segment_id, to = %entry.entry_id, "Rebinding next segment");
        next.refresh(entry.clone());
        Some(next)
    }
}
