//! The sequencer: decides which segment plays next and maps between time
//! coordinate systems.
//!
//! The sequencer holds no playlist of its own. Every decision reads the
//! scheduler's current playlist, so the answers always reflect the latest
//! insertions and removals. Its only write is consuming one-shot entries
//! through [`Scheduler::mark_played`].
//!
//! - `seeking`: seek requests by linear and by seekbar position
//! - `transitions`: end of media, end of buffering and playback errors
//! - `events`: typed notifications for subscribers

mod error;
mod events;
mod seeking;
mod transitions;

pub use error::SequencerError;
pub use events::{EventBus, SequencerEvent};
pub use transitions::Transition;

use std::sync::mpsc::Receiver;

use tracing::debug;

use crate::config::SequencerConfig;
use crate::playlist::{PlaybackPolicy, PlaybackSegment, PlaylistEntry};
use crate::scheduler::Scheduler;
use crate::time::{LinearTime, ManifestTime, SeekbarTime};

type Result<T> = std::result::Result<T, SequencerError>;

/// Seekbar position for the current playhead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekbarReading {
    pub seekbar: SeekbarTime,
    /// Policy of the entry the reading was taken on
    pub policy: PlaybackPolicy,
    /// Playback ran past the entry's rendering window
    pub range_exceeded: bool,
}

#[derive(Debug)]
pub struct Sequencer {
    config: SequencerConfig,
    events: EventBus,
}

impl Sequencer {
    pub fn new(config: SequencerConfig) -> Self {
        Self {
            config,
            events: EventBus::default(),
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Receive every event published from now on.
    pub fn subscribe(&mut self) -> Receiver<SequencerEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&mut self, event: SequencerEvent) {
        self.events.publish(event);
    }

    /// Map the renderer's manifest position onto the seekbar.
    ///
    /// A stale content segment (its entry was split or welded since it was
    /// selected) is refreshed in place when the scheduler still holds the same
    /// content; otherwise the reading reports `range_exceeded`.
    pub fn seekbar_time(
        &self,
        scheduler: &Scheduler,
        manifest: &ManifestTime,
        rate: f64,
        segment: &mut PlaybackSegment,
    ) -> Result<SeekbarReading> {
        let position = manifest.current();
        let mut range_exceeded = false;

        if !segment.clip.is_advertisement && !self.refresh_stale(scheduler, segment, position) {
            range_exceeded = true;
        }

        let clip = &segment.clip;
        let render = clip.render_time;
        range_exceeded |= past_render_window(clip, position, rate);

        let (current, max) = if clip.is_advertisement {
            let length = if render.is_unbounded() {
                (manifest.max() - render.min()).max(0.0)
            } else {
                render.duration()
            };
            ((position - render.min()).clamp(0.0, length), length)
        } else {
            let total = scheduler.linear_duration();
            let linear = clip.linear_start.as_secs() + (position - render.min());
            (linear.clamp(0.0, total), total)
        };

        let policy = clip.playback_policy;
        let (mut lo, mut hi) = (0.0, max);
        if !policy.allow_rewind {
            lo = current;
        }
        if !policy.allow_fast_forward {
            hi = current;
        }
        if !policy.allow_seek {
            lo = current;
            hi = current;
        }

        Ok(SeekbarReading {
            seekbar: SeekbarTime::new(current, lo, hi)?,
            policy,
            range_exceeded,
        })
    }

    /// Linear time of the renderer's manifest position. Ads map to their anchor.
    pub fn linear_time(&self, manifest: &ManifestTime, segment: &PlaybackSegment) -> LinearTime {
        let clip = &segment.clip;
        let offset = manifest.current() - clip.render_time.min();
        if clip.linear_duration > 0.0 && offset > 0.0 {
            LinearTime::saturating(clip.linear_start.as_secs() + offset)
        } else {
            clip.linear_start
        }
    }

    /// Bring a content snapshot up to date. Returns false when the content it
    /// was playing is gone from the playlist.
    fn refresh_stale(
        &self,
        scheduler: &Scheduler,
        segment: &mut PlaybackSegment,
        position: f64,
    ) -> bool {
        let current = scheduler.entry(segment.segment_id);
        if !segment.is_stale(current) {
            return true;
        }
        if let Some(entry) = current {
            debug!(id = %entry.entry_id, "Refreshing resized content segment");
            segment.refresh(entry.clone());
            return true;
        }

        // The entry was welded into its head: find the piece of the same
        // content that now covers the position.
        let tolerance = self.config.time_tolerance;
        let family = segment.clip.split_from;
        let pieces = || {
            scheduler
                .entries()
                .iter()
                .filter(move |e| e.is_content() && e.split_from == family)
        };
        let found = pieces()
            .find(|e| e.render_time.min() - tolerance <= position && position < e.render_time.max())
            .or_else(|| pieces().find(|e| (position - e.render_time.max()).abs() < tolerance));
        match found {
            Some(entry) => {
                debug!(
                    from = %segment.segment_id,
                    to = %entry.entry_id,
                    "Rebinding welded content segment"
                );
                segment.refresh(entry.clone());
                true
            }
            None => false,
        }
    }
}

fn past_render_window(clip: &PlaylistEntry, position: f64, rate: f64) -> bool {
    if rate >= 0.0 {
        position > clip.render_time.max()
    } else {
        position < clip.render_time.min()
    }
}

/// Manifest time to start an entry at for the given playback direction.
fn entry_start(entry: &PlaylistEntry, rate: f64) -> f64 {
    let render = entry.render_time;
    if rate < 0.0 && !render.is_unbounded() {
        render.max()
    } else {
        render.min()
    }
}

/// First playable entry at or after `from` (forward) or at or before it.
fn find_playable(entries: &[PlaylistEntry], from: usize, forward: bool) -> Option<usize> {
    if forward {
        entries
            .get(from..)?
            .iter()
            .position(PlaylistEntry::is_playable)
            .map(|i| from + i)
    } else {
        let end = from.checked_add(1)?.min(entries.len());
        entries[..end].iter().rposition(PlaylistEntry::is_playable)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::playlist::{AdType, EntryId};

    fn sequencer() -> Sequencer {
        Sequencer::new(SequencerConfig::default())
    }

    fn segment_for(scheduler: &Scheduler, id: EntryId) -> PlaybackSegment {
        let entry = scheduler.entry(id).unwrap().clone();
        let start = entry.render_time.min();
        PlaybackSegment::new(entry, start, 1.0)
    }

    #[test]
    fn no_rewind_pins_seekbar_minimum_to_position() {
        let mut scheduler = Scheduler::new(SequencerConfig {
            content_policy: PlaybackPolicy {
                allow_rewind: false,
                ..PlaybackPolicy::default()
            },
            ..SequencerConfig::default()
        });
        let id = scheduler
            .append_content_clip("main.m3u8", window(0.0, 100.0))
            .unwrap();
        let mut segment = segment_for(&scheduler, id);

        let manifest = ManifestTime::new(50.0, 0.0, 100.0).unwrap();
        let reading = sequencer()
            .seekbar_time(&scheduler, &manifest, 1.0, &mut segment)
            .unwrap();

        assert_eq!(reading.seekbar.current(), 50.0);
        assert_eq!(reading.seekbar.min(), 50.0);
        assert_eq!(reading.seekbar.max(), 100.0);
        assert!(!reading.range_exceeded);
    }

    #[test]
    fn locked_policy_collapses_window() {
        let mut scheduler = content(100.0);
        let id = schedule(&mut scheduler, "ad.mp4", AdType::Preroll, None, PlaybackPolicy::locked());
        let mut segment = segment_for(&scheduler, id);

        let manifest = ManifestTime::new(6.0, 0.0, 15.0).unwrap();
        let reading = sequencer()
            .seekbar_time(&scheduler, &manifest, 1.0, &mut segment)
            .unwrap();

        assert_eq!(reading.seekbar.current(), 6.0);
        assert_eq!(reading.seekbar.min(), 6.0);
        assert_eq!(reading.seekbar.max(), 6.0);
        assert_eq!(reading.policy, PlaybackPolicy::locked());
    }

    #[test]
    fn ad_seekbar_is_relative_to_the_ad_clip() {
        let mut scheduler = content(100.0);
        let ad = crate::playlist::AdDescriptor::new("ad.mp4", window(5.0, 20.0), AdType::Midroll);
        let id = scheduler
            .schedule_clip(&ad, at(40.0), crate::playlist::PlaylistEntryType::Media)
            .unwrap();
        let mut segment = segment_for(&scheduler, id);

        let manifest = ManifestTime::new(12.0, 0.0, 30.0).unwrap();
        let reading = sequencer()
            .seekbar_time(&scheduler, &manifest, 1.0, &mut segment)
            .unwrap();
        assert_eq!(reading.seekbar.current(), 7.0);
        assert_eq!(reading.seekbar.max(), 15.0);
        assert!(!reading.range_exceeded);

        let past = ManifestTime::new(21.0, 0.0, 30.0).unwrap();
        let reading = sequencer()
            .seekbar_time(&scheduler, &past, 1.0, &mut segment)
            .unwrap();
        assert_eq!(reading.seekbar.current(), 15.0);
        assert!(reading.range_exceeded);
    }

    #[test]
    fn content_range_exceeded_depends_on_direction() {
        let mut scheduler = content(100.0);
        schedule(&mut scheduler, "mid.mp4", AdType::Midroll, at(40.0), PlaybackPolicy::default());
        let tail = scheduler.entries()[2].entry_id;
        let mut segment = segment_for(&scheduler, tail);
        let seq = sequencer();

        let before_tail = ManifestTime::new(39.0, 0.0, 100.0).unwrap();
        let forward = seq.seekbar_time(&scheduler, &before_tail, 1.0, &mut segment).unwrap();
        assert!(!forward.range_exceeded);
        let reverse = seq.seekbar_time(&scheduler, &before_tail, -1.0, &mut segment).unwrap();
        assert!(reverse.range_exceeded);
    }

    #[test]
    fn linear_time_is_monotonic_and_ignores_future_ads() {
        let mut scheduler = content(100.0);
        let seq = sequencer();
        let segment = segment_for(&scheduler, EntryId(1));

        let mut previous = LinearTime::ZERO;
        for step in 0..=20 {
            let manifest = ManifestTime::new(step as f64 * 2.0, 0.0, 100.0).unwrap();
            let now = seq.linear_time(&manifest, &segment);
            assert!(now >= previous);
            previous = now;
        }
        assert_eq!(previous.as_secs(), 40.0);

        schedule(&mut scheduler, "later.mp4", AdType::Midroll, at(70.0), PlaybackPolicy::default());
        let mut refreshed = segment.clone();
        let manifest = ManifestTime::new(40.0, 0.0, 100.0).unwrap();
        seq.seekbar_time(&scheduler, &manifest, 1.0, &mut refreshed).unwrap();
        assert_eq!(seq.linear_time(&manifest, &refreshed).as_secs(), 40.0);
        assert_eq!(scheduler.linear_duration(), 100.0);
    }

    #[test]
    fn ads_map_to_their_linear_anchor() {
        let mut scheduler = content(100.0);
        let id = schedule(&mut scheduler, "mid.mp4", AdType::Midroll, at(30.0), PlaybackPolicy::default());
        let segment = segment_for(&scheduler, id);

        let manifest = ManifestTime::new(9.0, 0.0, 15.0).unwrap();
        assert_eq!(sequencer().linear_time(&manifest, &segment).as_secs(), 30.0);
    }

    #[test]
    fn split_while_playing_refreshes_and_then_exceeds_at_the_break() {
        let mut scheduler = content(100.0);
        let seq = sequencer();
        let mut segment = segment_for(&scheduler, EntryId(1));

        schedule(&mut scheduler, "mid.mp4", AdType::Midroll, at(40.0), PlaybackPolicy::default());

        let before = ManifestTime::new(30.0, 0.0, 100.0).unwrap();
        let reading = seq.seekbar_time(&scheduler, &before, 1.0, &mut segment).unwrap();
        assert!(!reading.range_exceeded);
        assert_eq!(segment.clip.render_time.max(), 40.0);

        let after = ManifestTime::new(40.5, 0.0, 100.0).unwrap();
        let reading = seq.seekbar_time(&scheduler, &after, 1.0, &mut segment).unwrap();
        assert!(reading.range_exceeded);
    }

    #[test]
    fn welded_tail_rebinds_to_head() {
        let mut scheduler = content(100.0);
        let seq = sequencer();
        let mid = schedule(&mut scheduler, "mid.mp4", AdType::Midroll, at(40.0), PlaybackPolicy::default());
        let tail = scheduler.entries()[2].entry_id;
        let mut segment = segment_for(&scheduler, tail);

        scheduler.cancel_clip(mid).unwrap();

        let manifest = ManifestTime::new(55.0, 0.0, 100.0).unwrap();
        let reading = seq.seekbar_time(&scheduler, &manifest, 1.0, &mut segment).unwrap();
        assert!(!reading.range_exceeded);
        assert_eq!(segment.segment_id, EntryId(1));
        assert_eq!(reading.seekbar.current(), 55.0);
    }

    #[test]
    fn find_playable_skips_unplayable_entries() {
        let mut scheduler = content(100.0);
        scheduler.set_seek_to_start().unwrap();
        let entries = scheduler.entries();
        assert_eq!(find_playable(entries, 0, true), Some(1));
        assert_eq!(find_playable(entries, 0, false), None);
        assert_eq!(find_playable(entries, 5, true), None);
        assert_eq!(find_playable(entries, 5, false), Some(1));
    }
}
