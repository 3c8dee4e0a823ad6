//! The scheduler: sole owner and mutator of the ordered playlist.
//!
//! Entries are kept in playback order. Content entries tile the linear
//! timeline back to back; ads and markers have zero linear duration and sit at
//! the linear time they were anchored to. Inserting a midroll inside a content
//! entry splits that entry into a head and a tail, and removing the ad between
//! them welds the pair back together.

mod error;

pub use error::SchedulerError;

use tracing::debug;

use crate::config::SequencerConfig;
use crate::playlist::{AdDescriptor, AdType, EntryId, PlaylistEntry, PlaylistEntryType};
use crate::time::{LinearTime, ManifestTime};

type Result<T> = std::result::Result<T, SchedulerError>;

#[derive(Debug, Clone)]
pub struct Scheduler {
    entries: Vec<PlaylistEntry>,
    next_id: u32,
    /// Entry currently handed to the renderer
    active: Option<EntryId>,
    /// Last known linear playback position
    playhead: Option<LinearTime>,
    config: SequencerConfig,
}

impl Scheduler {
    pub fn new(config: SequencerConfig) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            active: None,
            playhead: None,
            config,
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    fn tolerance(&self) -> f64 {
        self.config.time_tolerance
    }

    fn issue_id(&mut self) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        id
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: EntryId) -> Option<&PlaylistEntry> {
        self.entries.iter().find(|e| e.entry_id == id)
    }

    pub fn index_of(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.entry_id == id)
    }

    /// Index of the first entry starting at `time` or covering it.
    pub fn index_at_time(&self, time: f64) -> Option<usize> {
        let tolerance = self.tolerance();
        self.entries
            .iter()
            .position(|e| e.contains_linear(time, tolerance))
    }

    pub fn entry_at_time(&self, time: f64) -> Option<&PlaylistEntry> {
        self.index_at_time(time).map(|i| &self.entries[i])
    }

    pub fn entry_after(&self, id: EntryId) -> Option<&PlaylistEntry> {
        self.index_of(id).and_then(|i| self.entries.get(i + 1))
    }

    pub fn entry_before(&self, id: EntryId) -> Option<&PlaylistEntry> {
        self.index_of(id)
            .and_then(|i| i.checked_sub(1))
            .map(|i| &self.entries[i])
    }

    /// Total length of the content timeline. Ads never contribute.
    pub fn linear_duration(&self) -> f64 {
        self.entries.iter().map(|e| e.linear_duration).sum()
    }

    /// At least one entry can be handed to the renderer.
    pub fn is_ready(&self) -> bool {
        self.entries.iter().any(PlaylistEntry::is_playable)
    }

    pub fn seek_to_start(&self) -> Option<&PlaylistEntry> {
        self.entries
            .iter()
            .find(|e| e.kind == PlaylistEntryType::SeekToStart)
    }

    /// Ad references still waiting for resolution.
    pub fn pending_references(&self) -> impl Iterator<Item = &PlaylistEntry> {
        self.entries
            .iter()
            .filter(|e| e.kind == PlaylistEntryType::VastReference)
    }

    pub fn active(&self) -> Option<EntryId> {
        self.active
    }

    pub fn set_active(&mut self, id: Option<EntryId>) {
        self.active = id;
    }

    pub fn playhead(&self) -> Option<LinearTime> {
        self.playhead
    }

    pub fn set_playhead(&mut self, time: Option<LinearTime>) {
        self.playhead = time;
    }

    /// Drop every entry. Ids keep counting so stale ids cannot alias new entries.
    pub fn reset(&mut self) {
        debug!(count = self.entries.len(), "Clearing playlist");
        self.entries.clear();
        self.active = None;
        self.playhead = None;
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Insert an ad (or an unresolved ad reference) into the playlist.
    ///
    /// `at` is only consulted for midrolls; `None` means the current playhead.
    pub fn schedule_clip(
        &mut self,
        ad: &AdDescriptor,
        at: Option<LinearTime>,
        kind: PlaylistEntryType,
    ) -> Result<EntryId> {
        if kind == PlaylistEntryType::SeekToStart {
            return Err(SchedulerError::InvalidEntryType(kind));
        }
        if kind != PlaylistEntryType::VastReference {
            self.check_clip_duration(ad.render_time.duration())?;
        }

        let (index, start) = match ad.ad_type {
            AdType::Preroll => (self.preroll_index(), LinearTime::ZERO),
            AdType::Postroll => (
                self.entries.len(),
                LinearTime::saturating(self.linear_duration()),
            ),
            AdType::Pod => {
                let target = ad.append_to.ok_or(SchedulerError::MissingAppendTarget)?;
                let i = self
                    .index_of(target)
                    .ok_or(SchedulerError::UnknownEntry(target))?;
                if self.entries[i].kind == PlaylistEntryType::SeekToStart {
                    return Err(SchedulerError::InvalidAppendTarget(target));
                }
                (i + 1, LinearTime::saturating(self.entries[i].linear_end()))
            }
            AdType::Midroll => {
                let at = at.or(self.playhead).unwrap_or(LinearTime::ZERO);
                return self.insert_midroll(ad, at, kind);
            }
        };
        self.check_not_in_past(start)?;

        let entry = self.new_ad_entry(ad, kind, start);
        let id = entry.entry_id;
        debug!(id = %id, ad_type = ?ad.ad_type, start = %start, index, "Scheduled clip");
        self.entries.insert(index, entry);
        Ok(id)
    }

    fn insert_midroll(
        &mut self,
        ad: &AdDescriptor,
        at: LinearTime,
        kind: PlaylistEntryType,
    ) -> Result<EntryId> {
        self.check_not_in_past(at)?;
        let time = at.as_secs();
        let found = self
            .index_at_time(time)
            .ok_or(SchedulerError::OutsidePlaylist(time))?;
        let host = &self.entries[found];
        let anchor = host.linear_start;
        let offset = time - anchor.as_secs();

        if offset.abs() < self.tolerance() || !host.is_content() {
            // Same anchor: after the ads already there, before the content.
            let index = found
                + self.entries[found..]
                    .iter()
                    .take_while(|e| {
                        e.is_advertisement
                            && e.linear_duration == 0.0
                            && (e.linear_start.as_secs() - anchor.as_secs()).abs()
                                < self.tolerance()
                    })
                    .count();
            let entry = self.new_ad_entry(ad, kind, anchor);
            let id = entry.entry_id;
            debug!(id = %id, start = %anchor, index, "Scheduled midroll at entry boundary");
            self.entries.insert(index, entry);
            return Ok(id);
        }

        let head_render = host.render_time;
        let split_at = head_render.min() + offset;
        let tail_render = ManifestTime::window(split_at, head_render.max())?;
        let new_head_render = ManifestTime::window(head_render.min(), split_at)?;

        let entry = self.new_ad_entry(ad, kind, at);
        let id = entry.entry_id;
        let tail_id = self.issue_id();

        let head = &mut self.entries[found];
        let mut tail = head.clone();
        tail.entry_id = tail_id;
        tail.linear_start = at;
        tail.linear_duration = head.linear_duration - offset;
        tail.render_time = tail_render;
        head.linear_duration = offset;
        head.render_time = new_head_render;

        debug!(
            id = %id,
            head = %head.entry_id,
            tail = %tail_id,
            at = %at,
            "Split content for midroll"
        );
        self.entries.insert(found + 1, entry);
        self.entries.insert(found + 2, tail);
        Ok(id)
    }

    /// Append a content clip covering `manifest_time`'s window.
    pub fn append_content_clip(
        &mut self,
        uri: impl Into<String>,
        manifest_time: ManifestTime,
    ) -> Result<EntryId> {
        if manifest_time.is_unbounded() {
            return Err(SchedulerError::UnboundedContent);
        }
        let duration = manifest_time.duration();
        self.check_clip_duration(duration)?;

        let end = self.linear_duration();
        let tolerance = self.tolerance();
        let trailing = self
            .entries
            .iter()
            .rev()
            .take_while(|e| {
                e.is_advertisement
                    && e.linear_duration == 0.0
                    && (e.linear_start.as_secs() - end).abs() < tolerance
            })
            .count();
        let index = self.entries.len() - trailing;
        // Nothing follows the last content yet: trailing ads only count as
        // postrolls once some content exists.
        let index = if self.entries[..index].iter().any(PlaylistEntry::is_content) {
            index
        } else {
            self.entries.len()
        };

        let id = self.issue_id();
        let entry = PlaylistEntry {
            entry_id: id,
            original_id: id,
            split_from: id,
            kind: PlaylistEntryType::Media,
            linear_start: LinearTime::saturating(end),
            linear_duration: duration,
            clip_uri: Some(uri.into()),
            render_time: manifest_time,
            is_advertisement: false,
            delete_after_playing: false,
            playback_policy: self.config.content_policy,
        };
        debug!(id = %id, start = end, duration, "Appended content clip");
        self.entries.insert(index, entry);
        for postroll in &mut self.entries[index + 1..] {
            postroll.linear_start = LinearTime::saturating(postroll.linear_start.as_secs() + duration);
        }
        Ok(id)
    }

    /// Remove an ad or marker that has not played yet.
    pub fn cancel_clip(&mut self, id: EntryId) -> Result<PlaylistEntry> {
        let index = self.index_of(id).ok_or(SchedulerError::UnknownEntry(id))?;
        if self.active == Some(id) {
            return Err(SchedulerError::EntryActive(id));
        }
        if !self.entries[index].is_advertisement {
            return Err(SchedulerError::ContentNotCancellable(id));
        }
        debug!(id = %id, "Cancelled clip");
        Ok(self.remove_at(index))
    }

    /// Consume a one-shot entry after it played. Returns whether it was removed.
    pub fn mark_played(&mut self, id: EntryId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if !self.entries[index].delete_after_playing {
            return false;
        }
        if self.active == Some(id) {
            self.active = None;
        }
        debug!(id = %id, "Removed played one-shot entry");
        self.remove_at(index);
        true
    }

    /// Install (or replace) the seek-to-start marker for on-demand content.
    pub fn set_seek_to_start(&mut self) -> Result<EntryId> {
        self.install_seek_to_start(None)
    }

    /// Install (or replace) a seek-to-start entry that plays `uri` from the
    /// start of its live window.
    pub fn set_seek_to_start_with_url(&mut self, uri: impl Into<String>) -> Result<EntryId> {
        self.install_seek_to_start(Some(uri.into()))
    }

    fn install_seek_to_start(&mut self, uri: Option<String>) -> Result<EntryId> {
        let existing = self
            .entries
            .iter()
            .position(|e| e.kind == PlaylistEntryType::SeekToStart);
        if let Some(i) = existing {
            let id = self.entries[i].entry_id;
            if self.active == Some(id) {
                return Err(SchedulerError::EntryActive(id));
            }
        }
        if !self.entries.iter().any(PlaylistEntry::is_content) {
            return Err(SchedulerError::NoContent);
        }
        let render_time = match uri {
            Some(_) => ManifestTime::unbounded(0.0)?,
            None => ManifestTime::window(0.0, 0.0)?,
        };

        if let Some(i) = existing {
            let old = self.remove_at(i);
            debug!(id = %old.entry_id, "Replacing seek-to-start entry");
        }
        let index = self
            .entries
            .iter()
            .position(PlaylistEntry::is_content)
            .ok_or(SchedulerError::NoContent)?;

        let id = self.issue_id();
        let entry = PlaylistEntry {
            entry_id: id,
            original_id: id,
            split_from: id,
            kind: PlaylistEntryType::SeekToStart,
            linear_start: self.entries[index].linear_start,
            linear_duration: 0.0,
            clip_uri: uri,
            render_time,
            is_advertisement: true,
            delete_after_playing: true,
            playback_policy: self.config.content_policy,
        };
        debug!(id = %id, index, "Installed seek-to-start entry");
        self.entries.insert(index, entry);
        Ok(id)
    }

    /// Swap an unresolved reference for the first ad it resolved to.
    ///
    /// The new entry gets a fresh id but keeps the reference's `original_id`
    /// and linear anchor, so callers holding the original id still find it.
    pub fn replace_reference(&mut self, reference: EntryId, ad: &AdDescriptor) -> Result<EntryId> {
        let index = self
            .index_of(reference)
            .ok_or(SchedulerError::UnknownEntry(reference))?;
        if self.entries[index].kind != PlaylistEntryType::VastReference {
            return Err(SchedulerError::NotAReference(reference));
        }
        self.check_clip_duration(ad.render_time.duration())?;

        let old = &self.entries[index];
        let (original_id, start, one_shot) =
            (old.original_id, old.linear_start, old.delete_after_playing);
        let mut entry = self.new_ad_entry(ad, PlaylistEntryType::Media, start);
        entry.original_id = original_id;
        entry.delete_after_playing |= one_shot;
        let id = entry.entry_id;
        debug!(reference = %reference, id = %id, "Resolved ad reference");
        self.entries[index] = entry;
        Ok(id)
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn new_ad_entry(
        &mut self,
        ad: &AdDescriptor,
        kind: PlaylistEntryType,
        start: LinearTime,
    ) -> PlaylistEntry {
        let id = self.issue_id();
        PlaylistEntry {
            entry_id: id,
            original_id: id,
            split_from: id,
            kind,
            linear_start: start,
            linear_duration: 0.0,
            clip_uri: Some(ad.clip_url.clone()),
            render_time: ad.render_time,
            is_advertisement: true,
            delete_after_playing: ad.delete_after_play,
            playback_policy: ad.policy,
        }
    }

    /// Leading prerolls (and their pods) stay ahead of a new preroll.
    fn preroll_index(&self) -> usize {
        let tolerance = self.tolerance();
        self.entries
            .iter()
            .take_while(|e| {
                e.is_advertisement
                    && e.kind != PlaylistEntryType::SeekToStart
                    && e.linear_duration == 0.0
                    && e.linear_start.as_secs().abs() < tolerance
            })
            .count()
    }

    fn check_clip_duration(&self, duration: f64) -> Result<()> {
        let minimum = self.config.min_clip_duration;
        if duration.is_nan() || duration < minimum {
            return Err(SchedulerError::ClipTooShort { duration, minimum });
        }
        Ok(())
    }

    fn check_not_in_past(&self, requested: LinearTime) -> Result<()> {
        if let Some(playhead) = self.playhead {
            if requested.as_secs() < playhead.as_secs() - self.tolerance() {
                return Err(SchedulerError::ScheduledInPast {
                    requested: requested.as_secs(),
                    playhead: playhead.as_secs(),
                });
            }
        }
        Ok(())
    }

    /// Remove the entry at `index`, welding a split pair that becomes adjacent.
    fn remove_at(&mut self, index: usize) -> PlaylistEntry {
        let removed = self.entries.remove(index);
        if index == 0 || index >= self.entries.len() {
            return removed;
        }
        let (head, tail) = (&self.entries[index - 1], &self.entries[index]);
        if !(head.is_content() && tail.is_content() && head.split_from == tail.split_from) {
            return removed;
        }
        let Ok(render_time) = ManifestTime::window(head.render_time.min(), tail.render_time.max())
        else {
            return removed;
        };
        let tail = self.entries.remove(index);
        if self.active == Some(tail.entry_id) {
            self.active = Some(self.entries[index - 1].entry_id);
        }
        let head = &mut self.entries[index - 1];
        head.linear_duration += tail.linear_duration;
        head.render_time = render_time;
        debug!(head = %head.entry_id, tail = %tail.entry_id, "Welded split content");
        removed
    }
}
