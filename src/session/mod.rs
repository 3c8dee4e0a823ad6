//! Playback session: the single-writer loop around scheduler and sequencer.
//!
//! Every input (renderer callbacks, ticks, user seeks and ad resolutions
//! arriving from the resolver thread) goes through one channel and is handled
//! one at a time, so the playlist is never read and written concurrently.

mod renderer;

pub use renderer::{Renderer, RendererError};

use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SequencerConfig;
use crate::playlist::{
    AdDescriptor, AdType, EntryId, PlaybackSegment, PlaylistEntry, PlaylistEntryType,
    SegmentStatus,
};
use crate::resolver::{AdResolver, ResolveError, Resolution, ResolverWorker};
use crate::scheduler::{Scheduler, SchedulerError};
use crate::sequencer::{SeekbarReading, Sequencer, SequencerError, SequencerEvent, Transition};
use crate::time::{LinearTime, ManifestTime, SeekbarTime, TimeError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Sequencer(#[from] SequencerError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error("Nothing playable has been scheduled")]
    NotReady,

    #[error("Nothing is playing")]
    NotPlaying,

    #[error("Pausing is not allowed while entry {0} plays")]
    PauseNotAllowed(EntryId),

    #[error("Skipping is not allowed while entry {0} plays")]
    SkipNotAllowed(EntryId),
}

type Result<T> = std::result::Result<T, SessionError>;

/// Everything the session reacts to.
#[derive(Debug)]
pub enum SessionInput {
    /// The renderer reached the end of the current segment
    EndOfMedia { is_end_of_sequence: bool },
    /// The current segment is fully buffered
    EndOfBuffering,
    PlaybackError { message: String },
    /// Periodic renderer position
    Tick(ManifestTime),
    SeekSeekbar(f64),
    SeekLinear(LinearTime),
    Skip,
    AdsResolved(Resolution),
}

impl From<Resolution> for SessionInput {
    fn from(resolution: Resolution) -> Self {
        SessionInput::AdsResolved(resolution)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
    Finished,
}

pub struct PlaybackSession<R: Renderer> {
    scheduler: Scheduler,
    sequencer: Sequencer,
    renderer: R,
    state: PlaybackState,
    current: Option<PlaybackSegment>,
    /// Segment prefetched after the current one finished buffering
    prefetched: Option<PlaybackSegment>,
    rate: f64,
    last_position: Option<ManifestTime>,
    last_reading: Option<SeekbarReading>,
    /// The current segment has reported progress
    started: bool,
    ready_published: bool,
    inbox_tx: Sender<SessionInput>,
    inbox_rx: Receiver<SessionInput>,
    worker: Option<ResolverWorker>,
    pending: HashSet<EntryId>,
}

impl<R: Renderer> PlaybackSession<R> {
    pub fn new(config: SequencerConfig, renderer: R) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel();
        Self {
            scheduler: Scheduler::new(config.clone()),
            sequencer: Sequencer::new(config),
            renderer,
            state: PlaybackState::Stopped,
            current: None,
            prefetched: None,
            rate: 1.0,
            last_position: None,
            last_reading: None,
            started: false,
            ready_published: false,
            inbox_tx,
            inbox_rx,
            worker: None,
            pending: HashSet::new(),
        }
    }

    /// Resolve ad references with `resolver` on a background thread.
    pub fn with_resolver(mut self, resolver: Arc<dyn AdResolver>) -> Self {
        self.worker = Some(ResolverWorker::spawn(resolver, self.inbox_tx.clone()));
        self
    }

    /// Sender for posting inputs from other threads.
    pub fn sender(&self) -> Sender<SessionInput> {
        self.inbox_tx.clone()
    }

    pub fn subscribe(&mut self) -> Receiver<SequencerEvent> {
        self.sequencer.subscribe()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_segment(&self) -> Option<&PlaybackSegment> {
        self.current.as_ref()
    }

    pub fn prefetched_segment(&self) -> Option<&PlaybackSegment> {
        self.prefetched.as_ref()
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Rate applies from the next segment the renderer is given.
    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    pub fn last_reading(&self) -> Option<&SeekbarReading> {
        self.last_reading.as_ref()
    }

    /// Linear position of the last reported renderer position.
    pub fn current_linear_time(&self) -> Option<LinearTime> {
        let segment = self.current.as_ref()?;
        let position = self.last_position.as_ref()?;
        Some(self.sequencer.linear_time(position, segment))
    }

    pub fn pending_resolutions(&self) -> usize {
        self.pending.len()
    }

    // ---------------------------------------------------------------------
    // Scheduling
    // ---------------------------------------------------------------------

    pub fn schedule_clip(
        &mut self,
        ad: &AdDescriptor,
        at: Option<LinearTime>,
        kind: PlaylistEntryType,
    ) -> Result<EntryId> {
        let id = self.scheduler.schedule_clip(ad, at, kind)?;
        self.check_ready();
        Ok(id)
    }

    pub fn append_content_clip(
        &mut self,
        uri: impl Into<String>,
        manifest_time: ManifestTime,
    ) -> Result<EntryId> {
        let id = self.scheduler.append_content_clip(uri, manifest_time)?;
        self.check_ready();
        Ok(id)
    }

    pub fn cancel_clip(&mut self, id: EntryId) -> Result<PlaylistEntry> {
        let entry = self.scheduler.cancel_clip(id)?;
        self.pending.remove(&id);
        Ok(entry)
    }

    pub fn set_seek_to_start(&mut self) -> Result<EntryId> {
        let id = self.scheduler.set_seek_to_start()?;
        self.check_ready();
        Ok(id)
    }

    pub fn set_seek_to_start_with_url(&mut self, uri: impl Into<String>) -> Result<EntryId> {
        let id = self.scheduler.set_seek_to_start_with_url(uri)?;
        self.check_ready();
        Ok(id)
    }

    /// Schedule an ad reference and queue it for resolution.
    ///
    /// The reference holds its slot until the resolver answers; the first
    /// resolved ad replaces it and the rest follow as a pod.
    pub fn schedule_vast(
        &mut self,
        url: impl Into<String>,
        at: Option<LinearTime>,
        ad_type: AdType,
        one_shot: bool,
    ) -> Result<EntryId> {
        let url = url.into();
        let mut reference = AdDescriptor::new(url.clone(), ManifestTime::window(0.0, 0.0)?, ad_type);
        reference.delete_after_play = one_shot;
        let id = self
            .scheduler
            .schedule_clip(&reference, at, PlaylistEntryType::VastReference)?;

        let requested = match &self.worker {
            Some(worker) => worker.request(id, url),
            None => Err(ResolveError::WorkerUnavailable),
        };
        if let Err(e) = requested {
            self.scheduler.cancel_clip(id)?;
            return Err(e.into());
        }
        debug!(id = %id, "Queued ad reference for resolution");
        self.pending.insert(id);
        Ok(id)
    }

    fn check_ready(&mut self) {
        if !self.ready_published && self.scheduler.is_ready() {
            self.ready_published = true;
            self.sequencer.publish(SequencerEvent::Ready);
        }
    }

    // ---------------------------------------------------------------------
    // Controls
    // ---------------------------------------------------------------------

    /// Start from the beginning, or resume when paused.
    pub fn play(&mut self) -> Result<()> {
        if self.state == PlaybackState::Paused {
            if let Some(segment) = &self.current {
                let uri = segment.clip.clip_uri.clone().unwrap_or_default();
                let at = self
                    .last_position
                    .map_or(segment.initial_playback_time, |p| p.current());
                self.state = PlaybackState::Playing;
                return self.renderer_play(&uri, at);
            }
        }
        if self.state == PlaybackState::Playing {
            return Ok(());
        }
        if !self.scheduler.is_ready() {
            return Err(SessionError::NotReady);
        }
        let segment = self
            .sequencer
            .segment_after_seek(&self.scheduler, LinearTime::ZERO, None)?;
        info!("Starting playback");
        self.start_segment(segment)
    }

    pub fn pause(&mut self) -> Result<()> {
        let segment = self.current.as_ref().ok_or(SessionError::NotPlaying)?;
        if !segment.clip.playback_policy.allow_pause {
            return Err(SessionError::PauseNotAllowed(segment.segment_id));
        }
        self.renderer.pause();
        self.state = PlaybackState::Paused;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.renderer.stop();
        self.scheduler.set_active(None);
        self.current = None;
        self.prefetched = None;
        self.last_position = None;
        self.state = PlaybackState::Stopped;
        info!("Playback stopped");
    }

    /// Seek to a position on the seekbar last published.
    pub fn seek_to(&mut self, position: f64) -> Result<()> {
        let current = self.current.as_ref().ok_or(SessionError::NotPlaying)?;
        let seekbar = match &self.last_reading {
            Some(reading) => reading.seekbar.with_position(position),
            None => SeekbarTime::new(position, 0.0, self.scheduler.linear_duration())?,
        };
        let segment = self
            .sequencer
            .segment_after_seekbar_seek(&self.scheduler, &seekbar, current)?;
        self.start_segment(segment)
    }

    pub fn seek_to_linear(&mut self, target: LinearTime) -> Result<()> {
        let segment =
            self.sequencer
                .segment_after_seek(&self.scheduler, target, self.current.as_ref())?;
        self.start_segment(segment)
    }

    /// Leave the current entry early. Counts as played.
    pub fn skip_current(&mut self) -> Result<()> {
        let segment = self.current.as_ref().ok_or(SessionError::NotPlaying)?;
        if !segment.clip.playback_policy.allow_skip_forward {
            return Err(SessionError::SkipNotAllowed(segment.segment_id));
        }
        self.on_end_of_media(false, false)
    }

    // ---------------------------------------------------------------------
    // Input loop
    // ---------------------------------------------------------------------

    pub fn post(&self, input: SessionInput) {
        // The receiver lives in `self`, so this cannot fail.
        let _ = self.inbox_tx.send(input);
    }

    pub fn handle(&mut self, input: SessionInput) -> Result<()> {
        match input {
            SessionInput::EndOfMedia { is_end_of_sequence } => {
                self.on_end_of_media(false, is_end_of_sequence)
            }
            SessionInput::EndOfBuffering => {
                self.on_end_of_buffering();
                Ok(())
            }
            SessionInput::PlaybackError { message } => {
                let is_not_played = !self.started;
                self.on_error(message, is_not_played)
            }
            SessionInput::Tick(position) => self.on_tick(position),
            SessionInput::SeekSeekbar(position) => self.seek_to(position),
            SessionInput::SeekLinear(target) => self.seek_to_linear(target),
            SessionInput::Skip => self.skip_current(),
            SessionInput::AdsResolved(resolution) => {
                self.on_resolved(resolution);
                Ok(())
            }
        }
    }

    /// Handle every queued input. Stops at the first failing input and leaves
    /// the rest queued.
    pub fn pump(&mut self) -> Result<usize> {
        let mut handled = 0;
        while let Ok(input) = self.inbox_rx.try_recv() {
            handled += 1;
            self.handle(input)?;
        }
        Ok(handled)
    }

    /// Block until every outstanding ad reference is resolved or `timeout`
    /// passes. Other inputs arriving meanwhile are handled in order.
    pub fn wait_for_resolutions(&mut self, timeout: Duration) -> Result<usize> {
        let deadline = Instant::now() + timeout;
        let mut handled = self.pump()?;
        while !self.pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.inbox_rx.recv_timeout(remaining) {
                Ok(input) => {
                    handled += 1;
                    self.handle(input)?;
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(pending = self.pending.len(), "Timed out waiting for ad resolution");
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        Ok(handled)
    }

    // ---------------------------------------------------------------------
    // Event handlers
    // ---------------------------------------------------------------------

    fn on_tick(&mut self, position: ManifestTime) -> Result<()> {
        let Some(segment) = self.current.as_mut() else {
            return Ok(());
        };
        let reading = self
            .sequencer
            .seekbar_time(&self.scheduler, &position, self.rate, segment)?;
        let linear = self.sequencer.linear_time(&position, segment);
        self.scheduler.set_active(Some(segment.segment_id));
        self.scheduler.set_playhead(Some(linear));
        self.started = true;
        self.last_position = Some(position);
        self.last_reading = Some(reading);
        self.sequencer.publish(SequencerEvent::SeekbarTimeUpdated {
            seekbar: reading.seekbar,
            policy: reading.policy,
        });

        if reading.range_exceeded {
            debug!(position = position.current(), "Playback left the entry's window");
            return self.on_end_of_media(false, false);
        }
        Ok(())
    }

    fn on_end_of_buffering(&mut self) {
        let Some(segment) = &self.current else {
            return;
        };
        self.prefetched =
            self.sequencer
                .segment_on_end_of_buffering(&self.scheduler, segment, self.rate);
        if let Some(next) = &self.prefetched {
            if let Some(uri) = &next.clip.clip_uri {
                self.renderer.preload(uri, next.initial_playback_time);
            }
        }
    }

    fn on_end_of_media(&mut self, is_not_played: bool, is_end_of_sequence: bool) -> Result<()> {
        let Some(segment) = self.current.take() else {
            return Ok(());
        };
        let transition = self.sequencer.segment_on_end_of_media(
            &mut self.scheduler,
            &segment,
            self.rate,
            is_not_played,
            is_end_of_sequence,
        );
        let prefetched = self.prefetched.take();
        self.scheduler.set_active(None);
        self.current = Some(segment);
        match transition? {
            Transition::Next(next) => {
                let next = match prefetched {
                    Some(ready) if self.is_same_segment(&ready, &next) => {
                        debug!(id = %ready.segment_id, "Promoting prefetched segment");
                        ready
                    }
                    _ => next,
                };
                self.start_segment(next)
            }
            Transition::EndOfSequence => {
                self.finish();
                Ok(())
            }
        }
    }

    /// `ready` was prefetched for the entry `next` starts, and the entry is
    /// unchanged since.
    fn is_same_segment(&self, ready: &PlaybackSegment, next: &PlaybackSegment) -> bool {
        ready.segment_id == next.segment_id
            && ready.initial_playback_time == next.initial_playback_time
            && ready.initial_playback_rate == next.initial_playback_rate
            && !ready.is_stale(self.scheduler.entry(ready.segment_id))
    }

    fn on_error(&mut self, message: String, is_not_played: bool) -> Result<()> {
        let Some(mut segment) = self.current.take() else {
            return Err(SessionError::NotPlaying);
        };
        let transition = self.sequencer.segment_on_error(
            &mut self.scheduler,
            &mut segment,
            self.rate,
            message,
            is_not_played,
            false,
        );
        self.prefetched = None;
        self.scheduler.set_active(None);
        self.current = Some(segment);
        match transition {
            Ok(Transition::Next(next)) => self.start_segment(next),
            Ok(Transition::EndOfSequence) => {
                self.finish();
                Ok(())
            }
            Err(e) => {
                self.renderer.stop();
                self.state = PlaybackState::Stopped;
                Err(e.into())
            }
        }
    }

    fn on_resolved(&mut self, resolution: Resolution) {
        let Resolution {
            reference,
            url,
            result,
        } = resolution;
        if !self.pending.remove(&reference) {
            debug!(reference = %reference, "Ignoring resolution for a cancelled reference");
            return;
        }
        let mut ads = match result {
            Ok(ads) => ads.into_iter(),
            Err(e) => return self.resolution_failed(reference, &url, e.to_string()),
        };
        let Some(first) = ads.next() else {
            return self.resolution_failed(reference, &url, ResolveError::NoAds.to_string());
        };

        let mut previous = match self.scheduler.replace_reference(reference, &first) {
            Ok(id) => id,
            Err(e) => return self.resolution_failed(reference, &url, e.to_string()),
        };
        for ad in ads {
            let pod = ad.appended_to(previous);
            match self
                .scheduler
                .schedule_clip(&pod, None, PlaylistEntryType::Media)
            {
                Ok(id) => previous = id,
                Err(e) => {
                    warn!(reference = %reference, clip = %pod.clip_url, error = %e, "Dropping pod ad");
                    self.sequencer.publish(SequencerEvent::ResolutionFailed {
                        reference,
                        message: e.to_string(),
                    });
                }
            }
        }
        info!(reference = %reference, "Ad reference resolved");
        self.check_ready();
    }

    fn resolution_failed(&mut self, reference: EntryId, url: &str, message: String) {
        warn!(reference = %reference, url, error = %message, "Ad resolution failed");
        if self.scheduler.entry(reference).is_some() {
            if let Err(e) = self.scheduler.cancel_clip(reference) {
                warn!(reference = %reference, error = %e, "Could not drop unresolved reference");
            }
        }
        self.sequencer
            .publish(SequencerEvent::ResolutionFailed { reference, message });
    }

    // ---------------------------------------------------------------------
    // Renderer driving
    // ---------------------------------------------------------------------

    fn start_segment(&mut self, mut segment: PlaybackSegment) -> Result<()> {
        let previous = self.current.as_ref().map(|s| s.clip.original_id);
        self.sequencer.publish(SequencerEvent::EntryChanged {
            current: previous,
            next: Some(segment.clip.original_id),
            playback_time: segment.initial_playback_time,
        });
        info!(
            id = %segment.segment_id,
            kind = %segment.clip.kind,
            start = segment.initial_playback_time,
            "Starting segment"
        );

        self.scheduler.set_active(Some(segment.segment_id));
        self.rate = segment.initial_playback_rate;
        self.started = false;
        self.prefetched = None;
        self.last_position = None;
        self.last_reading = None;
        self.state = PlaybackState::Playing;

        let uri = segment.clip.clip_uri.clone().unwrap_or_default();
        let start = segment.initial_playback_time;
        segment.status = SegmentStatus::Playing;
        self.current = Some(segment);
        self.renderer_play(&uri, start)
    }

    fn renderer_play(&mut self, uri: &str, start: f64) -> Result<()> {
        match self.renderer.play(uri, start, self.rate) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(uri, error = %e, "Renderer refused segment");
                if let Some(segment) = self.current.as_mut() {
                    segment.status = SegmentStatus::Stopped;
                }
                // A resumed segment has already played part of itself.
                let is_not_played = !self.started;
                self.on_error(e.to_string(), is_not_played)
            }
        }
    }

    fn finish(&mut self) {
        let previous = self.current.take().map(|s| s.clip.original_id);
        self.renderer.stop();
        self.scheduler.set_active(None);
        self.prefetched = None;
        self.state = PlaybackState::Finished;
        self.sequencer.publish(SequencerEvent::EntryChanged {
            current: previous,
            next: None,
            playback_time: 0.0,
        });
        self.sequencer.publish(SequencerEvent::Finished);
        info!("Playback finished");
    }
}
